use anyhow::Result;
use async_trait::async_trait;

use super::context::EtlContext;

/// One stage of the ETL run. Phases execute strictly in sequence and
/// communicate only through the context.
#[async_trait]
pub trait EtlPhase: Send {
    async fn execute(&mut self, context: &mut EtlContext) -> Result<()>;
}
