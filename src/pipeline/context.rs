//! Pipeline context threaded through the stages.

use crate::catalog::SourceFeeds;
use crate::load::LoadSummary;
use crate::model::{Availability, Facility};
use crate::resolve::ResolveReport;

/// All data produced by the run so far. Each phase reads the fields of the
/// phases before it and fills in its own; nothing lives in module-level
/// state.
#[derive(Debug, Default)]
pub struct EtlContext {
    /// Parsed source feeds (fetch phase)
    pub feeds: Option<SourceFeeds>,

    /// Sorted availability list (extract phase)
    pub availabilities: Vec<Availability>,

    /// Resolved facilities, enriched in place by the geo and contact phases
    pub facilities: Vec<Facility>,

    /// Location ids that had no row in the location table (resolve phase)
    pub resolve_report: Option<ResolveReport>,

    /// Facilities whose geocoding lookup failed (geo phase)
    pub geocode_failures: usize,

    /// Page fetches that failed during contact enrichment (contact phase)
    pub contact_failures: usize,

    /// Per-table row counts (load phase)
    pub load_summary: Option<LoadSummary>,
}
