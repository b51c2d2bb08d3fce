use clap::Parser;
use recpipe::{Config, Pipeline, VERSION};
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Batch loader for municipal recreation drop-in schedules and facility data
#[derive(Parser, Debug)]
#[command(name = "recpipe", about, version)]
struct CliArgs {
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        help = "Set logging level (trace, debug, info, warn, error)"
    )]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(&args.log_level);
    dotenvy::dotenv().ok();

    debug!("recpipe v{} starting", VERSION);

    let exit_code = run().await;
    std::process::exit(exit_code);
}

async fn run() -> i32 {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return 1;
        }
    };

    let pipeline = match Pipeline::from_config(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };

    match pipeline.execute().await {
        Ok(_) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

fn init_logging(level_str: &str) {
    let level = parse_level(level_str);

    let mut filter = EnvFilter::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        filter = filter
            .add_directive(format!("recpipe={}", level).parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}
