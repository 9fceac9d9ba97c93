//! serve: deliver content of current directory via http/https.
//!
//! This is the application entry point. It parses flags, initializes tracing,
//! builds the immutable configuration and runs the server until a shutdown
//! signal arrives.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use serve::cli::Args;
use serve::config::LogFormat;
use serve::ServeConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse_normalized();

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args.log_filter(std::env::var("RUST_LOG").ok());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    match args.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    let config = match ServeConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve::app::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
