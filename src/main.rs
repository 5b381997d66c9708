//! ARStage static server entry point.
//!
//! Loads configuration, initialises logging and runs the HTTPS static server
//! (falling back to plain HTTP when no certificate can be provisioned).

use arstage_core::config::AppConfig;
use arstage_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load_from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = arstage_core::init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ARStage v{}", env!("CARGO_PKG_VERSION"));
    arstage_server::run_server(config.server).await
}
