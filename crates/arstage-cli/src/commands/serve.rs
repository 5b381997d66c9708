//! Start the static server.

use clap::Args;

use arstage_core::error::AppError;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the HTTPS port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the served directory
    #[arg(long)]
    pub static_dir: Option<String>,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, config_path: Option<&str>) -> Result<(), AppError> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref dir) = args.static_dir {
        config.server.static_dir = dir.clone();
    }

    println!("Starting ARStage server...");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!("  Root: {}", config.server.static_dir);

    arstage_server::run_server(config.server).await
}
