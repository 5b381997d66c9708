//! ARStage CLI entry point.

use clap::Parser;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // An unreadable config still gets default logging; the command itself
    // reports the load error.
    let logging = commands::load_config(cli.config_path().as_deref())
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Err(e) = arstage_core::init_logging(&logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
