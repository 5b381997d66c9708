//! CLI command definitions and dispatch.

pub mod config;
pub mod convert;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use arstage_core::config::AppConfig;
use arstage_core::error::AppError;

/// ARStage: local HTTPS server and GLB to USDZ converter for the AR demo
#[derive(Debug, Parser)]
#[command(name = "arstage", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to $ARSTAGE_CONFIG)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the static server
    Serve(serve::ServeArgs),
    /// Convert a GLB model to USDZ
    Convert(convert::ConvertArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config_path = self.config_path();
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config_path.as_deref()).await,
            Commands::Convert(args) => {
                convert::execute(args, config_path.as_deref(), self.format).await
            }
            Commands::Config(args) => config::execute(args, config_path.as_deref()).await,
        }
    }

    /// Explicit `--config`, else `ARSTAGE_CONFIG`.
    pub fn config_path(&self) -> Option<String> {
        self.config
            .clone()
            .or_else(|| std::env::var(arstage_core::config::CONFIG_PATH_ENV).ok())
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}
