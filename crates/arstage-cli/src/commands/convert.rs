//! Convert a GLB model into a USDZ package.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::output::{self, OutputFormat};
use arstage_converter::{ConversionDriver, ConversionReport};
use arstage_core::error::AppError;

/// Arguments for the convert command
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// GLB input file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// USDZ output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Largest texture edge in pixels
    #[arg(long)]
    pub max_texture_size: Option<u32>,
}

/// Execute the convert command
pub async fn execute(
    args: &ConvertArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let mut config = super::load_config(config_path)?.converter;

    if let Some(ref input) = args.input {
        config.input = input.clone();
    }
    if let Some(ref out) = args.output {
        config.output = out.clone();
    }
    if let Some(size) = args.max_texture_size {
        config.max_texture_size = size;
    }
    config.validate()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling conversion");
            on_interrupt.cancel();
        }
    });

    let result = ConversionDriver::new(config).run_with_cancel(cancel).await;
    watcher.abort();

    let report = result.map_err(AppError::from)?;
    print_report(&report, format);
    Ok(())
}

fn print_report(report: &ConversionReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Text => {
            output::print_success(&format!("Saved to {}", report.output.display()));
            output::print_kv("Size", &format!("{:.2} MB", report.size_mb()));
            output::print_kv("Meshes", &report.meshes.to_string());
            output::print_kv("Materials", &report.materials.to_string());
            output::print_kv("Textures", &report.textures.to_string());
            output::print_kv("Duration", &format!("{} ms", report.duration_ms));
        }
    }
}
