//! Conversion driver: read, parse, export, write.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use arstage_core::config::ConverterConfig;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::ConversionError;
use crate::host::HostEnvironment;
use crate::loader::GltfLoader;
use crate::usdz::{ExportOptions, UsdzExporter};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Summary of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    /// Input model.
    pub input: PathBuf,
    /// Written package.
    pub output: PathBuf,
    /// Package size in bytes.
    pub output_bytes: u64,
    /// Mesh instances placed in the scene.
    pub meshes: usize,
    /// Materials in the source document.
    pub materials: usize,
    /// Textures written into the package.
    pub textures: usize,
    /// Wall-clock time of the run.
    pub duration_ms: u64,
}

impl ConversionReport {
    /// Output size in megabytes.
    pub fn size_mb(&self) -> f64 {
        self.output_bytes as f64 / BYTES_PER_MB
    }
}

/// Runs one GLB to USDZ conversion.
#[derive(Debug, Clone)]
pub struct ConversionDriver {
    config: ConverterConfig,
}

impl ConversionDriver {
    /// Create a driver.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Run to completion.
    pub async fn run(&self) -> Result<ConversionReport, ConversionError> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Run until done or until `cancel` fires.
    ///
    /// Cancellation is honoured up to the end of the export. Once the package
    /// is being written the run completes, so a cancelled run never leaves a
    /// file at the output path.
    #[instrument(skip(self, cancel), fields(input = %self.config.input.display()))]
    pub async fn run_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> Result<ConversionReport, ConversionError> {
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let result = self.convert(&cancel).await;
        if let Err(e) = &result {
            error!(error = %e, "Conversion failed");
        }
        result
    }

    async fn convert(&self, cancel: &CancellationToken) -> Result<ConversionReport, ConversionError> {
        let start = Instant::now();

        let package = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConversionError::Cancelled),
            package = self.build() => package,
        }?;

        let output = &self.config.output;
        let output_bytes = commit(output, &package.bytes, cancel).await?;

        let report = ConversionReport {
            input: self.config.input.clone(),
            output: output.clone(),
            output_bytes,
            meshes: package.meshes,
            materials: package.materials,
            textures: package.textures,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(output = %output.display(), "Saved to {}", output.display());
        info!("Size: {:.2} MB", report.size_mb());
        Ok(report)
    }

    /// Read, parse and export. Nothing touches the output path here.
    async fn build(&self) -> Result<Package, ConversionError> {
        let input = &self.config.input;

        info!(input = %input.display(), "Reading model");
        let data = tokio::fs::read(input)
            .await
            .map_err(|source| ConversionError::ReadInput {
                path: input.clone(),
                source,
            })?;

        let base_dir = input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let host = HostEnvironment::new(
            base_dir,
            Duration::from_secs(self.config.decode_timeout_seconds),
        );

        let scene = GltfLoader::new(&host).parse(&data).await?;
        let meshes = scene.instances.len();
        let materials = scene.materials.len();
        let textures = scene.exported_images().len();

        info!("Exporting USDZ");
        let exporter = UsdzExporter::new(ExportOptions::from(&self.config));
        let bytes = exporter.export(scene).await?;

        Ok(Package {
            bytes,
            meshes,
            materials,
            textures,
        })
    }
}

struct Package {
    bytes: Vec<u8>,
    meshes: usize,
    materials: usize,
    textures: usize,
}

/// Sibling path the package is written to before being renamed into place.
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

/// Write `bytes` to `output` unless `cancel` has fired. The data goes to a
/// partial file first and is renamed over `output` only once complete.
async fn commit(
    output: &Path,
    bytes: &[u8],
    cancel: &CancellationToken,
) -> Result<u64, ConversionError> {
    if cancel.is_cancelled() {
        return Err(ConversionError::Cancelled);
    }

    let wrap = |source| ConversionError::WriteOutput {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }

    let partial = partial_path(output);
    let written = async {
        tokio::fs::write(&partial, bytes).await.map_err(wrap)?;
        let len = tokio::fs::metadata(&partial).await.map_err(wrap)?.len();
        if len == 0 {
            return Err(ConversionError::OutputEmpty {
                path: output.to_path_buf(),
            });
        }
        tokio::fs::rename(&partial, output).await.map_err(wrap)?;
        Ok(len)
    }
    .await;

    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written
}
