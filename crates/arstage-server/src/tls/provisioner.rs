//! Certificate provisioning via an external `openssl` process.
//!
//! The generator runs as a child process with a timeout and captured
//! output. Failure is reported as a [`ProvisionOutcome::Failed`] value so the
//! caller can fall back to plain HTTP instead of aborting.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use arstage_core::config::TlsConfig;
use arstage_core::error::{AppError, ErrorKind};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Longest stderr excerpt kept in a [`ProvisionError::ProcessFailed`].
const STDERR_LIMIT: usize = 2000;

/// Errors from certificate generation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The generator executable could not be found.
    #[error("Certificate command not found: {0}")]
    CommandNotFound(String),

    /// The generator did not finish in time.
    #[error("Certificate generation timed out after {0} seconds")]
    Timeout(u64),

    /// The generator exited with a non-zero code.
    #[error("Certificate generation failed with exit code {code}: {stderr}")]
    ProcessFailed {
        /// The exit code (`-1` when killed by a signal).
        code: i32,
        /// Standard error output, truncated.
        stderr: String,
    },

    /// The generator succeeded but a file it should have written is absent.
    #[error("Expected certificate file not created: {}", .0.display())]
    OutputMissing(PathBuf),

    /// IO error around the generator.
    #[error("IO error during certificate generation: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        let kind = match &err {
            ProvisionError::Io(_) => ErrorKind::Storage,
            _ => ErrorKind::ExternalService,
        };
        let message = err.to_string();
        AppError::with_source(kind, message, err)
    }
}

/// Paths of a PEM certificate and its private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePair {
    /// PEM certificate.
    pub cert_path: PathBuf,
    /// PEM private key.
    pub key_path: PathBuf,
}

/// Result of a provisioning attempt.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// Both files were already present.
    Existing(CertificatePair),
    /// The files were generated on this run.
    Generated(CertificatePair),
    /// Generation failed; the server should fall back to HTTP.
    Failed(ProvisionError),
}

impl ProvisionOutcome {
    /// The usable certificate pair, if any.
    pub fn certificate(&self) -> Option<&CertificatePair> {
        match self {
            Self::Existing(pair) | Self::Generated(pair) => Some(pair),
            Self::Failed(_) => None,
        }
    }
}

/// Ensures a self-signed certificate pair exists on disk.
#[derive(Debug, Clone)]
pub struct CertificateProvisioner {
    config: TlsConfig,
}

impl CertificateProvisioner {
    /// Create a provisioner.
    pub fn new(config: TlsConfig) -> Self {
        Self { config }
    }

    /// The configured pair, whether or not it exists yet.
    pub fn pair(&self) -> CertificatePair {
        CertificatePair {
            cert_path: self.config.cert_path.clone(),
            key_path: self.config.key_path.clone(),
        }
    }

    /// Whether both the certificate and the key exist.
    pub fn pair_present(&self) -> bool {
        self.config.cert_path.exists() && self.config.key_path.exists()
    }

    /// Arguments passed to the generator.
    pub fn generation_args(&self) -> Vec<String> {
        vec![
            "req".to_string(),
            "-x509".to_string(),
            "-newkey".to_string(),
            format!("rsa:{}", self.config.key_bits),
            "-keyout".to_string(),
            self.config.key_path.to_string_lossy().to_string(),
            "-out".to_string(),
            self.config.cert_path.to_string_lossy().to_string(),
            "-days".to_string(),
            self.config.validity_days.to_string(),
            "-nodes".to_string(),
            "-subj".to_string(),
            format!("/CN={}", self.config.common_name),
        ]
    }

    /// Check if the generator command is available on the system.
    pub async fn command_available(&self) -> bool {
        let locator = if cfg!(target_os = "windows") {
            "where"
        } else {
            "which"
        };
        Command::new(locator)
            .arg(&self.config.openssl_command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// Reuse the existing pair or generate a new one. Never fails; a failed
    /// generation is logged once and returned as [`ProvisionOutcome::Failed`].
    pub async fn provision(&self) -> ProvisionOutcome {
        let pair = self.pair();
        if self.pair_present() {
            info!(
                cert = %pair.cert_path.display(),
                key = %pair.key_path.display(),
                "Using existing certificate"
            );
            return ProvisionOutcome::Existing(pair);
        }

        info!("Generating self-signed certificate...");
        match self.generate().await {
            Ok(()) => {
                info!(cert = %pair.cert_path.display(), "Certificate generated");
                ProvisionOutcome::Generated(pair)
            }
            Err(e) => {
                error!(error = %e, "Failed to generate certificate");
                ProvisionOutcome::Failed(e)
            }
        }
    }

    async fn generate(&self) -> Result<(), ProvisionError> {
        for path in [&self.config.cert_path, &self.config.key_path] {
            if let Some(parent) = parent_dir(path) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut cmd = Command::new(&self.config.openssl_command);
        cmd.args(self.generation_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            command = %self.config.openssl_command,
            args = ?self.generation_args(),
            timeout_s = self.config.generate_timeout_seconds,
            "Spawning certificate generator"
        );

        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.generate_timeout_seconds);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProvisionError::CommandNotFound(
                    self.config.openssl_command.clone(),
                ));
            }
            Ok(Err(e)) => return Err(ProvisionError::Io(e)),
            Err(_) => {
                return Err(ProvisionError::Timeout(
                    self.config.generate_timeout_seconds,
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProvisionError::ProcessFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.chars().take(STDERR_LIMIT).collect(),
            });
        }

        for path in [&self.config.cert_path, &self.config.key_path] {
            if !path.exists() {
                return Err(ProvisionError::OutputMissing(path.clone()));
            }
        }

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Certificate generator finished"
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
