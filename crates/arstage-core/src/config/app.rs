//! Server and TLS configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Static file server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// HTTPS port.
    pub port: u16,
    /// Plain HTTP port used when no certificate could be provisioned.
    pub fallback_port: u16,
    /// Directory tree served to clients.
    #[validate(length(min = 1))]
    pub static_dir: String,
    /// Graceful shutdown window in seconds.
    pub shutdown_grace_seconds: u64,
    /// Certificate settings.
    #[validate(nested)]
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            fallback_port: default_fallback_port(),
            static_dir: default_static_dir(),
            shutdown_grace_seconds: default_shutdown_grace(),
            tls: TlsConfig::default(),
        }
    }
}

/// Self-signed certificate configuration.
///
/// The pair is generated with `openssl req -x509` when either file is
/// missing at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to the PEM certificate file.
    pub cert_path: PathBuf,
    /// Path to the PEM private key file.
    pub key_path: PathBuf,
    /// Certificate generator executable.
    #[validate(length(min = 1))]
    pub openssl_command: String,
    /// RSA key size in bits.
    #[validate(range(min = 1024, max = 8192))]
    pub key_bits: u32,
    /// Certificate validity in days.
    #[validate(range(min = 1, max = 3650))]
    pub validity_days: u32,
    /// Subject common name.
    #[validate(length(min = 1))]
    pub common_name: String,
    /// Timeout for the generator process in seconds.
    #[validate(range(min = 1))]
    pub generate_timeout_seconds: u64,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
            openssl_command: "openssl".to_string(),
            key_bits: 2048,
            validity_days: 365,
            common_name: "localhost".to_string(),
            generate_timeout_seconds: 60,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8443
}

fn default_fallback_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_shutdown_grace() -> u64 {
    10
}
