//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! compiled-in defaults, optional TOML files and `ARSTAGE__*` environment
//! variables. Each sub-module represents a logical configuration section.

pub mod app;
pub mod converter;
pub mod logging;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::app::{ServerConfig, TlsConfig};
pub use self::converter::{Anchoring, ConverterConfig, PlaneAlignment};
pub use self::logging::LoggingConfig;

use crate::error::AppError;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "ARSTAGE_CONFIG";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    /// Static file server settings.
    #[validate(nested)]
    pub server: ServerConfig,
    /// GLB to USDZ converter settings.
    #[validate(nested)]
    pub converter: ConverterConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Sources, lowest precedence first: compiled-in defaults, the optional
    /// `config/default.toml`, the explicit file (required when given), and
    /// environment variables prefixed with `ARSTAGE` using `__` as the
    /// section separator (`ARSTAGE__SERVER__PORT=9443`).
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("ARSTAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        Ok(app)
    }

    /// Load configuration using the path named by `ARSTAGE_CONFIG`, if set.
    pub fn load_from_env() -> Result<Self, AppError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load(path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.server.fallback_port, 3000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9443\nstatic_dir = \"site\"\n\n[converter]\nmax_texture_size = 512\n",
        )
        .expect("write");

        let config = AppConfig::load(Some(path.to_str().expect("utf8"))).expect("load");
        assert_eq!(config.server.port, 9443);
        assert_eq!(config.server.static_dir, "site");
        assert_eq!(config.server.fallback_port, 3000);
        assert_eq!(config.converter.max_texture_size, 512);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = AppConfig::load(Some("/nonexistent/arstage.toml")).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_load_rejects_invalid_texture_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[converter]\nmax_texture_size = 4\n").expect("write");

        let err = AppConfig::load(Some(path.to_str().expect("utf8"))).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_toml_sections_are_optional() {
        let config: AppConfig = toml::from_str("[logging]\nformat = \"json\"\n").expect("parse");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.tls.common_name, "localhost");
    }
}
