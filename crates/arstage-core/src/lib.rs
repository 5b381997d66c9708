//! # arstage-core
//!
//! Core crate for ARStage. Contains the layered configuration schemas shared
//! by the static server and the model converter, the unified error system
//! and the tracing subscriber setup.
//!
//! This crate has **no** internal dependencies on other ARStage crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::AppConfig;
pub use error::AppError;
pub use logging::init_logging;
pub use result::AppResult;
