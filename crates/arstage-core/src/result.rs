//! Convenience result type alias for ARStage.

use crate::error::AppError;

/// A specialized `Result` type for ARStage operations.
pub type AppResult<T> = Result<T, AppError>;
