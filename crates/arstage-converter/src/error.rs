//! Unified error type for the model converter.
//!
//! Read, parse and export failures are consolidated into a single
//! `ConversionError` enum that maps cleanly to `arstage_core::error::AppError`.

use arstage_core::error::{AppError, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

use crate::imaging::ImageLoadError;

/// Unified error type for all conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    // --- Read errors ---
    /// Input file could not be read.
    #[error("Failed to read input '{path}': {source}")]
    ReadInput {
        /// The input path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // --- Parse errors ---
    /// The glTF document is malformed or uses an unsupported required extension.
    #[error("Error parsing GLB: {0}")]
    Parse(#[from] gltf::Error),

    /// A buffer referenced by the document could not be resolved.
    #[error("Buffer {index} unavailable: {reason}")]
    Buffer {
        /// Buffer index in the document.
        index: usize,
        /// Why it could not be resolved.
        reason: String,
    },

    /// An accessor required by a primitive is missing or unreadable.
    #[error("Mesh '{mesh}' primitive {primitive}: {reason}")]
    Geometry {
        /// Mesh name (or index).
        mesh: String,
        /// Primitive index within the mesh.
        primitive: usize,
        /// What was wrong.
        reason: String,
    },

    /// A texture image failed to load or decode.
    #[error("Image {index} failed to load: {source}")]
    Image {
        /// Image index in the document.
        index: usize,
        /// Underlying load error.
        #[source]
        source: ImageLoadError,
    },

    /// The document has no renderable meshes.
    #[error("Scene contains no exportable meshes")]
    EmptyScene,

    // --- Export errors ---
    /// PNG re-encoding of a texture failed.
    #[error("Failed to encode texture {index}: {reason}")]
    TextureEncode {
        /// Texture index.
        index: usize,
        /// Encoder message.
        reason: String,
    },

    /// ZIP packaging failed.
    #[error("USDZ packaging error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // --- Write errors ---
    /// Output file could not be written.
    #[error("Failed to write output '{path}': {source}")]
    WriteOutput {
        /// The output path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Output file is empty (0 bytes).
    #[error("Output file is empty (0 bytes): {path}")]
    OutputEmpty {
        /// Path to the empty output file.
        path: PathBuf,
    },

    /// Conversion was cancelled via cancellation token.
    #[error("Conversion was cancelled")]
    Cancelled,

    // --- Generic errors ---
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokio task join error.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        let kind = match &err {
            ConversionError::ReadInput { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                ErrorKind::NotFound
            }
            ConversionError::ReadInput { .. }
            | ConversionError::WriteOutput { .. }
            | ConversionError::OutputEmpty { .. }
            | ConversionError::Io(_) => ErrorKind::Storage,
            ConversionError::Parse(_)
            | ConversionError::Buffer { .. }
            | ConversionError::Geometry { .. }
            | ConversionError::Image { .. }
            | ConversionError::EmptyScene => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        };
        let message = err.to_string();
        AppError::with_source(kind, message, err)
    }
}
