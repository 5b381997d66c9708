//! # ARStage Converter
//!
//! Converts a binary glTF (GLB) model into a USDZ package that iOS AR Quick
//! Look can open.
//!
//! ## Pipeline
//!
//! 1. A [`HostEnvironment`] is created for the run. It owns the blob registry
//!    used to hand embedded texture bytes to the image loader, and the image
//!    decoder capability.
//! 2. [`GltfLoader`] parses the GLB into a flattened [`Scene`]; every texture
//!    goes through the [`ImageLoader`].
//! 3. [`UsdzExporter`] writes the USDA layers and PNG textures into a stored,
//!    64-byte aligned zip.
//! 4. [`ConversionDriver`] sequences read, parse, export and write, and
//!    honours cancellation.

pub mod blob;
pub mod driver;
pub mod error;
pub mod host;
pub mod imaging;
pub mod loader;
pub mod scene;
pub mod uri;
pub mod usdz;

pub use blob::BlobRegistry;
pub use driver::{ConversionDriver, ConversionReport};
pub use error::ConversionError;
pub use host::HostEnvironment;
pub use imaging::{
    DecodedImage, ImageHandle, ImageLoadError, ImageLoader, ImageResolver, ImageSource,
};
pub use loader::GltfLoader;
pub use scene::Scene;
pub use usdz::UsdzExporter;
