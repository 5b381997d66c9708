//! Host environment for one conversion run.
//!
//! Everything the loader needs from the outside world (object URLs, image
//! bytes, external resource files) is reached through a [`HostEnvironment`]
//! passed in explicitly. Dropping it discards the blob registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::BlobRegistry;
use crate::imaging::{ImageLoadError, ImageLoader, ImageResolver};

/// Capabilities handed to the glTF loader.
#[derive(Debug)]
pub struct HostEnvironment {
    blobs: Arc<BlobRegistry>,
    images: ImageLoader,
    base_dir: PathBuf,
}

impl HostEnvironment {
    /// Create an environment with an empty blob registry and the default
    /// resolver. Relative resource URIs resolve against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, decode_timeout: Duration) -> Self {
        let base_dir = base_dir.into();
        let blobs = Arc::new(BlobRegistry::new());
        let resolver = Arc::new(HostResolver::new(Arc::clone(&blobs), base_dir.clone()));
        Self {
            images: ImageLoader::new(resolver, decode_timeout),
            blobs,
            base_dir,
        }
    }

    /// Create an environment with an injected resolver.
    ///
    /// The resolver is responsible for answering reference lookups; it
    /// usually shares `blobs` with the environment.
    pub fn with_resolver(
        blobs: Arc<BlobRegistry>,
        resolver: Arc<dyn ImageResolver>,
        base_dir: impl Into<PathBuf>,
        decode_timeout: Duration,
    ) -> Self {
        Self {
            images: ImageLoader::new(resolver, decode_timeout),
            blobs,
            base_dir: base_dir.into(),
        }
    }

    /// The object URL registry.
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// The image loader.
    pub fn images(&self) -> &ImageLoader {
        &self.images
    }

    /// Directory relative resources resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Read an external resource (e.g. a `.bin` buffer) next to the model.
    pub async fn read_resource(&self, uri: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(resolve_relative(&self.base_dir, Path::new(uri))).await
    }
}

/// Default [`ImageResolver`]: blob registry for references, filesystem for
/// paths.
#[derive(Debug)]
pub struct HostResolver {
    blobs: Arc<BlobRegistry>,
    base_dir: PathBuf,
}

impl HostResolver {
    /// Create a resolver over a registry and a base directory.
    pub fn new(blobs: Arc<BlobRegistry>, base_dir: PathBuf) -> Self {
        Self { blobs, base_dir }
    }
}

#[async_trait]
impl ImageResolver for HostResolver {
    async fn resolve_reference(&self, url: &str) -> Result<Bytes, ImageLoadError> {
        self.blobs
            .get(url)
            .map(|blob| blob.data)
            .ok_or_else(|| ImageLoadError::NotFound(url.to_string()))
    }

    async fn resolve_path(&self, path: &Path) -> Result<Bytes, ImageLoadError> {
        let full = resolve_relative(&self.base_dir, path);
        tokio::fs::read(&full)
            .await
            .map(Bytes::from)
            .map_err(|source| ImageLoadError::Io { path: full, source })
    }
}

fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
