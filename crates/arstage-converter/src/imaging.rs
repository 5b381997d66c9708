//! Texture image resolution and decoding.
//!
//! Every image the loader needs goes through [`ImageLoader`]. Where the bytes
//! come from is decided by [`ImageSource`] and answered by an injected
//! [`ImageResolver`]; decoding runs on the blocking pool.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::blob::BlobRegistry;
use crate::uri::DataUri;

/// Longest URL prefix written to the log.
const LOG_URL_CHARS: usize = 50;

/// Errors from loading an image.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    /// A blob URL is not (or no longer) registered.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// A file-backed image could not be read.
    #[error("Failed to read image '{path}': {source}")]
    Io {
        /// Resolved path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An inline `data:` URI is malformed.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The bytes are not a decodable image.
    #[error("Failed to decode image '{url}': {reason}")]
    Decode {
        /// URL (truncated) of the image.
        url: String,
        /// Decoder message.
        reason: String,
    },

    /// Decoding took longer than the configured limit.
    #[error("Decoding image '{url}' timed out after {seconds}s")]
    Timeout {
        /// URL (truncated) of the image.
        url: String,
        /// The limit that was exceeded.
        seconds: u64,
    },
}

/// Where an image's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A `blob:nodedata:` URL registered in the [`BlobRegistry`].
    Reference(String),
    /// An inline `data:` URI.
    DataUri(String),
    /// A file path, relative to the model's directory unless absolute.
    Path(PathBuf),
}

impl ImageSource {
    /// Classify a URL.
    pub fn parse(url: &str) -> Self {
        if BlobRegistry::is_blob_url(url) {
            Self::Reference(url.to_string())
        } else if DataUri::is_data_uri(url) {
            Self::DataUri(url.to_string())
        } else {
            Self::Path(PathBuf::from(url))
        }
    }
}

/// Resolves image sources to raw bytes.
///
/// The default implementation is [`HostResolver`](crate::host::HostResolver);
/// tests and embedders can inject their own.
#[async_trait]
pub trait ImageResolver: Send + Sync + fmt::Debug + 'static {
    /// Resolve a registered reference URL.
    async fn resolve_reference(&self, url: &str) -> Result<Bytes, ImageLoadError>;

    /// Resolve a file path.
    async fn resolve_path(&self, path: &Path) -> Result<Bytes, ImageLoadError>;
}

/// A decoded texture image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixel data.
    pub image: Arc<DynamicImage>,
}

impl DecodedImage {
    /// Wrap decoded pixels.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the pixel format carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }
}

/// Placeholder returned by [`ImageLoader::load_with_callbacks`].
///
/// It carries no pixels. The outcome is only ever delivered through the
/// callbacks; the handle exists so callers can wait for delivery.
#[derive(Debug)]
pub struct ImageHandle {
    url: String,
    task: JoinHandle<()>,
}

impl ImageHandle {
    /// The URL being loaded.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a callback has already run.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the callback has run.
    pub async fn finished(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// Loads and decodes texture images.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    resolver: Arc<dyn ImageResolver>,
    decode_timeout: Duration,
}

impl ImageLoader {
    /// Create a loader over a resolver.
    pub fn new(resolver: Arc<dyn ImageResolver>, decode_timeout: Duration) -> Self {
        Self {
            resolver,
            decode_timeout,
        }
    }

    /// Load and decode the image at `url`.
    ///
    /// Blob URLs missing from the registry fail with
    /// [`ImageLoadError::NotFound`] without touching the decoder.
    pub async fn load(&self, url: &str) -> Result<DecodedImage, ImageLoadError> {
        let short = truncate(url);
        debug!(url = %short, "Loading image");

        let bytes = match ImageSource::parse(url) {
            ImageSource::Reference(url) => self.resolver.resolve_reference(&url).await?,
            ImageSource::DataUri(uri) => DataUri::parse(&uri)
                .map(|d| Bytes::from(d.data))
                .map_err(ImageLoadError::InvalidDataUri)?,
            ImageSource::Path(path) => self.resolver.resolve_path(&path).await?,
        };

        debug!(url = %short, bytes = bytes.len(), "Image bytes resolved, decoding");
        let decoded = self.decode(short.clone(), bytes).await?;
        debug!(
            url = %short,
            width = decoded.width(),
            height = decoded.height(),
            "Image decoded"
        );
        Ok(decoded)
    }

    /// Callback form of [`load`](Self::load).
    ///
    /// Returns a placeholder immediately. Exactly one of `on_load` or
    /// `on_error` runs, once, on the runtime. Must be called from within a
    /// Tokio runtime.
    pub fn load_with_callbacks<L, E>(&self, url: &str, on_load: L, on_error: E) -> ImageHandle
    where
        L: FnOnce(DecodedImage) + Send + 'static,
        E: FnOnce(ImageLoadError) + Send + 'static,
    {
        let loader = self.clone();
        let target = url.to_string();
        let task = tokio::spawn(async move {
            match loader.load(&target).await {
                Ok(image) => on_load(image),
                Err(err) => {
                    tracing::error!(url = %truncate(&target), error = %err, "Image load failed");
                    on_error(err)
                }
            }
        });

        ImageHandle {
            url: url.to_string(),
            task,
        }
    }

    async fn decode(&self, url: String, bytes: Bytes) -> Result<DecodedImage, ImageLoadError> {
        let task = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes));

        match tokio::time::timeout(self.decode_timeout, task).await {
            Ok(Ok(Ok(image))) => Ok(DecodedImage::new(image)),
            Ok(Ok(Err(e))) => Err(ImageLoadError::Decode {
                url,
                reason: e.to_string(),
            }),
            Ok(Err(join)) => Err(ImageLoadError::Decode {
                url,
                reason: format!("decoder task failed: {join}"),
            }),
            Err(_) => Err(ImageLoadError::Timeout {
                url,
                seconds: self.decode_timeout.as_secs(),
            }),
        }
    }
}

fn truncate(url: &str) -> String {
    if url.chars().count() <= LOG_URL_CHARS {
        url.to_string()
    } else {
        let head: String = url.chars().take(LOG_URL_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostEnvironment;
    use std::collections::HashSet;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .expect("encode png");
        out
    }

    fn host() -> HostEnvironment {
        HostEnvironment::new(std::env::temp_dir(), Duration::from_secs(5))
    }

    #[test]
    fn test_source_classification() {
        assert!(matches!(
            ImageSource::parse("blob:nodedata:abc"),
            ImageSource::Reference(_)
        ));
        assert!(matches!(
            ImageSource::parse("data:image/png;base64,AAAA"),
            ImageSource::DataUri(_)
        ));
        assert_eq!(
            ImageSource::parse("textures/a.png"),
            ImageSource::Path(PathBuf::from("textures/a.png"))
        );
    }

    #[test]
    fn test_truncate_long_urls() {
        let url = format!("blob:nodedata:{}", "x".repeat(80));
        let short = truncate(&url);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), LOG_URL_CHARS + 3);
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_load_registered_blob() {
        let host = host();
        let url = host
            .blobs()
            .create_object_url(png_bytes(4, 2), Some("image/png"));

        let decoded = host.images().load(&url).await.expect("decode");
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
        assert!(decoded.has_alpha());
    }

    #[tokio::test]
    async fn test_load_missing_blob_is_not_found() {
        let host = host();
        let err = host
            .images()
            .load("blob:nodedata:doesnotexist")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::NotFound(ref u) if u == "blob:nodedata:doesnotexist"));
    }

    #[tokio::test]
    async fn test_load_revoked_blob_is_not_found() {
        let host = host();
        let url = host.blobs().create_object_url(png_bytes(1, 1), None);
        host.blobs().revoke_object_url(&url);
        assert!(matches!(
            host.images().load(&url).await,
            Err(ImageLoadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_garbage_is_decode_error() {
        let host = host();
        let url = host.blobs().create_object_url(vec![0u8, 1, 2, 3], None);
        assert!(matches!(
            host.images().load(&url).await,
            Err(ImageLoadError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("tex.png"), png_bytes(3, 3)).expect("write");
        let host = HostEnvironment::new(dir.path(), Duration::from_secs(5));

        let decoded = host.images().load("tex.png").await.expect("decode");
        assert_eq!(decoded.width(), 3);

        let missing = host.images().load("nope.png").await.unwrap_err();
        assert!(matches!(missing, ImageLoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_callbacks_fire_once_per_registered_url() {
        let host = host();
        let urls: Vec<String> = (0..3)
            .map(|i| host.blobs().create_object_url(png_bytes(i + 1, 1), None))
            .collect();

        let loaded = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for url in &urls {
            let loaded = Arc::clone(&loaded);
            let errors = Arc::clone(&errors);
            let target = url.clone();
            let handle = host.images().load_with_callbacks(
                url,
                move |image| {
                    loaded
                        .lock()
                        .expect("lock")
                        .push((target, image.width()))
                },
                move |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                },
            );
            assert_eq!(handle.url(), url);
            handles.push(handle);
        }
        for handle in handles {
            handle.finished().await.expect("join");
        }

        let loaded = loaded.lock().expect("lock");
        assert_eq!(loaded.len(), 3);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        let distinct: HashSet<&String> = loaded.iter().map(|(u, _)| u).collect();
        assert_eq!(distinct.len(), 3);
        for (url, width) in loaded.iter() {
            let index = urls.iter().position(|u| u == url).expect("known url");
            assert_eq!(*width, index as u32 + 1);
        }
    }

    #[tokio::test]
    async fn test_callbacks_report_missing_blob() {
        let host = host();
        let successes = Arc::new(AtomicUsize::new(0));
        let failure = Arc::new(Mutex::new(None));

        let s = Arc::clone(&successes);
        let f = Arc::clone(&failure);
        let handle = host.images().load_with_callbacks(
            "blob:nodedata:missing",
            move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            },
            move |err| {
                *f.lock().expect("lock") = Some(err);
            },
        );
        handle.finished().await.expect("join");

        assert_eq!(successes.load(Ordering::SeqCst), 0);
        let failure = failure.lock().expect("lock");
        assert!(matches!(*failure, Some(ImageLoadError::NotFound(_))));
    }
}
