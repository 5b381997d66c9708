//! In-memory object URL registry.
//!
//! Embedded resources (texture bytes inside the GLB binary chunk) are given
//! a synthetic `blob:nodedata:<id>` URL so the image loader can resolve them
//! the same way it resolves any other image reference.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use uuid::Uuid;

/// URL scheme prefix for registry entries.
pub const BLOB_URL_PREFIX: &str = "blob:nodedata:";

/// A registered blob: raw bytes plus the MIME type they were declared with.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Raw contents.
    pub data: Bytes,
    /// Declared MIME type, if any.
    pub mime_type: Option<String>,
}

/// Maps object URLs to blobs for the lifetime of one conversion.
///
/// Starts empty and is dropped together with its [`HostEnvironment`](crate::HostEnvironment).
#[derive(Debug, Default)]
pub struct BlobRegistry {
    entries: Mutex<HashMap<String, Blob>>,
}

impl BlobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a URL belongs to the registry's scheme.
    pub fn is_blob_url(url: &str) -> bool {
        url.starts_with(BLOB_URL_PREFIX)
    }

    /// Register bytes and return a fresh object URL for them.
    pub fn create_object_url(&self, data: impl Into<Bytes>, mime_type: Option<&str>) -> String {
        let url = format!("{}{}", BLOB_URL_PREFIX, Uuid::new_v4().simple());
        let blob = Blob {
            data: data.into(),
            mime_type: mime_type.map(str::to_string),
        };
        self.lock().insert(url.clone(), blob);
        url
    }

    /// Remove a URL. Revoking an unknown URL is a no-op.
    pub fn revoke_object_url(&self, url: &str) {
        self.lock().remove(url);
    }

    /// Look up a URL.
    pub fn get(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Number of live URLs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no URLs are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Blob>> {
        // A poisoned map still holds valid entries.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let registry = BlobRegistry::new();
        let url = registry.create_object_url(vec![1u8, 2, 3], Some("image/png"));

        assert!(BlobRegistry::is_blob_url(&url));
        let blob = registry.get(&url).expect("registered");
        assert_eq!(blob.data.as_ref(), &[1, 2, 3]);
        assert_eq!(blob.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = BlobRegistry::new();
        let a = registry.create_object_url(vec![0u8], None);
        let b = registry.create_object_url(vec![0u8], None);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_revoke_removes_entry() {
        let registry = BlobRegistry::new();
        let url = registry.create_object_url(vec![9u8], None);
        registry.revoke_object_url(&url);
        assert!(registry.get(&url).is_none());
        assert!(registry.is_empty());

        // second revoke is harmless
        registry.revoke_object_url(&url);
    }

    #[test]
    fn test_non_blob_urls() {
        assert!(!BlobRegistry::is_blob_url("textures/wood.png"));
        assert!(!BlobRegistry::is_blob_url("data:image/png;base64,AAAA"));
        assert!(!BlobRegistry::is_blob_url("blob:https://example.com/1234"));
    }
}
