//! USDZ packaging: an uncompressed zip with 64-byte aligned entry data.

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::ConversionError;

/// Alignment of every entry's data within the archive.
pub const ALIGNMENT: u16 = 64;

/// In-memory USDZ archive builder. The first entry added is the root layer.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl PackageWriter {
    /// Start an empty package.
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    /// Append a stored entry.
    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<(), ConversionError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .with_alignment(ALIGNMENT);
        self.zip.start_file(name, options)?;
        self.zip.write_all(data)?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(self) -> Result<Vec<u8>, ConversionError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn offset_of(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_entries_are_stored_and_aligned() {
        let mut package = PackageWriter::new();
        package
            .add("model.usda", b"#usda 1.0\n")
            .expect("add root");
        package
            .add("textures/Texture_0.png", b"PNGDATA-odd-length")
            .expect("add texture");
        package
            .add("geometries/Geometry_0.usda", b"#geometry layer\n")
            .expect("add geometry");
        assert_eq!(package.len(), 3);
        let bytes = package.finish().expect("finish");

        for needle in [&b"#usda 1.0"[..], b"PNGDATA", b"#geometry layer"] {
            let offset = offset_of(&bytes, needle).expect("entry data present");
            assert_eq!(offset % ALIGNMENT as usize, 0, "misaligned entry");
        }

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open archive");
        assert_eq!(archive.len(), 3);
        let mut first = archive.by_index(0).expect("first entry");
        assert_eq!(first.name(), "model.usda");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut text = String::new();
        first.read_to_string(&mut text).expect("read");
        assert_eq!(text, "#usda 1.0\n");
    }

    #[test]
    fn test_empty_package() {
        let package = PackageWriter::default();
        assert!(package.is_empty());
        let bytes = package.finish().expect("finish");
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open archive");
        assert_eq!(archive.len(), 0);
    }
}
