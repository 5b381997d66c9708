//! Texture re-encoding for the package.

use image::imageops::FilterType;
use image::{ColorType, DynamicImage};

use crate::error::ConversionError;

/// Package path of image `index`.
pub fn texture_path(index: usize) -> String {
    format!("textures/Texture_{index}.png")
}

/// Encode an image as PNG, downscaling so neither edge exceeds `max_size`.
pub fn encode_png(
    index: usize,
    image: &DynamicImage,
    max_size: u32,
) -> Result<Vec<u8>, ConversionError> {
    let (width, height) = (image.width(), image.height());

    let resized;
    let mut source = image;
    if width > max_size || height > max_size {
        resized = image.resize(max_size, max_size, FilterType::Triangle);
        tracing::debug!(
            index,
            from = %format!("{width}x{height}"),
            to = %format!("{}x{}", resized.width(), resized.height()),
            "Downscaled texture"
        );
        source = &resized;
    }

    // PNG has no float formats.
    let converted;
    if matches!(source.color(), ColorType::Rgb32F | ColorType::Rgba32F) {
        converted = DynamicImage::ImageRgba8(source.to_rgba8());
        source = &converted;
    }

    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    source
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| ConversionError::TextureEncode {
            index,
            reason: e.to_string(),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_path() {
        assert_eq!(texture_path(3), "textures/Texture_3.png");
    }

    #[test]
    fn test_large_texture_is_downscaled() {
        let image = DynamicImage::new_rgb8(256, 64);
        let png = encode_png(0, &image, 32).expect("encode");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (32, 8));
    }

    #[test]
    fn test_small_texture_keeps_size() {
        let image = DynamicImage::new_rgba8(8, 4);
        let png = encode_png(0, &image, 32).expect("encode");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn test_float_texture_is_converted() {
        let image = DynamicImage::new_rgba32f(4, 4);
        let png = encode_png(0, &image, 32).expect("encode");
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
