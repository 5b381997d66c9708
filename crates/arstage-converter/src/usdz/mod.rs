//! USDZ export.
//!
//! Layout of a package:
//!
//! ```text
//! model.usda                       root layer, always first
//! geometries/Geometry_<n>.usda     one layer per unique primitive
//! textures/Texture_<n>.png         one PNG per exported image
//! ```

pub mod package;
pub mod texture;
pub mod usda;

use arstage_core::config::{Anchoring, ConverterConfig, PlaneAlignment};
use tracing::info;

use crate::error::ConversionError;
use crate::scene::Scene;

pub use package::PackageWriter;

/// Name of the root layer inside the package.
pub const ROOT_LAYER: &str = "model.usda";

/// Exporter options.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Largest texture edge in pixels.
    pub max_texture_size: u32,
    /// Quick Look anchoring type.
    pub anchoring: Anchoring,
    /// Plane alignment for plane anchoring.
    pub plane_alignment: PlaneAlignment,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            max_texture_size: 1024,
            anchoring: Anchoring::Plane,
            plane_alignment: PlaneAlignment::Horizontal,
        }
    }
}

impl From<&ConverterConfig> for ExportOptions {
    fn from(config: &ConverterConfig) -> Self {
        Self {
            max_texture_size: config.max_texture_size,
            anchoring: config.anchoring,
            plane_alignment: config.plane_alignment,
        }
    }
}

/// Writes a [`Scene`] as a USDZ package.
#[derive(Debug, Clone, Default)]
pub struct UsdzExporter {
    options: ExportOptions,
}

impl UsdzExporter {
    /// Create an exporter.
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export on the blocking pool; texture encoding is CPU bound.
    pub async fn export(&self, scene: Scene) -> Result<Vec<u8>, ConversionError> {
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || build_package(&scene, &options)).await?
    }
}

/// Build the package bytes synchronously.
pub fn build_package(scene: &Scene, options: &ExportOptions) -> Result<Vec<u8>, ConversionError> {
    let mut package = PackageWriter::new();
    package.add(ROOT_LAYER, usda::root_layer(scene, options).as_bytes())?;

    for (index, geometry) in scene.geometries.iter().enumerate() {
        package.add(
            &usda::geometry_path(index),
            usda::geometry_layer(geometry).as_bytes(),
        )?;
    }

    let images = scene.exported_images();
    for &index in &images {
        let png = texture::encode_png(
            index,
            &scene.images[index].image,
            options.max_texture_size,
        )?;
        package.add(&texture::texture_path(index), &png)?;
    }

    let entries = package.len();
    let bytes = package.finish()?;
    info!(
        entries,
        geometries = scene.geometries.len(),
        textures = images.len(),
        bytes = bytes.len(),
        "USDZ package built"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::DecodedImage;
    use crate::scene::{
        Geometry, IDENTITY, Material, MeshInstance, Texture, TextureRole, TextureSlot, WrapMode,
    };
    use std::io::Cursor;

    fn textured_scene() -> Scene {
        Scene {
            name: Some("Demo".to_string()),
            instances: vec![MeshInstance {
                name: None,
                geometry: 0,
                material: Some(0),
                world: IDENTITY,
            }],
            geometries: vec![Geometry {
                name: "tri_0".to_string(),
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
                indices: vec![0, 1, 2],
                ..Default::default()
            }],
            materials: vec![Material {
                base_color_texture: Some(TextureSlot {
                    role: TextureRole::BaseColor,
                    texture: 0,
                    tex_coord: 0,
                }),
                ..Default::default()
            }],
            textures: vec![Texture {
                image: 1,
                wrap_s: WrapMode::Repeat,
                wrap_t: WrapMode::Repeat,
            }],
            images: vec![
                DecodedImage::new(image::DynamicImage::new_rgb8(4, 4)),
                DecodedImage::new(image::DynamicImage::new_rgb8(64, 64)),
            ],
        }
    }

    #[tokio::test]
    async fn test_export_writes_expected_entries() {
        let exporter = UsdzExporter::new(ExportOptions {
            max_texture_size: 16,
            ..Default::default()
        });
        let bytes = exporter.export(textured_scene()).await.expect("export");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open");
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "model.usda".to_string(),
                "geometries/Geometry_0.usda".to_string(),
                "textures/Texture_1.png".to_string(),
            ]
        );

        let mut png = Vec::new();
        std::io::Read::read_to_end(
            &mut archive.by_name("textures/Texture_1.png").expect("texture"),
            &mut png,
        )
        .expect("read");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn test_options_from_config() {
        let config = ConverterConfig {
            max_texture_size: 512,
            anchoring: Anchoring::Face,
            ..Default::default()
        };
        let options = ExportOptions::from(&config);
        assert_eq!(options.max_texture_size, 512);
        assert_eq!(options.anchoring, Anchoring::Face);
        assert_eq!(options.plane_alignment, PlaneAlignment::Horizontal);
    }
}
