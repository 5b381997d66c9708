//! In-memory scene produced by the loader and consumed by the exporter.
//!
//! The node hierarchy is flattened: each [`MeshInstance`] carries its world
//! matrix and points at shared [`Geometry`] and [`Material`] entries.

use crate::imaging::DecodedImage;

/// Column-major 4x4 matrix, `m[column][row]`.
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// `a * b` for column-major matrices.
pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// A flattened, exportable scene.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Scene name from the document, if any.
    pub name: Option<String>,
    /// Placed meshes.
    pub instances: Vec<MeshInstance>,
    /// Unique triangle geometries.
    pub geometries: Vec<Geometry>,
    /// Materials, indexed as in the source document.
    pub materials: Vec<Material>,
    /// Textures (image + sampler).
    pub textures: Vec<Texture>,
    /// Decoded images, indexed as in the source document.
    pub images: Vec<DecodedImage>,
}

impl Scene {
    /// Indices of the images that end up in the package: those bound on UV
    /// set 0 by a material some instance uses. Sorted, without duplicates.
    pub fn exported_images(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self
            .instances
            .iter()
            .filter_map(|i| i.material)
            .filter_map(|m| self.materials.get(m))
            .flat_map(|m| m.texture_slots())
            .filter(|slot| slot.tex_coord == 0)
            .filter_map(|slot| self.textures.get(slot.texture))
            .map(|t| t.image)
            .filter(|image| *image < self.images.len())
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

/// One placed mesh primitive.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    /// Source node name, if any.
    pub name: Option<String>,
    /// Index into [`Scene::geometries`].
    pub geometry: usize,
    /// Index into [`Scene::materials`]; `None` uses the default material.
    pub material: Option<usize>,
    /// Node-to-world transform.
    pub world: Mat4,
}

/// Indexed triangle geometry.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Mesh name plus primitive index.
    pub name: String,
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals.
    pub normals: Option<Vec<[f32; 3]>>,
    /// First UV set.
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Vertex colors (linear RGB).
    pub colors: Option<Vec<[f32; 3]>>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds `(min, max)`; `None` for an empty geometry.
    pub fn extent(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(mut lo, mut hi), p| {
            for i in 0..3 {
                lo[i] = lo[i].min(p[i]);
                hi[i] = hi[i].max(p[i]);
            }
            (lo, hi)
        }))
    }
}

/// Alpha handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// Alpha ignored.
    #[default]
    Opaque,
    /// Alpha tested against a cutoff.
    Mask,
    /// Alpha blended.
    Blend,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Tile.
    #[default]
    Repeat,
    /// Clamp to edge.
    Clamp,
    /// Tile mirrored.
    Mirror,
}

/// A texture: an image plus sampling state.
#[derive(Debug, Clone)]
pub struct Texture {
    /// Index into [`Scene::images`].
    pub image: usize,
    /// Horizontal wrap.
    pub wrap_s: WrapMode,
    /// Vertical wrap.
    pub wrap_t: WrapMode,
}

/// Which material input a texture feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRole {
    /// Base color (and alpha).
    BaseColor,
    /// Packed roughness (G) and metallic (B).
    MetallicRoughness,
    /// Tangent-space normal map.
    Normal,
    /// Ambient occlusion (R).
    Occlusion,
    /// Emissive color.
    Emissive,
}

impl TextureRole {
    /// Short identifier used in prim names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseColor => "diffuse",
            Self::MetallicRoughness => "metallicRoughness",
            Self::Normal => "normal",
            Self::Occlusion => "occlusion",
            Self::Emissive => "emissive",
        }
    }

    /// Whether the texture holds color data (sRGB) rather than raw values.
    pub fn is_color(&self) -> bool {
        matches!(self, Self::BaseColor | Self::Emissive)
    }
}

/// A material texture binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSlot {
    /// Role in the material.
    pub role: TextureRole,
    /// Index into [`Scene::textures`].
    pub texture: usize,
    /// UV set; only set 0 is exported.
    pub tex_coord: u32,
}

/// Metallic-roughness material.
#[derive(Debug, Clone)]
pub struct Material {
    /// Material name, if any.
    pub name: Option<String>,
    /// Linear RGBA base color factor.
    pub base_color: [f32; 4],
    /// Metallic factor.
    pub metallic: f32,
    /// Roughness factor.
    pub roughness: f32,
    /// Emissive factor.
    pub emissive: [f32; 3],
    /// Alpha handling.
    pub alpha_mode: AlphaMode,
    /// Cutoff for [`AlphaMode::Mask`].
    pub alpha_cutoff: f32,
    /// Render back faces.
    pub double_sided: bool,
    /// Base color texture.
    pub base_color_texture: Option<TextureSlot>,
    /// Metallic-roughness texture.
    pub metallic_roughness_texture: Option<TextureSlot>,
    /// Normal texture.
    pub normal_texture: Option<TextureSlot>,
    /// Occlusion texture.
    pub occlusion_texture: Option<TextureSlot>,
    /// Emissive texture.
    pub emissive_texture: Option<TextureSlot>,
}

impl Default for Material {
    /// The glTF default material: white, fully metallic, fully rough.
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 1.0,
            roughness: 1.0,
            emissive: [0.0, 0.0, 0.0],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
        }
    }
}

impl Material {
    /// All bound texture slots.
    pub fn texture_slots(&self) -> impl Iterator<Item = TextureSlot> + '_ {
        [
            self.base_color_texture,
            self.metallic_roughness_texture,
            self.normal_texture,
            self.occlusion_texture,
            self.emissive_texture,
        ]
        .into_iter()
        .flatten()
    }
}
