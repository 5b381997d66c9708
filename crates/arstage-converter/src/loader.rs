//! GLB / glTF parsing into a flattened [`Scene`].

use std::collections::{HashMap, HashSet};

use gltf::Gltf;
use gltf::buffer::Source as BufferSource;
use gltf::image::Source as GltfImageSource;
use gltf::mesh::{Mode, Semantic};
use gltf::texture::WrappingMode;
use tracing::{debug, info, warn};

use crate::error::ConversionError;
use crate::host::HostEnvironment;
use crate::imaging::DecodedImage;
use crate::scene::{
    AlphaMode, Geometry, IDENTITY, Mat4, Material, MeshInstance, Scene, Texture, TextureRole,
    TextureSlot, WrapMode, mat4_mul,
};
use crate::uri::DataUri;

/// Parses glTF documents using the capabilities of a [`HostEnvironment`].
#[derive(Debug)]
pub struct GltfLoader<'a> {
    host: &'a HostEnvironment,
}

impl<'a> GltfLoader<'a> {
    /// Create a loader bound to a host environment.
    pub fn new(host: &'a HostEnvironment) -> Self {
        Self { host }
    }

    /// Parse a GLB (or glTF JSON) document.
    ///
    /// Embedded images are handed to the image loader through short-lived
    /// blob URLs that are revoked once the image is decoded.
    pub async fn parse(&self, data: &[u8]) -> Result<Scene, ConversionError> {
        let Gltf { document, blob } = Gltf::from_slice(data)?;

        let buffers = self.load_buffers(&document, blob).await?;
        let images = self.load_images(&document, &buffers).await?;
        let textures = document.textures().map(|t| convert_texture(&t)).collect();
        let materials = document.materials().map(|m| convert_material(&m)).collect();

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        let name = scene.as_ref().and_then(|s| s.name()).map(str::to_string);
        let roots: Vec<gltf::Node<'_>> = match scene {
            Some(scene) => scene.nodes().collect(),
            None => {
                let children: HashSet<usize> = document
                    .nodes()
                    .flat_map(|n| n.children().map(|c| c.index()))
                    .collect();
                document
                    .nodes()
                    .filter(|n| !children.contains(&n.index()))
                    .collect()
            }
        };

        let mut builder = SceneBuilder::new(&buffers);
        builder.visit(roots)?;
        if builder.instances.is_empty() {
            return Err(ConversionError::EmptyScene);
        }

        let scene = Scene {
            name,
            instances: builder.instances,
            geometries: builder.geometries,
            materials,
            textures,
            images,
        };
        info!(
            instances = scene.instances.len(),
            geometries = scene.geometries.len(),
            materials = scene.materials.len(),
            images = scene.images.len(),
            "Parsed glTF document"
        );
        Ok(scene)
    }

    async fn load_buffers(
        &self,
        document: &gltf::Document,
        mut blob: Option<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, ConversionError> {
        let mut buffers = Vec::new();
        for buffer in document.buffers() {
            let index = buffer.index();
            let data = match buffer.source() {
                BufferSource::Bin => blob.take().ok_or_else(|| ConversionError::Buffer {
                    index,
                    reason: "document has no binary chunk".to_string(),
                })?,
                BufferSource::Uri(uri) if DataUri::is_data_uri(uri) => {
                    DataUri::parse(uri)
                        .map_err(|reason| ConversionError::Buffer { index, reason })?
                        .data
                }
                BufferSource::Uri(uri) => {
                    self.host
                        .read_resource(uri)
                        .await
                        .map_err(|e| ConversionError::Buffer {
                            index,
                            reason: format!("{uri}: {e}"),
                        })?
                }
            };

            if data.len() < buffer.length() {
                return Err(ConversionError::Buffer {
                    index,
                    reason: format!(
                        "declared {} bytes but only {} available",
                        buffer.length(),
                        data.len()
                    ),
                });
            }
            debug!(index, bytes = data.len(), "Buffer resolved");
            buffers.push(data);
        }
        Ok(buffers)
    }

    async fn load_images(
        &self,
        document: &gltf::Document,
        buffers: &[Vec<u8>],
    ) -> Result<Vec<DecodedImage>, ConversionError> {
        let mut images = Vec::new();
        for image in document.images() {
            let index = image.index();
            let result = match image.source() {
                GltfImageSource::View { view, mime_type } => {
                    let start = view.offset();
                    let bytes = start
                        .checked_add(view.length())
                        .and_then(|end| buffers.get(view.buffer().index())?.get(start..end))
                        .ok_or_else(|| ConversionError::Buffer {
                            index: view.buffer().index(),
                            reason: format!("view for image {index} is out of range"),
                        })?;

                    let blobs = self.host.blobs();
                    let url = blobs.create_object_url(bytes.to_vec(), Some(mime_type));
                    let result = self.host.images().load(&url).await;
                    blobs.revoke_object_url(&url);
                    result
                }
                GltfImageSource::Uri { uri, .. } => self.host.images().load(uri).await,
            };
            images.push(result.map_err(|source| ConversionError::Image { index, source })?);
        }
        Ok(images)
    }
}

struct SceneBuilder<'b> {
    buffers: &'b [Vec<u8>],
    instances: Vec<MeshInstance>,
    geometries: Vec<Geometry>,
    cache: HashMap<(usize, usize), Option<usize>>,
}

impl<'b> SceneBuilder<'b> {
    fn new(buffers: &'b [Vec<u8>]) -> Self {
        Self {
            buffers,
            instances: Vec::new(),
            geometries: Vec::new(),
            cache: HashMap::new(),
        }
    }

    fn visit(&mut self, roots: Vec<gltf::Node<'_>>) -> Result<(), ConversionError> {
        let mut visited = HashSet::new();
        let mut stack: Vec<(gltf::Node<'_>, Mat4)> =
            roots.into_iter().rev().map(|n| (n, IDENTITY)).collect();

        while let Some((node, parent)) = stack.pop() {
            if !visited.insert(node.index()) {
                warn!(node = node.index(), "Node reached twice, skipping");
                continue;
            }
            let world = mat4_mul(&parent, &node.transform().matrix());

            if let Some(mesh) = node.mesh() {
                for primitive in mesh.primitives() {
                    let Some(geometry) = self.geometry(&mesh, &primitive)? else {
                        continue;
                    };
                    self.instances.push(MeshInstance {
                        name: node.name().map(str::to_string),
                        geometry,
                        material: primitive.material().index(),
                        world,
                    });
                }
            }

            let children: Vec<gltf::Node<'_>> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|c| (c, world)));
        }
        Ok(())
    }

    fn geometry(
        &mut self,
        mesh: &gltf::Mesh<'_>,
        primitive: &gltf::Primitive<'_>,
    ) -> Result<Option<usize>, ConversionError> {
        let key = (mesh.index(), primitive.index());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(*cached);
        }
        let slot = read_geometry(self.buffers, mesh, primitive)?.map(|geometry| {
            self.geometries.push(geometry);
            self.geometries.len() - 1
        });
        self.cache.insert(key, slot);
        Ok(slot)
    }
}

fn read_geometry(
    buffers: &[Vec<u8>],
    mesh: &gltf::Mesh<'_>,
    primitive: &gltf::Primitive<'_>,
) -> Result<Option<Geometry>, ConversionError> {
    let mesh_name = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
    let mode = primitive.mode();
    if !matches!(
        mode,
        Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan
    ) {
        warn!(mesh = %mesh_name, primitive = primitive.index(), mode = ?mode, "Skipping non-triangle primitive");
        return Ok(None);
    }

    let invalid = |reason: String| ConversionError::Geometry {
        mesh: mesh_name.clone(),
        primitive: primitive.index(),
        reason,
    };

    if primitive.get(&Semantic::Positions).is_none() {
        return Err(invalid("missing POSITION attribute".to_string()));
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| invalid("POSITION data lies outside its buffer".to_string()))?
        .collect();
    let vertex_count = positions.len();

    let normals = reader
        .read_normals()
        .map(|it| it.collect::<Vec<_>>())
        .filter(|n| matches_vertex_count(&mesh_name, "NORMAL", n.len(), vertex_count));
    let uvs = reader
        .read_tex_coords(0)
        .map(|it| it.into_f32().collect::<Vec<_>>())
        .filter(|uv| matches_vertex_count(&mesh_name, "TEXCOORD_0", uv.len(), vertex_count));
    let colors = reader
        .read_colors(0)
        .map(|it| it.into_rgb_f32().collect::<Vec<_>>())
        .filter(|c| matches_vertex_count(&mesh_name, "COLOR_0", c.len(), vertex_count));

    let raw: Vec<u32> = match (primitive.indices(), reader.read_indices()) {
        (_, Some(indices)) => indices.into_u32().collect(),
        (Some(_), None) => {
            return Err(invalid("index data lies outside its buffer".to_string()));
        }
        (None, None) => (0..vertex_count as u32).collect(),
    };
    let indices = triangulate(mode, raw);
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(invalid(format!(
            "index {bad} out of range for {vertex_count} vertices"
        )));
    }

    Ok(Some(Geometry {
        name: format!("{mesh_name}_{}", primitive.index()),
        positions,
        normals,
        uvs,
        colors,
        indices,
    }))
}

fn matches_vertex_count(mesh: &str, attribute: &str, len: usize, expected: usize) -> bool {
    if len != expected {
        warn!(mesh, attribute, len, expected, "Attribute length mismatch, dropping attribute");
    }
    len == expected
}

/// Convert strips and fans to a plain triangle list.
fn triangulate(mode: Mode, indices: Vec<u32>) -> Vec<u32> {
    match mode {
        Mode::TriangleStrip => (2..indices.len())
            .flat_map(|i| {
                if i % 2 == 0 {
                    [indices[i - 2], indices[i - 1], indices[i]]
                } else {
                    [indices[i - 1], indices[i - 2], indices[i]]
                }
            })
            .collect(),
        Mode::TriangleFan => (2..indices.len())
            .flat_map(|i| [indices[0], indices[i - 1], indices[i]])
            .collect(),
        _ => {
            let mut indices = indices;
            indices.truncate(indices.len() / 3 * 3);
            indices
        }
    }
}

fn convert_texture(texture: &gltf::Texture<'_>) -> Texture {
    let sampler = texture.sampler();
    Texture {
        image: texture.source().index(),
        wrap_s: convert_wrap(sampler.wrap_s()),
        wrap_t: convert_wrap(sampler.wrap_t()),
    }
}

fn convert_wrap(mode: WrappingMode) -> WrapMode {
    match mode {
        WrappingMode::ClampToEdge => WrapMode::Clamp,
        WrappingMode::MirroredRepeat => WrapMode::Mirror,
        WrappingMode::Repeat => WrapMode::Repeat,
    }
}

fn slot(role: TextureRole, texture: usize, tex_coord: u32) -> TextureSlot {
    TextureSlot {
        role,
        texture,
        tex_coord,
    }
}

fn convert_material(material: &gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    Material {
        name: material.name().map(str::to_string),
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: material.emissive_factor(),
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
        double_sided: material.double_sided(),
        base_color_texture: pbr
            .base_color_texture()
            .map(|i| slot(TextureRole::BaseColor, i.texture().index(), i.tex_coord())),
        metallic_roughness_texture: pbr.metallic_roughness_texture().map(|i| {
            slot(
                TextureRole::MetallicRoughness,
                i.texture().index(),
                i.tex_coord(),
            )
        }),
        normal_texture: material
            .normal_texture()
            .map(|n| slot(TextureRole::Normal, n.texture().index(), n.tex_coord())),
        occlusion_texture: material
            .occlusion_texture()
            .map(|o| slot(TextureRole::Occlusion, o.texture().index(), o.tex_coord())),
        emissive_texture: material
            .emissive_texture()
            .map(|i| slot(TextureRole::Emissive, i.texture().index(), i.tex_coord())),
    }
}
