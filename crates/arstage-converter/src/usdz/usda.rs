//! USDA text generation.

use arstage_core::config::{Anchoring, PlaneAlignment};

use crate::scene::{AlphaMode, Geometry, Material, Scene, TextureSlot, WrapMode};

use super::ExportOptions;
use super::texture::texture_path;

const SIGNIFICANT_DIGITS: i32 = 7;
const CREATOR: &str = "arstage";
const MATERIALS_PATH: &str = "/Root/Materials";
const DEFAULT_MATERIAL: &str = "DefaultMaterial";

/// Format a float with 7 significant digits and no trailing zeros.
pub fn fmt_float(value: f32) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (SIGNIFICANT_DIGITS - 1 - magnitude).clamp(0, 12) as usize;
    let text = format!("{value:.decimals$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn tuple(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| fmt_float(*v)).collect();
    format!("({})", parts.join(", "))
}

fn tuple_array<const N: usize>(values: &[[f32; N]]) -> String {
    let parts: Vec<String> = values.iter().map(|v| tuple(v)).collect();
    format!("[{}]", parts.join(", "))
}

fn int_array(values: impl Iterator<Item = u32>) -> String {
    let parts: Vec<String> = values.map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Indented line writer.
#[derive(Default)]
struct Usda {
    out: String,
    depth: usize,
}

impl Usda {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self) {
        self.line("{");
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn header(&mut self, default_prim: &str) {
        self.line("#usda 1.0");
        self.line("(");
        self.depth += 1;
        self.line("customLayerData = {");
        self.line(format!("    string creator = \"{CREATOR}\""));
        self.line("}");
        self.line(format!("defaultPrim = \"{default_prim}\""));
        self.line("metersPerUnit = 1");
        self.line("upAxis = \"Y\"");
        self.depth -= 1;
        self.line(")");
        self.blank();
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Path of the layer holding geometry `index`.
pub fn geometry_path(index: usize) -> String {
    format!("geometries/Geometry_{index}.usda")
}

fn material_name(index: Option<usize>) -> String {
    match index {
        Some(i) => format!("Material_{i}"),
        None => DEFAULT_MATERIAL.to_string(),
    }
}

/// The `model.usda` root layer.
pub fn root_layer(scene: &Scene, options: &ExportOptions) -> String {
    let mut w = Usda::default();
    w.header("Root");

    w.line("def Xform \"Root\"");
    w.open();

    w.line("def Scope \"Scenes\" (");
    w.line("    kind = \"sceneLibrary\"");
    w.line(")");
    w.open();

    let scene_name = scene.name.as_deref().unwrap_or("Scene").replace('"', "'");
    w.line("def Xform \"Scene\" (");
    w.line("    customData = {");
    w.line("        bool preliminary_collidesWithEnvironment = 0");
    w.line(format!("        string sceneName = \"{scene_name}\""));
    w.line("    }");
    w.line(format!("    sceneName = \"{scene_name}\""));
    w.line(")");
    w.open();
    anchoring(&mut w, options);

    for (index, instance) in scene.instances.iter().enumerate() {
        let double_sided = instance
            .material
            .and_then(|m| scene.materials.get(m))
            .is_some_and(|m| m.double_sided);

        w.blank();
        w.line(format!("def Xform \"Object_{index}\" ("));
        w.line(format!(
            "    prepend references = @./{}@</Geometry>",
            geometry_path(instance.geometry)
        ));
        w.line("    prepend apiSchemas = [\"MaterialBindingAPI\"]");
        w.line(")");
        w.open();
        let rows: Vec<String> = instance.world.iter().map(|row| tuple(row)).collect();
        w.line(format!(
            "matrix4d xformOp:transform = ( {} )",
            rows.join(", ")
        ));
        w.line("uniform token[] xformOpOrder = [\"xformOp:transform\"]");
        w.blank();
        w.line(format!(
            "rel material:binding = <{MATERIALS_PATH}/{}>",
            material_name(instance.material)
        ));
        if double_sided {
            w.blank();
            w.line("over \"Geometry\"");
            w.open();
            w.line("uniform bool doubleSided = 1");
            w.close();
        }
        w.close();
    }

    w.close(); // Scene
    w.close(); // Scenes
    w.blank();

    w.line("def \"Materials\"");
    w.open();
    let mut used: Vec<Option<usize>> = scene.instances.iter().map(|i| i.material).collect();
    used.sort_unstable();
    used.dedup();
    let fallback = Material::default();
    for index in used {
        let material = index
            .and_then(|i| scene.materials.get(i))
            .unwrap_or(&fallback);
        material_prim(&mut w, &material_name(index), material, scene);
    }
    w.close(); // Materials

    w.close(); // Root
    w.finish()
}

fn anchoring(w: &mut Usda, options: &ExportOptions) {
    let kind = match options.anchoring {
        Anchoring::None => return,
        other => other.to_string(),
    };
    w.line(format!("token preliminary:anchoring:type = \"{kind}\""));
    if options.anchoring == Anchoring::Plane {
        let alignment = match options.plane_alignment {
            PlaneAlignment::Horizontal => "horizontal",
            PlaneAlignment::Vertical => "vertical",
            PlaneAlignment::Any => "any",
        };
        w.line(format!(
            "token preliminary:planeAnchoring:alignment = \"{alignment}\""
        ));
    }
}

/// A texture shader attached to a material.
struct Sampler<'s> {
    prim: String,
    slot: &'s TextureSlot,
    image: usize,
    wrap: (WrapMode, WrapMode),
    scale: Option<[f32; 4]>,
    bias: Option<[f32; 4]>,
    outputs: Vec<&'static str>,
}

fn wrap_token(mode: WrapMode) -> &'static str {
    match mode {
        WrapMode::Repeat => "repeat",
        WrapMode::Clamp => "clamp",
        WrapMode::Mirror => "mirror",
    }
}

fn output_type(output: &str) -> &'static str {
    if output == "rgb" { "float3" } else { "float" }
}

fn material_prim(w: &mut Usda, name: &str, material: &Material, scene: &Scene) {
    let path = format!("{MATERIALS_PATH}/{name}");
    let slot_for = |slot: &Option<TextureSlot>| -> Option<(TextureSlot, usize, (WrapMode, WrapMode))> {
        let slot = (*slot)?;
        if slot.tex_coord != 0 {
            tracing::warn!(material = name, role = slot.role.as_str(), "Only UV set 0 is exported, dropping texture");
            return None;
        }
        let texture = scene.textures.get(slot.texture)?;
        scene.images.get(texture.image)?;
        Some((slot, texture.image, (texture.wrap_s, texture.wrap_t)))
    };

    let base = slot_for(&material.base_color_texture);
    let metallic_roughness = slot_for(&material.metallic_roughness_texture);
    let normal = slot_for(&material.normal_texture);
    let occlusion = slot_for(&material.occlusion_texture);
    let emissive = slot_for(&material.emissive_texture);

    let connect_alpha = material.alpha_mode != AlphaMode::Opaque
        && base
            .as_ref()
            .is_some_and(|(_, image, _)| scene.images[*image].has_alpha());

    let mut samplers: Vec<Sampler<'_>> = Vec::new();
    let mut inputs: Vec<String> = Vec::new();
    let prim_name = |slot: &TextureSlot| format!("Texture_{}_{}", slot.texture, slot.role.as_str());

    match &base {
        Some((slot, image, wrap)) => {
            let prim = prim_name(slot);
            inputs.push(format!(
                "color3f inputs:diffuseColor.connect = <{path}/{prim}.outputs:rgb>"
            ));
            let mut outputs = vec!["rgb"];
            if connect_alpha {
                inputs.push(format!(
                    "float inputs:opacity.connect = <{path}/{prim}.outputs:a>"
                ));
                outputs.push("a");
            }
            samplers.push(Sampler {
                prim,
                slot,
                image: *image,
                wrap: *wrap,
                scale: Some(material.base_color),
                bias: None,
                outputs,
            });
        }
        None => {
            let [r, g, b, _] = material.base_color;
            inputs.push(format!("color3f inputs:diffuseColor = {}", tuple(&[r, g, b])));
        }
    }
    if !connect_alpha && material.alpha_mode != AlphaMode::Opaque {
        inputs.push(format!(
            "float inputs:opacity = {}",
            fmt_float(material.base_color[3])
        ));
    }
    if material.alpha_mode == AlphaMode::Mask {
        inputs.push(format!(
            "float inputs:opacityThreshold = {}",
            fmt_float(material.alpha_cutoff)
        ));
    }

    match &metallic_roughness {
        Some((slot, image, wrap)) => {
            let prim = prim_name(slot);
            inputs.push(format!(
                "float inputs:roughness.connect = <{path}/{prim}.outputs:g>"
            ));
            inputs.push(format!(
                "float inputs:metallic.connect = <{path}/{prim}.outputs:b>"
            ));
            samplers.push(Sampler {
                prim,
                slot,
                image: *image,
                wrap: *wrap,
                scale: Some([1.0, material.roughness, material.metallic, 1.0]),
                bias: None,
                outputs: vec!["g", "b"],
            });
        }
        None => {
            inputs.push(format!("float inputs:roughness = {}", fmt_float(material.roughness)));
            inputs.push(format!("float inputs:metallic = {}", fmt_float(material.metallic)));
        }
    }

    if let Some((slot, image, wrap)) = &normal {
        let prim = prim_name(slot);
        inputs.push(format!(
            "normal3f inputs:normal.connect = <{path}/{prim}.outputs:rgb>"
        ));
        samplers.push(Sampler {
            prim,
            slot,
            image: *image,
            wrap: *wrap,
            scale: Some([2.0, 2.0, 2.0, 1.0]),
            bias: Some([-1.0, -1.0, -1.0, 0.0]),
            outputs: vec!["rgb"],
        });
    }

    if let Some((slot, image, wrap)) = &occlusion {
        let prim = prim_name(slot);
        inputs.push(format!(
            "float inputs:occlusion.connect = <{path}/{prim}.outputs:r>"
        ));
        samplers.push(Sampler {
            prim,
            slot,
            image: *image,
            wrap: *wrap,
            scale: None,
            bias: None,
            outputs: vec!["r"],
        });
    }

    match &emissive {
        Some((slot, image, wrap)) => {
            let prim = prim_name(slot);
            inputs.push(format!(
                "color3f inputs:emissiveColor.connect = <{path}/{prim}.outputs:rgb>"
            ));
            let [r, g, b] = material.emissive;
            samplers.push(Sampler {
                prim,
                slot,
                image: *image,
                wrap: *wrap,
                scale: Some([r, g, b, 1.0]),
                bias: None,
                outputs: vec!["rgb"],
            });
        }
        None if material.emissive.iter().any(|c| *c > 0.0) => {
            inputs.push(format!(
                "color3f inputs:emissiveColor = {}",
                tuple(&material.emissive)
            ));
        }
        None => {}
    }

    w.blank();
    w.line(format!("def Material \"{name}\""));
    w.open();
    w.line("def Shader \"PreviewSurface\"");
    w.open();
    w.line("uniform token info:id = \"UsdPreviewSurface\"");
    for input in &inputs {
        w.line(input);
    }
    w.line("int inputs:useSpecularWorkflow = 0");
    w.line("token outputs:surface");
    w.close();
    w.blank();
    w.line(format!(
        "token outputs:surface.connect = <{path}/PreviewSurface.outputs:surface>"
    ));

    if !samplers.is_empty() {
        w.blank();
        w.line("def Shader \"uvReader_st\"");
        w.open();
        w.line("uniform token info:id = \"UsdPrimvarReader_float2\"");
        w.line("token inputs:varname = \"st\"");
        w.line("float2 inputs:fallback = (0, 0)");
        w.line("float2 outputs:result");
        w.close();
    }

    for sampler in &samplers {
        w.blank();
        w.line(format!("def Shader \"{}\"", sampler.prim));
        w.open();
        w.line("uniform token info:id = \"UsdUVTexture\"");
        w.line(format!("asset inputs:file = @{}@", texture_path(sampler.image)));
        w.line(format!(
            "float2 inputs:st.connect = <{path}/uvReader_st.outputs:result>"
        ));
        if let Some(scale) = sampler.scale {
            w.line(format!("float4 inputs:scale = {}", tuple(&scale)));
        }
        if let Some(bias) = sampler.bias {
            w.line(format!("float4 inputs:bias = {}", tuple(&bias)));
        }
        let color_space = if sampler.slot.role.is_color() { "sRGB" } else { "raw" };
        w.line(format!("token inputs:sourceColorSpace = \"{color_space}\""));
        w.line(format!("token inputs:wrapS = \"{}\"", wrap_token(sampler.wrap.0)));
        w.line(format!("token inputs:wrapT = \"{}\"", wrap_token(sampler.wrap.1)));
        for output in &sampler.outputs {
            w.line(format!("{} outputs:{output}", output_type(output)));
        }
        w.close();
    }

    w.close(); // Material
}

/// A geometry layer holding one mesh.
pub fn geometry_layer(geometry: &Geometry) -> String {
    let mut w = Usda::default();
    w.header("Geometry");

    w.line("def \"Geometry\"");
    w.open();
    w.line("def Mesh \"Geometry\"");
    w.open();

    w.line(format!(
        "int[] faceVertexCounts = {}",
        int_array(std::iter::repeat_n(3, geometry.triangle_count()))
    ));
    w.line(format!(
        "int[] faceVertexIndices = {}",
        int_array(geometry.indices.iter().copied())
    ));
    if let Some(normals) = &geometry.normals {
        w.line(format!("normal3f[] normals = {} (", tuple_array(normals)));
        w.line("    interpolation = \"vertex\"");
        w.line(")");
    }
    w.line(format!(
        "point3f[] points = {}",
        tuple_array(&geometry.positions)
    ));
    if let Some(uvs) = &geometry.uvs {
        let flipped: Vec<[f32; 2]> = uvs.iter().map(|[u, v]| [*u, 1.0 - v]).collect();
        w.line(format!(
            "texCoord2f[] primvars:st = {} (",
            tuple_array(&flipped)
        ));
        w.line("    interpolation = \"vertex\"");
        w.line(")");
    }
    if let Some(colors) = &geometry.colors {
        w.line(format!(
            "color3f[] primvars:displayColor = {} (",
            tuple_array(colors)
        ));
        w.line("    interpolation = \"vertex\"");
        w.line(")");
    }
    if let Some((min, max)) = geometry.extent() {
        w.line(format!("float3[] extent = [{}, {}]", tuple(&min), tuple(&max)));
    }
    w.line("uniform token subdivisionScheme = \"none\"");

    w.close();
    w.close();
    w.finish()
}
