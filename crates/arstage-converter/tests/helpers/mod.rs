//! Shared helpers for converter integration tests.

use std::io::Cursor;

use serde_json::json;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// A 2x2 opaque PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([30, 60, 90, 255]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode png");
    out
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

/// A GLB with one textured quad (two triangles) and its PNG embedded in the
/// binary chunk.
pub fn textured_quad_glb() -> Vec<u8> {
    let mut bin = Vec::new();
    let positions: [[f32; 3]; 4] = [
        [-0.5, 0.0, -0.5],
        [0.5, 0.0, -0.5],
        [0.5, 0.0, 0.5],
        [-0.5, 0.0, 0.5],
    ];
    for p in positions {
        for c in p {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    let normals_offset = bin.len();
    for _ in 0..4 {
        for c in [0.0f32, 1.0, 0.0] {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    let uvs_offset = bin.len();
    for uv in [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
        for c in uv {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    let indices_offset = bin.len();
    for i in [0u16, 2, 1, 0, 3, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    pad_to_four(&mut bin, 0);
    let png = png_bytes();
    let image_offset = bin.len();
    bin.extend_from_slice(&png);
    pad_to_four(&mut bin, 0);

    let document = json!({
        "asset": { "version": "2.0", "generator": "arstage-tests" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Quad", "mesh": 0, "translation": [0.0, 0.1, 0.0] }],
        "meshes": [{
            "name": "quad",
            "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                "indices": 3,
                "material": 0
            }]
        }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": {
                "baseColorTexture": { "index": 0 },
                "metallicFactor": 0.0,
                "roughnessFactor": 0.8
            },
            "doubleSided": true
        }],
        "textures": [{ "source": 0, "sampler": 0 }],
        "samplers": [{ "wrapS": 33071, "wrapT": 33071 }],
        "images": [{ "bufferView": 4, "mimeType": "image/png" }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
              "min": [-0.5, 0.0, -0.5], "max": [0.5, 0.0, 0.5] },
            { "bufferView": 1, "componentType": 5126, "count": 4, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5126, "count": 4, "type": "VEC2" },
            { "bufferView": 3, "componentType": 5123, "count": 6, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": normals_offset },
            { "buffer": 0, "byteOffset": normals_offset, "byteLength": uvs_offset - normals_offset },
            { "buffer": 0, "byteOffset": uvs_offset, "byteLength": indices_offset - uvs_offset },
            { "buffer": 0, "byteOffset": indices_offset, "byteLength": 12 },
            { "buffer": 0, "byteOffset": image_offset, "byteLength": png.len() }
        ],
        "buffers": [{ "byteLength": bin.len() }]
    });

    let mut json = serde_json::to_vec(&document).expect("serialize");
    pad_to_four(&mut json, b' ');

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);
    glb
}
