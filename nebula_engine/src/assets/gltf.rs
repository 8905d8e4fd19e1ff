//! A hand-written glTF 2.0 loader: JSON materialization into this engine's
//! texture/material/mesh/skin/node/scene/animation types, plus `.glb`
//! container unpacking. No external glTF or scene-description crate is
//! involved — only the [`json`](super::json) parser and the PNG decoder for
//! embedded images.
//!
//! Buffers are supplied already resolved to bytes (`buffers[i]` matches
//! `document.buffers[i]`); this loader does no filesystem or network I/O of
//! its own; external (`uri`-referenced) buffers and images are rejected as
//! [`EngineError::Unsupported`] since resolving them is a concern of the
//! caller's asset layer, not this decoder.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::animation::{Act, Interpolation, KeyframeAnimation, Output, Sampler};
use crate::assets::json::{self, Value};
use crate::assets::png;
use crate::camera::Camera;
use crate::collection::Collection;
use crate::error::{set_err, EngineError, EngineResult};
use crate::gpu::Context;
use crate::material::{AlphaMode, Material, MetallicRoughness, PbrModel, SpecularGlossiness, TextureRef};
use crate::mesh::{Mesh, Model, Primitive};
use crate::node::{NodeKey, Transform};
use crate::skin::{Joint, Skin};
use crate::texture::{Dim2, Filter, PixelFormat, Sampler as TexSampler, Texture, WrapMode};

const GLB_MAGIC: u32 = 0x46546c67; // "glTF"
const GLB_CHUNK_JSON: u32 = 0x4e4f534a; // "JSON"
const GLB_CHUNK_BIN: u32 = 0x004e4942; // "BIN\0"

/// What a successful load deposited into the collection, for the caller to
/// pick a scene/camera from.
pub struct LoadedDocument {
    pub scene_names: Vec<String>,
    pub default_scene: Option<String>,
    pub animation_names: Vec<String>,
    pub cameras: Vec<Camera>,
}

/// Splits a `.glb` container into its JSON chunk and optional binary chunk.
pub fn read_glb(bytes: &[u8]) -> EngineResult<(Vec<u8>, Option<Vec<u8>>)> {
    if bytes.len() < 12 {
        return Err(set_err(EngineError::InvalidFile));
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let length = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    if magic != GLB_MAGIC || length > bytes.len() {
        return Err(set_err(EngineError::InvalidFile));
    }

    let mut pos = 12usize;
    let mut json_chunk = None;
    let mut bin_chunk = None;

    while pos + 8 <= length {
        let chunk_len = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        let chunk_type = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap());
        let data_start = pos + 8;
        let data_end = data_start
            .checked_add(chunk_len)
            .ok_or_else(|| set_err(EngineError::InvalidFile))?;
        if data_end > bytes.len() {
            return Err(set_err(EngineError::InvalidFile));
        }
        let data = bytes[data_start..data_end].to_vec();

        match chunk_type {
            GLB_CHUNK_JSON => json_chunk = Some(data),
            GLB_CHUNK_BIN => bin_chunk = Some(data),
            _ => {}
        }
        pos = data_end;
    }

    let json_chunk = json_chunk.ok_or_else(|| set_err(EngineError::InvalidFile))?;
    Ok((json_chunk, bin_chunk))
}

/// Loads a `.glb` container directly.
pub fn load_glb(
    ctx: &dyn Context,
    collection: &mut Collection,
    glb_bytes: &[u8],
) -> EngineResult<LoadedDocument> {
    let (json_bytes, bin_chunk) = read_glb(glb_bytes)?;
    let buffers: Vec<Vec<u8>> = bin_chunk.into_iter().collect();
    load(ctx, collection, &json_bytes, &buffers)
}

// --- small JSON-navigation helpers --------------------------------------

fn arr<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key).and_then(Value::as_array).unwrap_or(&[])
}

fn num(v: &Value, key: &str, default: f64) -> f64 {
    v.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn index_of(v: &Value, key: &str) -> Option<usize> {
    v.get(key).and_then(Value::as_usize)
}

fn str_of<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str)
}

fn vec3_of(v: &Value, key: &str, default: Vec3) -> Vec3 {
    match v.get(key).and_then(Value::as_array) {
        Some(items) if items.len() >= 3 => {
            Vec3::new(items[0].as_f64().unwrap_or(0.0) as f32, items[1].as_f64().unwrap_or(0.0) as f32, items[2].as_f64().unwrap_or(0.0) as f32)
        }
        _ => default,
    }
}

fn vec4_of(v: &Value, key: &str, default: Vec4) -> Vec4 {
    match v.get(key).and_then(Value::as_array) {
        Some(items) if items.len() >= 4 => Vec4::new(
            items[0].as_f64().unwrap_or(0.0) as f32,
            items[1].as_f64().unwrap_or(0.0) as f32,
            items[2].as_f64().unwrap_or(0.0) as f32,
            items[3].as_f64().unwrap_or(0.0) as f32,
        ),
        _ => default,
    }
}

// --- accessor decoding ----------------------------------------------------

fn component_count(type_str: &str) -> EngineResult<usize> {
    Ok(match type_str {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" => 4,
        "MAT2" => 4,
        "MAT3" => 9,
        "MAT4" => 16,
        _ => return Err(set_err(EngineError::InvalidFile)),
    })
}

fn component_size(component_type: u64) -> EngineResult<usize> {
    Ok(match component_type {
        5120 | 5121 => 1, // BYTE / UNSIGNED_BYTE
        5122 | 5123 => 2, // SHORT / UNSIGNED_SHORT
        5125 | 5126 => 4, // UNSIGNED_INT / FLOAT
        _ => return Err(set_err(EngineError::InvalidFile)),
    })
}

fn decode_component(bytes: &[u8], component_type: u64, normalized: bool) -> f64 {
    match component_type {
        5120 => {
            let v = bytes[0] as i8 as f64;
            if normalized { (v / 127.0).max(-1.0) } else { v }
        }
        5121 => {
            let v = bytes[0] as f64;
            if normalized { v / 255.0 } else { v }
        }
        5122 => {
            let v = i16::from_le_bytes([bytes[0], bytes[1]]) as f64;
            if normalized { (v / 32767.0).max(-1.0) } else { v }
        }
        5123 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]) as f64;
            if normalized { v / 65535.0 } else { v }
        }
        5125 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        5126 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        _ => 0.0,
    }
}

/// Reads one accessor's values flattened row-major (`count * components`
/// entries), honoring `bufferView.byteStride` for interleaved attributes
/// and accessor-level normalization.
fn read_accessor(doc: &Value, buffers: &[Vec<u8>], idx: usize) -> EngineResult<Vec<f64>> {
    let accessor = arr(doc, "accessors")
        .get(idx)
        .ok_or_else(|| set_err(EngineError::NotFound))?;

    if accessor.get("sparse").is_some() {
        return Err(set_err(EngineError::Unsupported));
    }

    let component_type = accessor
        .get("componentType")
        .and_then(Value::as_u64)
        .ok_or_else(|| set_err(EngineError::InvalidFile))?;
    let count = accessor
        .get("count")
        .and_then(Value::as_usize)
        .ok_or_else(|| set_err(EngineError::InvalidFile))?;
    let type_str = str_of(accessor, "type").ok_or_else(|| set_err(EngineError::InvalidFile))?;
    let components = component_count(type_str)?;
    let normalized = accessor.get("normalized").and_then(Value::as_bool).unwrap_or(false);
    let accessor_offset = index_of(accessor, "byteOffset").unwrap_or(0);

    let Some(bv_idx) = index_of(accessor, "bufferView") else {
        return Ok(vec![0.0; count * components]);
    };
    let buffer_view = arr(doc, "bufferViews")
        .get(bv_idx)
        .ok_or_else(|| set_err(EngineError::NotFound))?;
    let buffer_idx = index_of(buffer_view, "buffer").ok_or_else(|| set_err(EngineError::InvalidFile))?;
    let bv_offset = index_of(buffer_view, "byteOffset").unwrap_or(0);
    let comp_size = component_size(component_type)?;
    let default_stride = comp_size * components;
    let stride = index_of(buffer_view, "byteStride").unwrap_or(default_stride);

    let buffer = buffers
        .get(buffer_idx)
        .ok_or_else(|| set_err(EngineError::Unsupported))?;

    let mut out = Vec::with_capacity(count * components);
    for i in 0..count {
        let base = bv_offset + accessor_offset + i * stride;
        for c in 0..components {
            let start = base + c * comp_size;
            let end = start + comp_size;
            if end > buffer.len() {
                return Err(set_err(EngineError::InvalidFile));
            }
            out.push(decode_component(&buffer[start..end], component_type, normalized));
        }
    }
    Ok(out)
}

fn read_vec3_list(doc: &Value, buffers: &[Vec<u8>], idx: usize) -> EngineResult<Vec<Vec3>> {
    let flat = read_accessor(doc, buffers, idx)?;
    Ok(flat
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
        .collect())
}

fn read_quat_list(doc: &Value, buffers: &[Vec<u8>], idx: usize) -> EngineResult<Vec<Quat>> {
    let flat = read_accessor(doc, buffers, idx)?;
    Ok(flat
        .chunks_exact(4)
        .map(|c| Quat::from_xyzw(c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32))
        .collect())
}

fn read_mat4_list(doc: &Value, buffers: &[Vec<u8>], idx: usize) -> EngineResult<Vec<Mat4>> {
    let flat = read_accessor(doc, buffers, idx)?;
    Ok(flat
        .chunks_exact(16)
        .map(|c| Mat4::from_cols_array(&std::array::from_fn(|i| c[i] as f32)))
        .collect())
}

// --- node hierarchy (pre-pass, before materializing into the graph) -----

struct RawNode {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    children: Vec<usize>,
    mesh: Option<usize>,
    skin: Option<usize>,
    name: Option<String>,
}

fn node_local_xform(node: &Value) -> (Vec3, Quat, Vec3) {
    if let Some(m) = node.get("matrix").and_then(Value::as_array) {
        if m.len() == 16 {
            let cols: [f32; 16] = std::array::from_fn(|i| m[i].as_f64().unwrap_or(0.0) as f32);
            let (scale, rotation, translation) = Mat4::from_cols_array(&cols).to_scale_rotation_translation();
            return (translation, rotation, scale);
        }
    }
    let t = vec3_of(node, "translation", Vec3::ZERO);
    let r = node
        .get("rotation")
        .and_then(Value::as_array)
        .filter(|a| a.len() == 4)
        .map(|a| Quat::from_xyzw(a[0].as_f64().unwrap_or(0.0) as f32, a[1].as_f64().unwrap_or(0.0) as f32, a[2].as_f64().unwrap_or(0.0) as f32, a[3].as_f64().unwrap_or(1.0) as f32))
        .unwrap_or(Quat::IDENTITY);
    let s = vec3_of(node, "scale", Vec3::ONE);
    (t, r, s)
}

fn parse_nodes(doc: &Value) -> Vec<RawNode> {
    arr(doc, "nodes")
        .iter()
        .map(|n| {
            let (translation, rotation, scale) = node_local_xform(n);
            RawNode {
                translation,
                rotation,
                scale,
                children: arr(n, "children").iter().filter_map(Value::as_usize).collect(),
                mesh: index_of(n, "mesh"),
                skin: index_of(n, "skin"),
                name: str_of(n, "name").map(str::to_owned),
            }
        })
        .collect()
}

fn parent_map(nodes: &[RawNode]) -> Vec<Option<usize>> {
    let mut parents = vec![None; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for &child in &node.children {
            if child < parents.len() {
                parents[child] = Some(i);
            }
        }
    }
    parents
}

// --- textures / materials ------------------------------------------------

fn gltf_wrap_mode(code: Option<f64>) -> WrapMode {
    match code.map(|c| c as u32) {
        Some(33071) => WrapMode::Clamp,
        Some(33648) => WrapMode::Mirror,
        _ => WrapMode::Repeat, // 10497 (REPEAT) is also glTF's own default.
    }
}

fn gltf_mag_filter(code: Option<f64>) -> Filter {
    match code.map(|c| c as u32) {
        Some(9728) => Filter::Nearest,
        _ => Filter::Linear,
    }
}

/// glTF folds mipmap behaviour into `minFilter`'s six-way enum; returns
/// (min filter, mip filter).
fn gltf_min_filter(code: Option<f64>) -> (Filter, Filter) {
    match code.map(|c| c as u32) {
        Some(9728) => (Filter::Nearest, Filter::Nearest), // NEAREST
        Some(9984) => (Filter::Nearest, Filter::Nearest), // NEAREST_MIPMAP_NEAREST
        Some(9985) => (Filter::Linear, Filter::Nearest),  // LINEAR_MIPMAP_NEAREST
        Some(9986) => (Filter::Nearest, Filter::Linear),  // NEAREST_MIPMAP_LINEAR
        Some(9987) => (Filter::Linear, Filter::Linear),   // LINEAR_MIPMAP_LINEAR
        _ => (Filter::Linear, Filter::Linear),            // 9729 (LINEAR) and glTF's default.
    }
}

fn gltf_sampler(v: &Value) -> TexSampler {
    let field = |key: &str| v.get(key).and_then(Value::as_f64);
    let (min_filter, mip_filter) = gltf_min_filter(field("minFilter"));
    TexSampler {
        wrap_u: gltf_wrap_mode(field("wrapS")),
        wrap_v: gltf_wrap_mode(field("wrapT")),
        wrap_w: WrapMode::Repeat, // glTF samplers have no wrapR; 2D-only.
        mag_filter: gltf_mag_filter(field("magFilter")),
        min_filter,
        mip_filter,
    }
}

fn load_textures(ctx: &dyn Context, doc: &Value, buffers: &[Vec<u8>]) -> EngineResult<Vec<Arc<Texture>>> {
    let images_raw = arr(doc, "images");
    let gltf_samplers = arr(doc, "samplers");
    let mut decoded: Vec<Option<(PixelFormat, Dim2, Vec<u8>)>> = vec![None; images_raw.len()];

    arr(doc, "textures")
        .iter()
        .map(|t| {
            let image_idx = index_of(t, "source").ok_or_else(|| set_err(EngineError::InvalidFile))?;
            if decoded.get(image_idx).map(|d| d.is_none()).unwrap_or(true) {
                let image = images_raw.get(image_idx).ok_or_else(|| set_err(EngineError::NotFound))?;
                let bv_idx = index_of(image, "bufferView").ok_or_else(|| set_err(EngineError::Unsupported))?;
                let bv = arr(doc, "bufferViews").get(bv_idx).ok_or_else(|| set_err(EngineError::NotFound))?;
                let buffer_idx = index_of(bv, "buffer").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let offset = index_of(bv, "byteOffset").unwrap_or(0);
                let length = index_of(bv, "byteLength").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let buffer = buffers.get(buffer_idx).ok_or_else(|| set_err(EngineError::Unsupported))?;
                let end = offset.checked_add(length).ok_or_else(|| set_err(EngineError::InvalidFile))?;
                if end > buffer.len() {
                    return Err(set_err(EngineError::InvalidFile));
                }
                let decoded_png = png::decode(&buffer[offset..end])?;
                decoded[image_idx] = Some(decoded_png);
            }
            let (pixfmt, dim, pixels) = decoded[image_idx].clone().unwrap();
            let sampler = index_of(t, "sampler")
                .and_then(|i| gltf_samplers.get(i))
                .map(gltf_sampler)
                .unwrap_or_default();
            Ok(Arc::new(Texture::with_sampler(ctx, pixfmt, dim, &pixels, sampler)?))
        })
        .collect()
}

fn texture_ref(v: &Value, key: &str, textures: &[Arc<Texture>]) -> EngineResult<Option<TextureRef>> {
    let Some(info) = v.get(key) else { return Ok(None) };
    let idx = index_of(info, "index").ok_or_else(|| set_err(EngineError::InvalidFile))?;
    let texture = textures.get(idx).ok_or_else(|| set_err(EngineError::NotFound))?;
    let uv_set = index_of(info, "texCoord").unwrap_or(0) as u32;
    Ok(Some(TextureRef { texture: texture.clone(), uv_set }))
}

fn load_materials(doc: &Value, textures: &[Arc<Texture>]) -> EngineResult<Vec<Arc<Material>>> {
    arr(doc, "materials")
        .iter()
        .map(|m| {
            // KHR_materials_pbrSpecularGlossiness, where present, supersedes
            // the core metallic-roughness model per the extension's spec.
            let spec_gloss_ext = m
                .get("extensions")
                .and_then(|e| e.get("KHR_materials_pbrSpecularGlossiness"));

            let pbr = if let Some(sg) = spec_gloss_ext {
                PbrModel::SpecGloss(SpecularGlossiness {
                    diffuse_factor: vec4_of(sg, "diffuseFactor", Vec4::ONE),
                    specular_factor: {
                        let v = vec3_of(sg, "specularFactor", Vec3::ONE);
                        [v.x, v.y, v.z]
                    },
                    glossiness_factor: num(sg, "glossinessFactor", 1.0) as f32,
                    diffuse: texture_ref(sg, "diffuseTexture", textures)?,
                    spec_gloss: texture_ref(sg, "specularGlossinessTexture", textures)?,
                })
            } else if let Some(mr) = m.get("pbrMetallicRoughness") {
                PbrModel::MetalRough(MetallicRoughness {
                    base_color_factor: vec4_of(mr, "baseColorFactor", Vec4::ONE),
                    metallic_factor: num(mr, "metallicFactor", 1.0) as f32,
                    roughness_factor: num(mr, "roughnessFactor", 1.0) as f32,
                    base_color: texture_ref(mr, "baseColorTexture", textures)?,
                    metal_rough: texture_ref(mr, "metallicRoughnessTexture", textures)?,
                })
            } else {
                PbrModel::None
            };

            let alpha_mode = match str_of(m, "alphaMode").unwrap_or("OPAQUE") {
                "BLEND" => AlphaMode::Blend,
                "MASK" => AlphaMode::Mask,
                _ => AlphaMode::Opaque,
            };

            Ok(Arc::new(Material {
                pbr,
                normal: texture_ref(m, "normalTexture", textures)?,
                normal_scale: m.get("normalTexture").map(|t| num(t, "scale", 1.0) as f32).unwrap_or(1.0),
                occlusion: texture_ref(m, "occlusionTexture", textures)?,
                occlusion_strength: m.get("occlusionTexture").map(|t| num(t, "strength", 1.0) as f32).unwrap_or(1.0),
                emissive: texture_ref(m, "emissiveTexture", textures)?,
                emissive_factor: {
                    let v = vec3_of(m, "emissiveFactor", Vec3::ZERO);
                    [v.x, v.y, v.z]
                },
                alpha_mode,
                alpha_cutoff: num(m, "alphaCutoff", 0.5) as f32,
                double_sided: m.get("doubleSided").and_then(Value::as_bool).unwrap_or(false),
            }))
        })
        .collect()
}

// --- meshes ----------------------------------------------------------------

/// Fixed interleaved layout every mesh primitive is packed to: position
/// (3f), normal (3f), texcoord0 (2f) — 32 bytes per vertex. Attributes this
/// engine doesn't consume directly (joints/weights) are not part of the
/// vertex stream; skinning is applied per-instance via the joint-matrix
/// array the orchestrator uploads, not per-vertex blending in the loader.
fn load_meshes(ctx: &dyn Context, doc: &Value, buffers: &[Vec<u8>]) -> EngineResult<Vec<(Arc<Mesh>, Vec<Option<usize>>)>> {
    arr(doc, "meshes")
        .iter()
        .map(|mesh_val| {
            let prims = arr(mesh_val, "primitives");
            let mut vertex_data = Vec::new();
            let mut index_data = Vec::new();
            let mut primitives = Vec::with_capacity(prims.len());
            let mut materials = Vec::with_capacity(prims.len());

            for prim in prims {
                let attrs = prim.get("attributes").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let pos_idx = index_of(attrs, "POSITION").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let positions = read_vec3_list(doc, buffers, pos_idx)?;

                let normals = match index_of(attrs, "NORMAL") {
                    Some(i) => read_vec3_list(doc, buffers, i)?,
                    None => vec![Vec3::Z; positions.len()],
                };
                let uvs: Vec<[f32; 2]> = match index_of(attrs, "TEXCOORD_0") {
                    Some(i) => {
                        let flat = read_accessor(doc, buffers, i)?;
                        flat.chunks_exact(2).map(|c| [c[0] as f32, c[1] as f32]).collect()
                    }
                    None => vec![[0.0, 0.0]; positions.len()],
                };

                let vertex_offset = vertex_data.len() as u64;
                for i in 0..positions.len() {
                    vertex_data.extend_from_slice(bytemuck::bytes_of(&positions[i]));
                    vertex_data.extend_from_slice(bytemuck::bytes_of(&normals[i]));
                    vertex_data.extend_from_slice(bytemuck::bytes_of(&uvs[i]));
                }

                // Index values are relative to this primitive's own vertex
                // range: `Mesh::draw` binds the vertex buffer at
                // `vertex_offset` before issuing the indexed draw, so indices
                // stay zero-based here rather than carrying a running base.
                let indices_idx = index_of(prim, "indices").ok_or_else(|| set_err(EngineError::Unsupported))?;
                let raw_indices = read_accessor(doc, buffers, indices_idx)?;

                let index_offset = index_data.len() as u64;
                let use_u16 = positions.len() <= u16::MAX as usize;
                if use_u16 {
                    for v in &raw_indices {
                        index_data.extend_from_slice(&(*v as u16).to_le_bytes());
                    }
                } else {
                    for v in &raw_indices {
                        index_data.extend_from_slice(&(*v as u32).to_le_bytes());
                    }
                }

                primitives.push(Primitive {
                    vertex_offset,
                    index_offset,
                    index_count: raw_indices.len() as u32,
                    index_stride: if use_u16 { 2 } else { 4 },
                });
                materials.push(index_of(prim, "material"));
            }

            let mesh = Mesh::upload(ctx, &vertex_data, &index_data, primitives)?;
            Ok((Arc::new(mesh), materials))
        })
        .collect()
}

// --- skins -----------------------------------------------------------------

fn load_skins(
    doc: &Value,
    buffers: &[Vec<u8>],
    nodes: &[RawNode],
    parents: &[Option<usize>],
) -> EngineResult<Vec<Arc<Skin>>> {
    arr(doc, "skins")
        .iter()
        .map(|skin_val| {
            let joint_nodes: Vec<usize> = arr(skin_val, "joints").iter().filter_map(Value::as_usize).collect();
            let inverse_binds = match index_of(skin_val, "inverseBindMatrices") {
                Some(i) => read_mat4_list(doc, buffers, i)?,
                None => vec![Mat4::IDENTITY; joint_nodes.len()],
            };

            let joints = joint_nodes
                .iter()
                .enumerate()
                .map(|(local_i, &node_idx)| {
                    let raw = &nodes[node_idx];
                    let parent_index = parents[node_idx].and_then(|p| joint_nodes.iter().position(|&j| j == p));
                    Joint {
                        local: Transform { translation: raw.translation, rotation: raw.rotation, scale: raw.scale },
                        inverse_bind: inverse_binds.get(local_i).copied().unwrap_or(Mat4::IDENTITY),
                        parent_index,
                        name: raw.name.clone(),
                    }
                })
                .collect();

            Ok(Arc::new(Skin::new(joints)))
        })
        .collect()
}

// --- animations --------------------------------------------------------

fn load_animations(
    doc: &Value,
    buffers: &[Vec<u8>],
    node_keys: &[Option<NodeKey>],
) -> EngineResult<Vec<KeyframeAnimation>> {
    arr(doc, "animations")
        .iter()
        .map(|anim| {
            let gltf_samplers = arr(anim, "samplers");
            let mut samplers = Vec::new();
            let mut acts = Vec::new();

            for channel in arr(anim, "channels") {
                let target = channel.get("target").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let path = str_of(target, "path").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                if path == "weights" {
                    return Err(set_err(EngineError::Unsupported));
                }

                let sampler_idx = index_of(channel, "sampler").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let gltf_sampler = gltf_samplers.get(sampler_idx).ok_or_else(|| set_err(EngineError::NotFound))?;

                let interp = match str_of(gltf_sampler, "interpolation").unwrap_or("LINEAR") {
                    "STEP" => Interpolation::Step,
                    "LINEAR" => Interpolation::Linear,
                    "CUBICSPLINE" => return Err(set_err(EngineError::Unsupported)),
                    _ => return Err(set_err(EngineError::Unsupported)),
                };

                let input_idx = index_of(gltf_sampler, "input").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let output_idx = index_of(gltf_sampler, "output").ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let input: Vec<f32> = read_accessor(doc, buffers, input_idx)?.into_iter().map(|v| v as f32).collect();

                let output = match path {
                    "translation" => Output::Translation(read_vec3_list(doc, buffers, output_idx)?),
                    "scale" => Output::Scale(read_vec3_list(doc, buffers, output_idx)?),
                    "rotation" => Output::Rotation(read_quat_list(doc, buffers, output_idx)?),
                    _ => return Err(set_err(EngineError::Unsupported)),
                };

                let act_sampler = samplers.len();
                samplers.push(Sampler { input, output, interpolation: interp });

                let target_node = index_of(target, "node").and_then(|n| node_keys.get(n).copied().flatten());
                acts.push(Act { sampler: act_sampler, target: target_node });
            }

            Ok(KeyframeAnimation::new(samplers, acts))
        })
        .collect()
}

// --- cameras -----------------------------------------------------------

fn load_cameras(doc: &Value) -> Vec<Camera> {
    arr(doc, "cameras")
        .iter()
        .map(|cam| {
            let mut camera = Camera::default();
            match str_of(cam, "type").unwrap_or("perspective") {
                "orthographic" => {
                    if let Some(ortho) = cam.get("orthographic") {
                        camera.ortho_extent = num(ortho, "ymag", camera.ortho_extent as f64) as f32;
                        camera.near = num(ortho, "znear", camera.near as f64) as f32;
                        camera.far = num(ortho, "zfar", camera.far as f64) as f32;
                    }
                }
                _ => {
                    if let Some(persp) = cam.get("perspective") {
                        camera.fovy_radians = num(persp, "yfov", camera.fovy_radians as f64) as f32;
                        camera.aspect = num(persp, "aspectRatio", camera.aspect as f64) as f32;
                        camera.near = num(persp, "znear", camera.near as f64) as f32;
                        camera.far = num(persp, "zfar", camera.far as f64) as f32;
                    }
                }
            }
            camera
        })
        .collect()
}

// --- top-level materialization -------------------------------------------

/// Materializes a complete document: textures, skins, materials, meshes,
/// nodes, scenes, then animations — in that order, since animations bind
/// to node keys that must already exist.
pub fn load(
    ctx: &dyn Context,
    collection: &mut Collection,
    json_bytes: &[u8],
    buffers: &[Vec<u8>],
) -> EngineResult<LoadedDocument> {
    let doc = json::parse(json_bytes)?;

    let raw_nodes = parse_nodes(&doc);
    let parents = parent_map(&raw_nodes);

    let textures = load_textures(ctx, &doc, buffers)?;
    let skins = load_skins(&doc, buffers, &raw_nodes, &parents)?;
    let materials = load_materials(&doc, &textures)?;
    let meshes = load_meshes(ctx, &doc, buffers)?;

    // Pass 1: allocate a graph node for every glTF node.
    let mut node_keys: Vec<Option<NodeKey>> = Vec::with_capacity(raw_nodes.len());
    for raw in &raw_nodes {
        let key = collection.graph_mut().init();
        collection.graph_mut().set_local_xform(
            key,
            Transform { translation: raw.translation, rotation: raw.rotation, scale: raw.scale },
        );
        node_keys.push(Some(key));
    }

    // Pass 2: wire parent/child edges and attach drawables.
    for (i, raw) in raw_nodes.iter().enumerate() {
        let key = node_keys[i].unwrap();
        for &child_idx in &raw.children {
            if let Some(child_key) = node_keys.get(child_idx).copied().flatten() {
                collection.graph_mut().insert(key, child_key);
            }
        }

        if let Some(mesh_idx) = raw.mesh {
            let (mesh, prim_materials) = meshes
                .get(mesh_idx)
                .ok_or_else(|| set_err(EngineError::NotFound))?;
            let material = prim_materials
                .first()
                .copied()
                .flatten()
                .and_then(|mi| materials.get(mi))
                .cloned();

            let skin = match raw.skin {
                Some(skin_idx) => {
                    let skin = skins.get(skin_idx).ok_or_else(|| set_err(EngineError::NotFound))?.clone();
                    let skeleton = Arc::new(skin.make_skeleton(None)?);
                    Some((skin, skeleton))
                }
                None => None,
            };

            collection.graph_mut().set_object(
                key,
                crate::node::NodeObject::Model(Model { mesh: mesh.clone(), material, skin }),
            );
        }
    }

    // Pass 3: scenes, each rooted at a synthetic node parenting its root list.
    let mut scene_names = Vec::new();
    for scene_val in arr(&doc, "scenes") {
        let root = collection.graph_mut().init();
        let root_indices: Vec<usize> = arr(scene_val, "nodes").iter().filter_map(Value::as_usize).collect();
        for node_idx in root_indices {
            if let Some(child_key) = node_keys.get(node_idx).copied().flatten() {
                collection.graph_mut().insert(root, child_key);
            }
        }
        let scene = crate::scene::Scene::new(root);
        let name = collection.manage_scene(str_of(scene_val, "name"), scene)?;
        scene_names.push(name);
    }

    let default_scene = index_of(&doc, "scene").and_then(|i| scene_names.get(i).cloned());

    // Pass 4: animations, last since they target already-materialized nodes.
    let animations = load_animations(&doc, buffers, &node_keys)?;
    let mut animation_names = Vec::with_capacity(animations.len());
    for (i, anim) in animations.into_iter().enumerate() {
        let name = arr(&doc, "animations").get(i).and_then(|a| str_of(a, "name"));
        animation_names.push(collection.manage_kfanim(name, Arc::new(anim))?);
    }

    let cameras = load_cameras(&doc);

    Ok(LoadedDocument { scene_names, default_scene, animation_names, cameras })
}

#[cfg(test)]
#[path = "gltf_tests.rs"]
mod tests;
