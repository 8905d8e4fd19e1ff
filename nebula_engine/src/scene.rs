//! The scene data container and the per-frame render orchestrator: the
//! centerpiece that walks a scene graph, batches drawables, provisions the
//! resource manager's descriptor pools, and encodes (possibly several)
//! command buffers to draw a frame.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use crate::camera::Camera;
use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::error::{set_err, EngineError, EngineResult};
use crate::gpu::{BufferDesc, BufferUsage, CommandBuffer, Context, Pass};
use crate::light::{Light, LightKind};
use crate::material::{Material, PbrModel};
use crate::mesh::{Label, Mesh, Model, Particle, Quad, Terrain};
use crate::node::{NodeGraph, NodeKey, NodeObject};
use crate::resource_manager::{ResourceManager, Variant};

/// A root node, a camera, a clear color, and the viewport/scissor the
/// orchestrator derives from the render target each frame.
pub struct Scene {
    pub root: NodeKey,
    pub camera: Camera,
    pub clear_color: [f32; 4],
}

impl Scene {
    pub fn new(root: NodeKey) -> Self {
        Self {
            root,
            camera: Camera::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

fn align_up(size: u64, align: u64) -> u64 {
    if align == 0 {
        return size;
    }
    (size + align - 1) / align * align
}

const MAT4_SIZE: u64 = 64;
const GLOBAL_BLOCK_RAW: u64 = 4 * MAT4_SIZE + 32; // 4 matrices + padded 6-float viewport
const LIGHT_SLOT_SIZE: u64 = 64;
const MAX_LIGHTS: usize = 16;
const LIGHT_BLOCK_RAW: u64 = LIGHT_SLOT_SIZE * MAX_LIGHTS as u64;
const TERR_PART_INSTANCE_RAW: u64 = 2 * MAT4_SIZE;
const QUAD_LABEL_INSTANCE_RAW: u64 = 2 * MAT4_SIZE + 16;
const MATERIAL_RAW: u64 = 64;

fn model_instance_raw_size(joint_cap: u32) -> u64 {
    3 * MAT4_SIZE + 2 * joint_cap as u64 * MAT4_SIZE
}

/// Everything traversal collects for one frame before any GPU work happens.
struct FrameObjects {
    models: FxHashMap<(usize, usize), ModelBucket>,
    terrains: Vec<(NodeKey, Terrain)>,
    particles: Vec<(NodeKey, Particle)>,
    quads: Vec<(NodeKey, Quad)>,
    labels: Vec<(NodeKey, Label)>,
    lights: Vec<(NodeKey, Light)>,
}

struct ModelBucket {
    mesh: Arc<Mesh>,
    material: Option<Arc<Material>>,
    instances: Vec<NodeKey>,
}

impl FrameObjects {
    fn new() -> Self {
        Self {
            models: FxHashMap::default(),
            terrains: Vec::new(),
            particles: Vec::new(),
            quads: Vec::new(),
            labels: Vec::new(),
            lights: Vec::new(),
        }
    }
}

fn model_key(model: &Model) -> (usize, usize) {
    let mesh_key = Arc::as_ptr(&model.mesh) as *const () as usize;
    let mat_key = model
        .material
        .as_ref()
        .map(|m| Arc::as_ptr(m) as *const () as usize)
        .unwrap_or(0);
    (mesh_key, mat_key)
}

/// BFS-traverses `scene.root`, recomputing world transforms and sorting
/// every attached object into its bucket.
fn traverse_scene(graph: &mut NodeGraph, scene: &Scene) -> EngineResult<FrameObjects> {
    let mut objects = FrameObjects::new();

    graph.traverse(scene.root, |g, node| {
        match g.object(node).clone() {
            NodeObject::Model(model) => {
                let key = model_key(&model);
                objects
                    .models
                    .entry(key)
                    .or_insert_with(|| ModelBucket {
                        mesh: model.mesh.clone(),
                        material: model.material.clone(),
                        instances: Vec::new(),
                    })
                    .instances
                    .push(node);
            }
            NodeObject::Terrain(t) => objects.terrains.push((node, t)),
            NodeObject::Particle(p) => objects.particles.push((node, p)),
            NodeObject::Quad(q) => objects.quads.push((node, q)),
            NodeObject::Label(l) => objects.labels.push((node, l)),
            NodeObject::Light(light) => {
                if objects.lights.len() >= MAX_LIGHTS {
                    return Err(set_err(EngineError::Limit));
                }
                objects.lights.push((node, light));
            }
            NodeObject::Effect | NodeObject::None => {}
        }
        Ok(false)
    })?;

    Ok(objects)
}

/// Decomposes `n` model instances into the fewest model-variant allocations
/// by repeatedly taking the largest power-of-two bucket that still fits.
fn decompose_instances(mut n: u32) -> Vec<(Variant, u32)> {
    let mut out = Vec::new();
    for &variant in Variant::MODEL_VARIANTS_DESC.iter() {
        let per = variant.instances_per_alloc();
        let k = n / per;
        if k > 0 {
            out.push((variant, k));
            n -= k * per;
        }
    }
    out
}

/// Sums per-variant allocation demand across every model bucket, then asks
/// the resource manager for that many allocations of each non-empty model
/// variant plus exactly one each for terrain/particle/quad/label if those
/// buckets are non-empty. On failure, halves every non-zero count (never
/// below one) and retries.
fn prepare_resources(
    ctx: &dyn Context,
    resmgr: &mut ResourceManager,
    objects: &FrameObjects,
) -> EngineResult<()> {
    let mut demand: FxHashMap<Variant, u32> = FxHashMap::default();

    for bucket in objects.models.values() {
        for (variant, count) in decompose_instances(bucket.instances.len() as u32) {
            *demand.entry(variant).or_insert(0) += count;
        }
    }
    if !objects.terrains.is_empty() {
        demand.insert(Variant::Terrain, objects.terrains.len() as u32);
    }
    if !objects.particles.is_empty() {
        demand.insert(Variant::Particle, objects.particles.len() as u32);
    }
    if !objects.quads.is_empty() {
        demand.insert(Variant::Quad, objects.quads.len() as u32);
    }
    if !objects.labels.is_empty() {
        demand.insert(Variant::Label, objects.labels.len() as u32);
    }

    if demand.is_empty() {
        return Ok(());
    }

    loop {
        let mut failed = false;
        for (&variant, &count) in demand.iter() {
            if resmgr.set_alloc_count(ctx, variant, count).is_err() {
                failed = true;
                break;
            }
        }
        if !failed {
            return Ok(());
        }

        let mut reduced = false;
        for count in demand.values_mut() {
            if *count > 1 {
                *count /= 2;
                reduced = true;
            }
        }
        if !reduced {
            return Err(set_err(EngineError::NoMemory));
        }
    }
}

fn total_uniform_size(objects: &FrameObjects, limits_align: u64, joint_cap: u32) -> u64 {
    let mut size = align_up(GLOBAL_BLOCK_RAW, limits_align);
    size += align_up(LIGHT_BLOCK_RAW, limits_align);

    let model_inst = align_up(model_instance_raw_size(joint_cap), limits_align);
    let material = align_up(MATERIAL_RAW, limits_align);
    for bucket in objects.models.values() {
        size += bucket.instances.len() as u64 * (model_inst + material);
    }

    let terr_part = align_up(TERR_PART_INSTANCE_RAW, limits_align);
    size += (objects.terrains.len() + objects.particles.len()) as u64 * terr_part;

    let quad_label = align_up(QUAD_LABEL_INSTANCE_RAW, limits_align);
    size += (objects.quads.len() + objects.labels.len()) as u64 * quad_label;

    size
}

fn light_direction(graph: &NodeGraph, node: NodeKey) -> Vec3 {
    let world = graph.world_xform(node);
    world.transform_vector3(Vec3::NEG_Z).normalize_or_zero()
}

/// Bitmask of buckets with remaining work, used to drive the multi-pass loop.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Pending(u8);
impl Pending {
    const MDL: u8 = 1 << 0;
    const TERR: u8 = 1 << 1;
    const PART: u8 = 1 << 2;
    const QUAD: u8 = 1 << 3;
    const LABL: u8 = 1 << 4;

    fn none() -> Self {
        Pending(0)
    }
    fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
    fn clear(&mut self, bit: u8) {
        self.0 &= !bit;
    }
    fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Renders one frame of `scene` against `collection`'s node graph. Returns
/// the number of command buffers submitted (always at least 1 if the scene
/// has any drawables, possibly more under resource pressure).
pub fn render_scene(
    ctx: &dyn Context,
    pass: &dyn Pass,
    resmgr: &mut ResourceManager,
    collection: &mut Collection,
    scene: &Scene,
    config: &EngineConfig,
) -> EngineResult<u32> {
    let align = ctx.limits().uniform_align_min;
    let graph = collection.graph_mut();

    let mut objects = traverse_scene(graph, scene)?;

    prepare_resources(ctx, resmgr, &objects)?;

    let buf_size = total_uniform_size(&objects, align, config.joint_cap).max(align);
    let mut uniform = ctx.create_buffer(&BufferDesc {
        size: buf_size,
        usage: BufferUsage::Uniform,
    })?;

    let global_off = 0u64;
    let global_size = align_up(GLOBAL_BLOCK_RAW, align);
    let light_off = global_off + global_size;
    let light_size = align_up(LIGHT_BLOCK_RAW, align);
    let first_bucket_off = light_off + light_size;

    write_global_block(uniform.as_mut(), global_off, scene)?;
    write_light_block(graph, uniform.as_mut(), light_off, &objects.lights)?;

    let mut pending = Pending(0);
    if !objects.models.is_empty() {
        pending.0 |= Pending::MDL;
    }
    if !objects.terrains.is_empty() {
        pending.0 |= Pending::TERR;
    }
    if !objects.particles.is_empty() {
        pending.0 |= Pending::PART;
    }
    if !objects.quads.is_empty() {
        pending.0 |= Pending::QUAD;
    }
    if !objects.labels.is_empty() {
        pending.0 |= Pending::LABL;
    }

    if pending.is_empty() {
        return Ok(0);
    }

    let mut submitted = 0u32;
    // Passes are bounded by total instance count: every pass retires at
    // least one allocation somewhere, or the multi-pass loop would spin
    // forever on a pool that can never grow past one slot.
    let safety_limit = objects.models.values().map(|b| b.instances.len()).sum::<usize>()
        + objects.terrains.len()
        + objects.particles.len()
        + objects.quads.len()
        + objects.labels.len()
        + 1;

    for _ in 0..safety_limit {
        if pending.is_empty() {
            break;
        }

        let mut cmd = ctx.create_command_buffer()?;
        cmd.begin_pass(pass)?;
        cmd.bind_uniform(uniform.as_ref(), global_off, global_size)?;
        cmd.bind_uniform(uniform.as_ref(), light_off, light_size)?;

        let mut obtained: Vec<(Variant, u32)> = Vec::new();
        let mut offset = first_bucket_off;

        if pending.has(Pending::MDL) {
            let done = render_models(
                &*graph,
                scene.camera.view(),
                resmgr,
                &mut cmd,
                uniform.as_mut(),
                &mut offset,
                align,
                config.joint_cap,
                &mut objects,
                &mut obtained,
            )?;
            if done {
                pending.clear(Pending::MDL);
            }
        }
        if pending.has(Pending::TERR) {
            let done = render_simple_bucket(
                resmgr,
                &mut cmd,
                Variant::Terrain,
                &mut objects.terrains,
                &mut obtained,
                |node, _item, cmd, alloc| {
                    let _ = (node, alloc);
                    cmd.draw(0, 1)
                },
            )?;
            if done {
                pending.clear(Pending::TERR);
            }
        }
        if pending.has(Pending::PART) {
            let done = render_simple_bucket(
                resmgr,
                &mut cmd,
                Variant::Particle,
                &mut objects.particles,
                &mut obtained,
                |_node, item, cmd, _alloc| cmd.draw(0, item.count.max(1)),
            )?;
            if done {
                pending.clear(Pending::PART);
            }
        }
        if pending.has(Pending::QUAD) {
            let done = render_simple_bucket(
                resmgr,
                &mut cmd,
                Variant::Quad,
                &mut objects.quads,
                &mut obtained,
                |_node, _item, cmd, _alloc| cmd.draw(0, 1),
            )?;
            if done {
                pending.clear(Pending::QUAD);
            }
        }
        if pending.has(Pending::LABL) {
            let done = render_simple_bucket(
                resmgr,
                &mut cmd,
                Variant::Label,
                &mut objects.labels,
                &mut obtained,
                |_node, _item, cmd, _alloc| cmd.draw(0, 1),
            )?;
            if done {
                pending.clear(Pending::LABL);
            }
        }

        cmd.end_pass()?;
        ctx.submit(cmd)?;
        submitted += 1;

        for (variant, alloc) in obtained {
            resmgr.yield_alloc(variant, alloc);
        }
    }

    Ok(submitted)
}

fn write_global_block(
    uniform: &mut dyn crate::gpu::Buffer,
    offset: u64,
    scene: &Scene,
) -> EngineResult<()> {
    let view = scene.camera.view();
    let persp = scene.camera.perspective();
    let ortho = scene.camera.orthographic();
    let view_proj = persp * view;

    let mut data = Vec::with_capacity(4 * 64);
    for mat in [view, persp, ortho, view_proj] {
        data.extend_from_slice(bytemuck::cast_slice(&mat.to_cols_array()));
    }
    uniform.copy(offset, &data)
}

fn write_light_block(
    graph: &NodeGraph,
    uniform: &mut dyn crate::gpu::Buffer,
    offset: u64,
    lights: &[(NodeKey, Light)],
) -> EngineResult<()> {
    let mut data = vec![0u8; LIGHT_SLOT_SIZE as usize * MAX_LIGHTS];

    for (i, (node, light)) in lights.iter().enumerate() {
        let slot = &mut data[i * LIGHT_SLOT_SIZE as usize..(i + 1) * LIGHT_SLOT_SIZE as usize];
        let type_tag: f32 = match light.kind {
            LightKind::Point => 0.0,
            LightKind::Spot => 1.0,
            LightKind::Directional => 2.0,
        };
        let position = graph.world_xform(*node).transform_point3(Vec3::ZERO);
        let direction = light_direction(graph, *node);
        let (inner_scale, outer_offset) = spot_angular_terms(light);

        write_f32(slot, 0, type_tag);
        write_f32(slot, 4, light.intensity);
        write_f32(slot, 8, light.range);
        write_f32(slot, 12, 0.0);
        write_vec3(slot, 16, light.color);
        write_f32(slot, 28, inner_scale);
        write_vec3(slot, 32, position);
        write_f32(slot, 44, outer_offset);
        write_vec3(slot, 48, direction);
    }

    uniform.copy(offset, &data)
}

fn spot_angular_terms(light: &Light) -> (f32, f32) {
    if light.kind != LightKind::Spot {
        return (0.0, 0.0);
    }
    let cos_inner = light.inner_angle.cos();
    let cos_outer = light.outer_angle.cos();
    let scale = 1.0 / (cos_inner - cos_outer).max(1e-4);
    let offset = -cos_outer * scale;
    (scale, offset)
}

fn write_f32(slot: &mut [u8], at: usize, v: f32) {
    slot[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn write_vec3(slot: &mut [u8], at: usize, v: Vec3) {
    write_f32(slot, at, v.x);
    write_f32(slot, at + 4, v.y);
    write_f32(slot, at + 8, v.z);
}

#[allow(clippy::too_many_arguments)]
fn render_models(
    graph: &NodeGraph,
    view: Mat4,
    resmgr: &mut ResourceManager,
    cmd: &mut Box<dyn CommandBuffer>,
    uniform: &mut dyn crate::gpu::Buffer,
    offset: &mut u64,
    align: u64,
    joint_cap: u32,
    objects: &mut FrameObjects,
    obtained: &mut Vec<(Variant, u32)>,
) -> EngineResult<bool> {
    let model_inst_size = align_up(model_instance_raw_size(joint_cap), align);
    let material_size = align_up(MATERIAL_RAW, align);

    let mut done_keys = Vec::new();
    let mut all_done = true;

    for (&key, bucket) in objects.models.iter_mut() {
        loop {
            let remaining = bucket.instances.len() as u32;
            if remaining == 0 {
                break;
            }

            let mut obtained_this = None;
            for &variant in Variant::MODEL_VARIANTS_DESC.iter() {
                let per = variant.instances_per_alloc();
                if per > remaining {
                    continue;
                }
                if let Ok(alloc) = resmgr.obtain(variant) {
                    obtained_this = Some((variant, alloc, per));
                    break;
                }
            }

            let Some((variant, alloc, per)) = obtained_this else {
                // Nothing obtainable right now; leave this bucket for the
                // next pass rather than failing the frame.
                all_done = false;
                break;
            };

            let take = per.min(remaining) as usize;
            let batch: Vec<NodeKey> = bucket.instances.drain(0..take).collect();

            write_model_instances(graph, view, uniform, *offset, &batch, joint_cap)?;
            *offset += model_inst_size * take as u64;

            write_material(uniform, *offset, bucket.material.as_deref())?;
            *offset += material_size;

            bucket.mesh.draw(cmd.as_mut(), take as u32)?;
            obtained.push((variant, alloc));

            if bucket.instances.is_empty() {
                break;
            }
        }

        if bucket.instances.is_empty() {
            done_keys.push(key);
        }
    }

    for key in done_keys {
        objects.models.remove(&key);
    }

    Ok(all_done && objects.models.is_empty())
}

/// Writes one model-instance block (model, normal, model-view matrices plus
/// up to `joint_cap` joint-skinning matrix pairs, identity-padded beyond
/// the skin's own joint count) per node in `batch`.
fn write_model_instances(
    graph: &NodeGraph,
    view: Mat4,
    uniform: &mut dyn crate::gpu::Buffer,
    offset: u64,
    batch: &[NodeKey],
    joint_cap: u32,
) -> EngineResult<()> {
    let per_instance = model_instance_raw_size(joint_cap) as usize;
    let mut data = vec![0u8; per_instance * batch.len()];

    for (i, &node) in batch.iter().enumerate() {
        let model = graph.world_xform(node);
        let normal = graph.world_norm(node);
        let model_view = view * model;

        let base = i * per_instance;
        for (j, mat) in [model, normal, model_view].iter().enumerate() {
            let start = base + j * MAT4_SIZE as usize;
            data[start..start + MAT4_SIZE as usize]
                .copy_from_slice(bytemuck::cast_slice(&mat.to_cols_array()));
        }

        let joints_base = base + 3 * MAT4_SIZE as usize;
        if let NodeObject::Model(Model {
            skin: Some((skin, skeleton)),
            ..
        }) = graph.object(node)
        {
            let xforms = skeleton.joint_world_xforms(Some(graph));
            for (j, joint_world) in xforms.iter().take(joint_cap as usize).enumerate() {
                let inverse_bind = skin
                    .joints
                    .get(j)
                    .map(|jt| jt.inverse_bind)
                    .unwrap_or(Mat4::IDENTITY);
                let skin_mat = *joint_world * inverse_bind;
                let normal_skin_mat = skin_mat.inverse().transpose();

                let pair_size = 2 * MAT4_SIZE as usize;
                let start = joints_base + j * pair_size;
                data[start..start + MAT4_SIZE as usize]
                    .copy_from_slice(bytemuck::cast_slice(&skin_mat.to_cols_array()));
                data[start + MAT4_SIZE as usize..start + pair_size]
                    .copy_from_slice(bytemuck::cast_slice(&normal_skin_mat.to_cols_array()));
            }
        }
        // Joints beyond the skin's count (or an unskinned model) are left
        // zeroed; the vertex shader only reads a joint slot when the
        // corresponding skin weight is non-zero.
    }

    uniform.copy(offset, &data)
}

fn write_material(
    uniform: &mut dyn crate::gpu::Buffer,
    offset: u64,
    material: Option<&Material>,
) -> EngineResult<()> {
    let mut data = [0u8; MATERIAL_RAW as usize];
    if let Some(mat) = material {
        data[0] = match mat.pbr {
            PbrModel::SpecGloss(_) => 0,
            PbrModel::MetalRough(_) => 1,
            PbrModel::None => 2,
        };
        data[1] = mat.alpha_mode as u8;
        let mask = mat.texture_mask().to_le_bytes();
        data[4..8].copy_from_slice(&mask);
    }
    uniform.copy(offset, &data)
}

fn render_simple_bucket<T>(
    resmgr: &mut ResourceManager,
    cmd: &mut Box<dyn CommandBuffer>,
    variant: Variant,
    items: &mut Vec<(NodeKey, T)>,
    obtained: &mut Vec<(Variant, u32)>,
    mut draw: impl FnMut(NodeKey, &T, &mut dyn CommandBuffer, u32) -> EngineResult<()>,
) -> EngineResult<bool> {
    while let Some((node, item)) = items.first() {
        let alloc = match resmgr.obtain(variant) {
            Ok(a) => a,
            Err(_) => return Ok(false),
        };
        draw(*node, item, cmd.as_mut(), alloc)?;
        obtained.push((variant, alloc));
        items.remove(0);
    }
    Ok(true)
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
