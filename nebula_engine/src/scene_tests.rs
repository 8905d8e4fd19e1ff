use super::*;
use crate::collection::Collection;
use crate::gpu::mock::MockContext;
use crate::mesh::Primitive;
use crate::node::NodeObject;
use crate::texture::{Dim2, PixelFormat, Texture};

struct NoopPass;
impl Pass for NoopPass {}

/// A one-triangle mesh good enough to exercise draw batching; its vertex
/// data is never inspected by the mock backend.
fn tiny_mesh(ctx: &MockContext) -> Arc<Mesh> {
    let primitive = Primitive {
        vertex_offset: 0,
        index_offset: 0,
        index_count: 3,
        index_stride: 2,
    };
    Arc::new(Mesh::upload(ctx, &[0u8; 36], &[0u8; 6], vec![primitive]).unwrap())
}

#[test]
fn single_quad_renders_in_one_pass() {
    let ctx = MockContext::new();
    let pass = NoopPass;
    let mut resmgr = ResourceManager::new();
    let mut collection = Collection::new();
    let config = EngineConfig::default();

    let root = collection.graph_mut().init();
    let quad_node = collection.graph_mut().init();
    collection.graph_mut().insert(root, quad_node);

    let texture = Texture::new(&ctx, PixelFormat::Rgba8Unorm, Dim2 { width: 2, height: 2 }, &[0u8; 16]).unwrap();
    collection.graph_mut().set_object(
        quad_node,
        NodeObject::Quad(Quad {
            texture: Arc::new(texture),
            dim: Dim2 { width: 2, height: 2 },
        }),
    );

    let scene = Scene::new(root);
    let submitted = render_scene(&ctx, &pass, &mut resmgr, &mut collection, &scene, &config).unwrap();

    assert_eq!(submitted, 1);
    assert!(resmgr.capacity(Variant::Quad) >= 1);
}

#[test]
fn empty_scene_submits_nothing() {
    let ctx = MockContext::new();
    let pass = NoopPass;
    let mut resmgr = ResourceManager::new();
    let mut collection = Collection::new();
    let config = EngineConfig::default();

    let root = collection.graph_mut().init();
    let scene = Scene::new(root);

    let submitted = render_scene(&ctx, &pass, &mut resmgr, &mut collection, &scene, &config).unwrap();
    assert_eq!(submitted, 0);
}

#[test]
fn decompose_instances_uses_largest_buckets_first() {
    let decomposed = decompose_instances(67);
    assert_eq!(decomposed[0], (Variant::Mdl64, 1));
    let sum: u32 = decomposed
        .iter()
        .map(|(v, c)| v.instances_per_alloc() * c)
        .sum();
    assert_eq!(sum, 67);
}

#[test]
fn many_quads_trigger_multi_pass_fallback() {
    // Pool capacity is forced down to a single slot so every quad after the
    // first must wait for a subsequent pass.
    let ctx = MockContext::with_max_pool_capacity(1);
    let pass = NoopPass;
    let mut resmgr = ResourceManager::new();
    let mut collection = Collection::new();
    let config = EngineConfig::default();

    let root = collection.graph_mut().init();
    for _ in 0..3 {
        let node = collection.graph_mut().init();
        collection.graph_mut().insert(root, node);
        let texture = Texture::new(&ctx, PixelFormat::Rgba8Unorm, Dim2 { width: 1, height: 1 }, &[0u8; 4]).unwrap();
        collection.graph_mut().set_object(
            node,
            NodeObject::Quad(Quad {
                texture: Arc::new(texture),
                dim: Dim2 { width: 1, height: 1 },
            }),
        );
    }

    let scene = Scene::new(root);
    let submitted = render_scene(&ctx, &pass, &mut resmgr, &mut collection, &scene, &config).unwrap();
    assert_eq!(submitted, 3, "one quad drains per pass when the pool holds one slot");
}

#[test]
fn too_many_lights_is_an_error() {
    let ctx = MockContext::new();
    let pass = NoopPass;
    let mut resmgr = ResourceManager::new();
    let mut collection = Collection::new();
    let config = EngineConfig::default();

    let root = collection.graph_mut().init();
    for _ in 0..(MAX_LIGHTS + 1) {
        let node = collection.graph_mut().init();
        collection.graph_mut().insert(root, node);
        collection
            .graph_mut()
            .set_object(node, NodeObject::Light(Light::point(Vec3::ONE, 1.0, 10.0)));
    }

    let scene = Scene::new(root);
    let err = render_scene(&ctx, &pass, &mut resmgr, &mut collection, &scene, &config).unwrap_err();
    assert_eq!(err, EngineError::Limit);
}

#[test]
fn shared_mesh_and_material_batch_into_64_32_4() {
    let ctx = MockContext::new();
    let pass = NoopPass;
    let mut resmgr = ResourceManager::new();
    let mut collection = Collection::new();
    let config = EngineConfig::default();

    let mesh = tiny_mesh(&ctx);
    let material = Arc::new(Material::default());

    let root = collection.graph_mut().init();
    for _ in 0..100 {
        let node = collection.graph_mut().init();
        collection.graph_mut().insert(root, node);
        collection.graph_mut().set_object(
            node,
            NodeObject::Model(Model {
                mesh: mesh.clone(),
                material: Some(material.clone()),
                skin: None,
            }),
        );
    }

    let scene = Scene::new(root);
    let submitted = render_scene(&ctx, &pass, &mut resmgr, &mut collection, &scene, &config).unwrap();

    assert_eq!(submitted, 1, "one shared mesh+material bucket never needs a second pass");
    let mut instance_counts: Vec<u32> = ctx.draw_log.lock().unwrap().iter().map(|&(_, n)| n).collect();
    instance_counts.sort_unstable();
    assert_eq!(instance_counts, vec![4, 32, 64]);
}

#[test]
fn two_hundred_distinct_materials_with_a_ten_slot_pool_take_many_passes() {
    let ctx = MockContext::with_max_pool_capacity(10);
    let pass = NoopPass;
    let mut resmgr = ResourceManager::new();
    let mut collection = Collection::new();
    let config = EngineConfig::default();

    let mesh = tiny_mesh(&ctx);

    let root = collection.graph_mut().init();
    for _ in 0..200 {
        let node = collection.graph_mut().init();
        collection.graph_mut().insert(root, node);
        collection.graph_mut().set_object(
            node,
            NodeObject::Model(Model {
                mesh: mesh.clone(),
                material: Some(Arc::new(Material::default())),
                skin: None,
            }),
        );
    }

    let scene = Scene::new(root);
    let submitted = render_scene(&ctx, &pass, &mut resmgr, &mut collection, &scene, &config).unwrap();

    assert!(
        submitted >= 20,
        "a pool capped well below 200 single-instance buckets must split across many passes, got {submitted}"
    );
    let draws = ctx.draw_log.lock().unwrap();
    assert_eq!(draws.len(), 200, "every model still gets exactly one draw");
    assert!(draws.iter().all(|&(_, n)| n == 1));
}
