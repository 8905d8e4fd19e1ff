use super::*;
use crate::gpu::mock::MockContext;

#[test]
fn obtain_without_alloc_count_is_in_use() {
    let mut resmgr = ResourceManager::new();
    let err = resmgr.obtain(Variant::Quad).unwrap_err();
    assert_eq!(err, EngineError::InUse);
}

#[test]
fn obtain_fails_once_pool_is_exhausted() {
    let ctx = MockContext::new();
    let mut resmgr = ResourceManager::new();
    resmgr.set_alloc_count(&ctx, Variant::Quad, 2).unwrap();

    resmgr.obtain(Variant::Quad).unwrap();
    resmgr.obtain(Variant::Quad).unwrap();
    let err = resmgr.obtain(Variant::Quad).unwrap_err();
    assert_eq!(err, EngineError::InUse);
}

#[test]
fn yielded_slots_are_reusable() {
    let ctx = MockContext::new();
    let mut resmgr = ResourceManager::new();
    resmgr.set_alloc_count(&ctx, Variant::Mdl1, 1).unwrap();

    let a = resmgr.obtain(Variant::Mdl1).unwrap();
    resmgr.yield_alloc(Variant::Mdl1, a);
    let b = resmgr.obtain(Variant::Mdl1).unwrap();
    assert_eq!(a, b);
}

#[test]
fn set_alloc_count_resets_on_failure() {
    let ctx = MockContext::with_max_pool_capacity(4);
    let mut resmgr = ResourceManager::new();

    let err = resmgr.set_alloc_count(&ctx, Variant::Mdl64, 8).unwrap_err();
    assert_eq!(err, EngineError::NoMemory);
    assert_eq!(resmgr.capacity(Variant::Mdl64), 0);
}

#[test]
fn model_variants_descending_cover_all_bucket_sizes() {
    let sizes: Vec<u32> = Variant::MODEL_VARIANTS_DESC
        .iter()
        .map(|v| v.instances_per_alloc())
        .collect();
    assert_eq!(sizes, vec![64, 32, 16, 8, 4, 2, 1]);
}
