use super::*;
use crate::gpu::mock::MockContext;

fn px(n: usize) -> Vec<u8> {
    vec![0xAB; n]
}

#[test]
fn new_texture_claims_a_layer() {
    let ctx = MockContext::new();
    let dim = Dim2 { width: 4, height: 4 };
    let data = px(4 * 4 * 4);

    let tex = Texture::new(&ctx, PixelFormat::Rgba8Unorm, dim, &data).unwrap();
    assert_eq!(tex.pixfmt(), PixelFormat::Rgba8Unorm);
    assert_eq!(tex.dim(), dim);
    assert_eq!(tex.sampler(), Sampler::default());
}

#[test]
fn with_sampler_overrides_the_default() {
    let ctx = MockContext::new();
    let dim = Dim2 { width: 1, height: 1 };
    let data = px(4);
    let sampler = Sampler {
        wrap_u: WrapMode::Clamp,
        wrap_v: WrapMode::Clamp,
        wrap_w: WrapMode::Clamp,
        mag_filter: Filter::Nearest,
        min_filter: Filter::Nearest,
        mip_filter: Filter::Nearest,
    };

    let tex = Texture::with_sampler(&ctx, PixelFormat::Rgba8Unorm, dim, &data, sampler).unwrap();
    assert_eq!(tex.sampler(), sampler);
}

#[test]
fn rejects_mismatched_data_length() {
    let ctx = MockContext::new();
    let dim = Dim2 { width: 4, height: 4 };
    let data = px(4);

    let err = Texture::new(&ctx, PixelFormat::Rgba8Unorm, dim, &data).unwrap_err();
    assert_eq!(err, EngineError::InvalidArgument);
}

#[test]
fn atlas_reuses_freed_layers() {
    let ctx = MockContext::new();
    let mut atlas = Atlas::new();
    let dim = Dim2 { width: 2, height: 2 };
    let data = px(2 * 2 * 4);

    let layer_a = atlas
        .copy_data(&ctx, PixelFormat::Rgba8Unorm, dim, &data)
        .unwrap();
    atlas.release(PixelFormat::Rgba8Unorm, dim, layer_a);
    let layer_b = atlas
        .copy_data(&ctx, PixelFormat::Rgba8Unorm, dim, &data)
        .unwrap();

    assert_eq!(layer_a, layer_b);
}

#[test]
fn atlas_grows_when_every_layer_is_used() {
    let ctx = MockContext::new();
    let mut atlas = Atlas::new();
    let dim = Dim2 { width: 1, height: 1 };
    let data = px(4);

    // Initial capacity is 64 layers; claim all of them, then one more to
    // force the doubling path.
    for _ in 0..64 {
        atlas
            .copy_data(&ctx, PixelFormat::Rgba8Unorm, dim, &data)
            .unwrap();
    }
    let grown_layer = atlas
        .copy_data(&ctx, PixelFormat::Rgba8Unorm, dim, &data)
        .unwrap();

    assert_eq!(grown_layer, 64);
}

#[test]
fn distinct_dims_get_distinct_managed_images() {
    let ctx = MockContext::new();
    let mut atlas = Atlas::new();
    let small = Dim2 { width: 1, height: 1 };
    let big = Dim2 { width: 8, height: 8 };

    let layer_small = atlas
        .copy_data(&ctx, PixelFormat::Rgba8Unorm, small, &px(4))
        .unwrap();
    let layer_big = atlas
        .copy_data(&ctx, PixelFormat::Rgba8Unorm, big, &px(8 * 8 * 4))
        .unwrap();

    assert_eq!(layer_small, 0);
    assert_eq!(layer_big, 0);
}
