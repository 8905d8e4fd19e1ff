//! GPU-backed textures and the managed-image atlas that packs them.
//!
//! Individual textures rarely want a whole GPU image to themselves — most
//! are one glTF material's worth of a few hundred texels. Instead, textures
//! of the same pixel format and dimensions share a single array image (a
//! "managed image"), each texture claiming one array layer. This keeps
//! descriptor-set churn down in the resource manager: one image + sampler
//! binding serves every texture of that (format, size) key.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::engine::Engine;
use crate::error::{set_err, EngineError, EngineResult};
use crate::gpu::{Context, Image, ImageDesc};

/// Pixel formats the atlas and decoders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
}

impl PixelFormat {
    pub fn texel_size(self) -> usize {
        match self {
            PixelFormat::R8Unorm => 1,
            PixelFormat::Rg8Unorm => 2,
            PixelFormat::Rgba8Unorm | PixelFormat::Rgba8Srgb => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim2 {
    pub width: u32,
    pub height: u32,
}

/// Texture addressing mode, one per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Clamp,
    Mirror,
    Repeat,
}

/// A single min/mag/mipmap filter choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Wrap modes and filters a texture samples with. Carried on the texture
/// itself, not the managed image it shares a layer of — two textures of the
/// same (format, size) can still disagree on how they're sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub wrap_w: WrapMode,
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mip_filter: Filter,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            wrap_w: WrapMode::Repeat,
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mip_filter: Filter::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AtlasKey {
    pixfmt: PixelFormat,
    width: u32,
    height: u32,
}

/// One shared array image plus its per-layer occupancy bitmap.
struct ManagedImage {
    image: Box<dyn Image>,
    layer_used: Vec<bool>,
    /// Round-robin search hint; not an invariant, just avoids re-scanning
    /// from zero every allocation.
    layer_hint: usize,
}

impl ManagedImage {
    fn used_count(&self) -> usize {
        self.layer_used.iter().filter(|&&u| u).count()
    }

    fn alloc_layer(&mut self) -> Option<usize> {
        let n = self.layer_used.len();
        for off in 0..n {
            let i = (self.layer_hint + off) % n;
            if !self.layer_used[i] {
                self.layer_used[i] = true;
                self.layer_hint = (i + 1) % n;
                return Some(i);
            }
        }
        None
    }
}

/// Dictionary of managed images, keyed by (format, dimensions).
///
/// One instance lives in the process-wide [`Engine`] singleton; textures
/// release their layer back into it on drop.
#[derive(Default)]
pub struct Atlas {
    images: FxHashMap<AtlasKey, ManagedImage>,
}

impl Atlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `data` into a free layer of the managed image for `(pixfmt,
    /// dim)`, growing or creating that image as needed, and returns the
    /// layer index the caller now owns.
    pub fn copy_data(
        &mut self,
        ctx: &dyn Context,
        pixfmt: PixelFormat,
        dim: Dim2,
        data: &[u8],
    ) -> EngineResult<usize> {
        const INITIAL_LAYER_CAP: u32 = 64;

        let key = AtlasKey {
            pixfmt,
            width: dim.width,
            height: dim.height,
        };

        let entry = match self.images.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let image = ctx
                    .create_image(&ImageDesc {
                        pixfmt,
                        width: dim.width,
                        height: dim.height,
                        layers: INITIAL_LAYER_CAP,
                    })
                    .map_err(set_err)?;
                e.insert(ManagedImage {
                    image,
                    layer_used: vec![false; INITIAL_LAYER_CAP as usize],
                    layer_hint: 0,
                })
            }
        };

        let layer = match entry.alloc_layer() {
            Some(l) => l,
            None => {
                // Every layer in use: double capacity via a fresh image and a
                // synchronous copy of everything already resident. The old
                // image must not be in use by an in-flight command buffer
                // when this runs.
                let old_cap = entry.layer_used.len();
                let new_cap = old_cap * 2;

                let mut new_image = ctx
                    .create_image(&ImageDesc {
                        pixfmt,
                        width: dim.width,
                        height: dim.height,
                        layers: new_cap as u32,
                    })
                    .map_err(set_err)?;

                for (i, used) in entry.layer_used.iter().enumerate() {
                    if *used {
                        new_image
                            .copy_layer_from(entry.image.as_ref(), i, i)
                            .map_err(set_err)?;
                    }
                }

                entry.image = new_image;
                entry.layer_used.resize(new_cap, false);

                entry
                    .alloc_layer()
                    .expect("capacity was just doubled from a fully-used image")
            }
        };

        entry
            .image
            .copy_to_layer(layer, data)
            .map_err(set_err)?;

        Ok(layer)
    }

    /// Releases a layer back to the pool. The managed image itself, and its
    /// dictionary entry, are torn down once its last layer is released.
    pub fn release(&mut self, pixfmt: PixelFormat, dim: Dim2, layer: usize) {
        let key = AtlasKey {
            pixfmt,
            width: dim.width,
            height: dim.height,
        };

        let Entry::Occupied(mut e) = self.images.entry(key) else {
            return;
        };

        let entry = e.get_mut();
        if layer < entry.layer_used.len() {
            entry.layer_used[layer] = false;
        }
        if entry.used_count() == 0 {
            e.remove();
        }
    }
}

/// A texture: one layer of one managed image, plus how it's sampled.
pub struct Texture {
    pixfmt: PixelFormat,
    dim: Dim2,
    layer: usize,
    sampler: Sampler,
}

impl Texture {
    /// Decodes nothing itself — `data` must already be tightly-packed texels
    /// in `pixfmt`, one mip, one layer's worth. Samples with the default
    /// sampler (repeat wrap, linear filtering).
    pub fn new(ctx: &dyn Context, pixfmt: PixelFormat, dim: Dim2, data: &[u8]) -> EngineResult<Self> {
        Self::with_sampler(ctx, pixfmt, dim, data, Sampler::default())
    }

    /// As [`Texture::new`], with an explicit sampler rather than the default.
    pub fn with_sampler(
        ctx: &dyn Context,
        pixfmt: PixelFormat,
        dim: Dim2,
        data: &[u8],
        sampler: Sampler,
    ) -> EngineResult<Self> {
        let expected = pixfmt.texel_size() * dim.width as usize * dim.height as usize;
        if data.len() != expected {
            return Err(set_err(EngineError::InvalidArgument));
        }

        let layer = Engine::atlas(|atlas| atlas.copy_data(ctx, pixfmt, dim, data))?;

        Ok(Self { pixfmt, dim, layer, sampler })
    }

    pub fn pixfmt(&self) -> PixelFormat {
        self.pixfmt
    }

    pub fn dim(&self) -> Dim2 {
        self.dim
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn sampler(&self) -> Sampler {
        self.sampler
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        Engine::atlas(|atlas| atlas.release(self.pixfmt, self.dim, self.layer));
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
