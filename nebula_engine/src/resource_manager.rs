//! Descriptor-table pool management, one pool per pipeline variant.
//!
//! The orchestrator batches instances of the same mesh+material into groups
//! of 1, 2, 4, 8, 16, 32 or 64 (plus one pool each for terrain, particle,
//! quad and label). Each pipeline variant gets its own fixed-capacity pool
//! of descriptor-table allocations; `obtain`/`yield_alloc` hand them out and
//! take them back each frame.

use rustc_hash::FxHashMap;

use crate::error::{set_err, EngineError, EngineResult};
use crate::gpu::{Context, DescriptorPool};
use crate::utils::SlotAllocator;

/// The eleven pipeline variants the orchestrator ever requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Mdl1,
    Mdl2,
    Mdl4,
    Mdl8,
    Mdl16,
    Mdl32,
    Mdl64,
    Terrain,
    Particle,
    Quad,
    Label,
}

impl Variant {
    /// The model-instance variants, in decreasing bucket size — the order
    /// the orchestrator peels them off in when decomposing an instance
    /// count into buckets.
    pub const MODEL_VARIANTS_DESC: [Variant; 7] = [
        Variant::Mdl64,
        Variant::Mdl32,
        Variant::Mdl16,
        Variant::Mdl8,
        Variant::Mdl4,
        Variant::Mdl2,
        Variant::Mdl1,
    ];

    pub fn instances_per_alloc(self) -> u32 {
        match self {
            Variant::Mdl1 => 1,
            Variant::Mdl2 => 2,
            Variant::Mdl4 => 4,
            Variant::Mdl8 => 8,
            Variant::Mdl16 => 16,
            Variant::Mdl32 => 32,
            Variant::Mdl64 => 64,
            Variant::Terrain | Variant::Particle | Variant::Quad | Variant::Label => 1,
        }
    }
}

struct Pool {
    allocator: SlotAllocator,
    capacity: u32,
    #[allow(dead_code)]
    backing: Box<dyn DescriptorPool>,
}

/// Owns one [`Pool`] per variant that has ever had a non-zero allocation
/// count set.
#[derive(Default)]
pub struct ResourceManager {
    pools: FxHashMap<Variant, Pool>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes `variant`'s pool to `count` slots. On device failure, the
    /// pool for this variant is reset to empty (not left half-resized) so
    /// the caller can retry with a smaller count.
    pub fn set_alloc_count(&mut self, ctx: &dyn Context, variant: Variant, count: u32) -> EngineResult<()> {
        if count == 0 {
            self.pools.remove(&variant);
            return Ok(());
        }

        match ctx.create_descriptor_pool(count) {
            Ok(backing) => {
                self.pools.insert(
                    variant,
                    Pool {
                        allocator: SlotAllocator::new(),
                        capacity: count,
                        backing,
                    },
                );
                Ok(())
            }
            Err(e) => {
                self.pools.remove(&variant);
                Err(e)
            }
        }
    }

    pub fn capacity(&self, variant: Variant) -> u32 {
        self.pools.get(&variant).map(|p| p.capacity).unwrap_or(0)
    }

    /// Claims a free allocation index from `variant`'s pool.
    pub fn obtain(&mut self, variant: Variant) -> EngineResult<u32> {
        let pool = self
            .pools
            .get_mut(&variant)
            .ok_or_else(|| set_err(EngineError::InUse))?;

        if pool.allocator.len() >= pool.capacity {
            return Err(set_err(EngineError::InUse));
        }
        Ok(pool.allocator.alloc())
    }

    pub fn yield_alloc(&mut self, variant: Variant, index: u32) {
        if let Some(pool) = self.pools.get_mut(&variant) {
            pool.allocator.free(index);
        }
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
