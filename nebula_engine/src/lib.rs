/*!
# Nebula Engine

Core types for a real-time 3D rendering engine: a single-arena scene graph,
a managed-image GPU texture atlas, mesh/material/skin/animation data, an
asset collection registry, hand-written glTF 2.0 and PNG decoders, a
descriptor-pool-driven resource manager, and the scene render orchestrator
that ties them together each frame.

## Architecture

- **[`node`]**: the scene graph arena (`NodeGraph`/`NodeKey`)
- **[`texture`]**: managed-image texture atlas and per-texture layer handles
- **[`mesh`]**: uploaded mesh buffers and the drawable objects a node carries
- **[`material`]**: PBR material data
- **[`skin`]**: joint hierarchies and the skeletons built from them
- **[`animation`]**: keyframe sampling applied to scene-graph nodes
- **[`collection`]**: named, owned storage for every asset kind
- **[`camera`]**: view/projection parameters
- **[`light`]**: point/directional/spot light data
- **[`resource_manager`]**: descriptor-pool-backed pooled GPU allocations
- **[`scene`]**: the scene container and the per-frame render orchestrator
- **[`gpu`]**: the trait-based GPU backend contract (no concrete backend ships here)
- **[`assets`]**: glTF and PNG decoders
- **[`engine`]**: process-wide singleton state (the active logger, the
  default collection, the texture atlas, the single-active-view guard)

Backend implementations (Vulkan, or anything else) provide concrete types
for the [`gpu`] traits; this crate never depends on one.
*/

pub mod animation;
pub mod assets;
pub mod camera;
pub mod collection;
pub mod config;
mod engine;
pub mod error;
pub mod gpu;
pub mod light;
pub mod log;
pub mod material;
pub mod mesh;
pub mod node;
pub mod resource_manager;
pub mod scene;
pub mod skin;
pub mod texture;
mod utils;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{last_error, EngineError, EngineResult, LastError};

/// Re-export of the math library every public type in this crate is built
/// on, so downstream crates don't need their own `glam` dependency pinned
/// in lockstep.
pub use glam;
