//! The GPU backend contract.
//!
//! This module defines trait-based dynamic polymorphism at the seams where a
//! concrete backend (Vulkan, or anything else) would plug in: device
//! creation, buffers, images, render passes, and command buffer recording.
//! No concrete backend ships in this crate — only a `#[cfg(test)]` mock used
//! to exercise the resource manager and orchestrator without a real device.

use crate::error::EngineResult;
use crate::texture::PixelFormat;

/// Device-reported limits the resource manager and orchestrator must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Minimum alignment, in bytes, for a dynamic/uniform buffer offset.
    pub uniform_align_min: u64,
    /// Maximum array layers a single image may have.
    pub max_image_layers: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            uniform_align_min: 256,
            max_image_layers: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Uniform,
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub pixfmt: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

/// A GPU-visible buffer. Implementations decide how `copy` lands the bytes
/// (mapped memory, staging + transfer, etc.).
pub trait Buffer: Send + Sync {
    fn size(&self) -> u64;
    fn copy(&mut self, offset: u64, data: &[u8]) -> EngineResult<()>;
}

/// A GPU image, possibly a layered array (the atlas's managed images always
/// are).
pub trait Image: Send + Sync {
    fn desc(&self) -> ImageDesc;
    fn copy_to_layer(&mut self, layer: usize, data: &[u8]) -> EngineResult<()>;
    /// Copies one layer from another image of the same format/dimensions,
    /// used when the atlas doubles a managed image's layer capacity.
    fn copy_layer_from(&mut self, src: &dyn Image, src_layer: usize, dst_layer: usize) -> EngineResult<()>;
}

/// A render pass target. Opaque to callers beyond its existence; concrete
/// backends attach it to a command buffer's begin/end pair.
pub trait Pass: Send + Sync {}

/// A fixed-capacity pool of descriptor-table allocations for one pipeline
/// variant. Opaque beyond its capacity; the resource manager only tracks
/// which slots are free, it never touches the pool's contents directly.
pub trait DescriptorPool: Send + Sync {
    fn capacity(&self) -> u32;
}

/// Records GPU commands for one submission.
pub trait CommandBuffer {
    fn begin_pass(&mut self, pass: &dyn Pass) -> EngineResult<()>;
    fn bind_uniform(&mut self, buffer: &dyn Buffer, offset: u64, size: u64) -> EngineResult<()>;
    fn bind_image(&mut self, image: &dyn Image, layer: usize) -> EngineResult<()>;
    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, offset: u64) -> EngineResult<()>;
    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, stride: u8) -> EngineResult<()>;
    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> EngineResult<()>;
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> EngineResult<()>;
    fn end_pass(&mut self) -> EngineResult<()>;
}

/// Factory for every other GPU resource; the single entry point a backend
/// must provide.
pub trait Context: Send + Sync {
    fn limits(&self) -> DeviceLimits;
    fn create_buffer(&self, desc: &BufferDesc) -> EngineResult<Box<dyn Buffer>>;
    fn create_image(&self, desc: &ImageDesc) -> EngineResult<Box<dyn Image>>;
    fn create_command_buffer(&self) -> EngineResult<Box<dyn CommandBuffer>>;
    fn submit(&self, cmd: Box<dyn CommandBuffer>) -> EngineResult<()>;
    /// Allocates a descriptor-table pool of `capacity` entries for one
    /// pipeline variant. Fails with [`crate::error::EngineError::NoMemory`]
    /// (or a device-specific error) if the device cannot back it — the
    /// resource manager reacts by retrying with a smaller capacity.
    fn create_descriptor_pool(&self, capacity: u32) -> EngineResult<Box<dyn DescriptorPool>>;
}

#[cfg(test)]
pub mod mock;
