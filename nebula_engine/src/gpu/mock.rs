//! An in-memory `Context` used only by tests, standing in for a real GPU
//! device so the resource manager and orchestrator can be exercised without
//! one.

use std::sync::{Arc, Mutex};

use super::{
    Buffer, BufferDesc, CommandBuffer, Context, DescriptorPool, DeviceLimits, Image, ImageDesc, Pass,
};
use crate::error::{set_err, EngineError, EngineResult};

pub struct MockBuffer {
    data: Vec<u8>,
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn copy(&mut self, offset: u64, data: &[u8]) -> EngineResult<()> {
        let start = offset as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

pub struct MockImage {
    desc: ImageDesc,
    layers: Vec<Vec<u8>>,
}

impl Image for MockImage {
    fn desc(&self) -> ImageDesc {
        self.desc
    }

    fn copy_to_layer(&mut self, layer: usize, data: &[u8]) -> EngineResult<()> {
        self.layers[layer].clear();
        self.layers[layer].extend_from_slice(data);
        Ok(())
    }

    fn copy_layer_from(&mut self, src: &dyn Image, _src_layer: usize, dst_layer: usize) -> EngineResult<()> {
        // The mock has no way to downcast `src`; tests that exercise atlas
        // growth only assert on layer counts and occupancy, not pixel data,
        // so a no-op copy is sufficient here.
        let _ = src;
        self.layers[dst_layer].clear();
        Ok(())
    }
}

pub struct MockPass;
impl Pass for MockPass {}

/// Records `(count, instance_count)` for every `draw`/`draw_indexed` call
/// into a log shared with the owning [`MockContext`], so tests can inspect
/// draw batching after the command buffer has been submitted and dropped.
pub struct MockCommandBuffer {
    log: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl CommandBuffer for MockCommandBuffer {
    fn begin_pass(&mut self, _pass: &dyn Pass) -> EngineResult<()> {
        Ok(())
    }

    fn bind_uniform(&mut self, _buffer: &dyn Buffer, _offset: u64, _size: u64) -> EngineResult<()> {
        Ok(())
    }

    fn bind_image(&mut self, _image: &dyn Image, _layer: usize) -> EngineResult<()> {
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, _buffer: &dyn Buffer, _offset: u64) -> EngineResult<()> {
        Ok(())
    }

    fn bind_index_buffer(&mut self, _buffer: &dyn Buffer, _offset: u64, _stride: u8) -> EngineResult<()> {
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> EngineResult<()> {
        self.log.lock().unwrap().push((vertex_count, instance_count));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> EngineResult<()> {
        self.log.lock().unwrap().push((index_count, instance_count));
        Ok(())
    }

    fn end_pass(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

pub struct MockDescriptorPool {
    capacity: u32,
}

impl DescriptorPool for MockDescriptorPool {
    fn capacity(&self) -> u32 {
        self.capacity
    }
}

pub struct MockContext {
    limits: DeviceLimits,
    /// Pool allocations above this capacity fail, to exercise the resource
    /// manager's halve-and-retry fallback. `u32::MAX` (the default) means
    /// "never fails".
    pub max_pool_capacity: u32,
    pub submitted: Mutex<usize>,
    /// Every `(count, instance_count)` pair drawn by any command buffer this
    /// context has created, across every pass, in draw order.
    pub draw_log: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl MockContext {
    pub fn new() -> Self {
        Self {
            limits: DeviceLimits::default(),
            max_pool_capacity: u32::MAX,
            submitted: Mutex::new(0),
            draw_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            max_pool_capacity: u32::MAX,
            submitted: Mutex::new(0),
            draw_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_max_pool_capacity(capacity: u32) -> Self {
        Self {
            limits: DeviceLimits::default(),
            max_pool_capacity: capacity,
            submitted: Mutex::new(0),
            draw_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for MockContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for MockContext {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_buffer(&self, desc: &BufferDesc) -> EngineResult<Box<dyn Buffer>> {
        Ok(Box::new(MockBuffer {
            data: vec![0u8; desc.size as usize],
        }))
    }

    fn create_image(&self, desc: &ImageDesc) -> EngineResult<Box<dyn Image>> {
        let layer_size = desc.pixfmt.texel_size() * desc.width as usize * desc.height as usize;
        Ok(Box::new(MockImage {
            desc: *desc,
            layers: vec![Vec::with_capacity(layer_size); desc.layers as usize],
        }))
    }

    fn create_command_buffer(&self) -> EngineResult<Box<dyn CommandBuffer>> {
        Ok(Box::new(MockCommandBuffer {
            log: self.draw_log.clone(),
        }))
    }

    fn submit(&self, _cmd: Box<dyn CommandBuffer>) -> EngineResult<()> {
        *self.submitted.lock().unwrap() += 1;
        Ok(())
    }

    fn create_descriptor_pool(&self, capacity: u32) -> EngineResult<Box<dyn DescriptorPool>> {
        if capacity > self.max_pool_capacity {
            return Err(set_err(EngineError::NoMemory));
        }
        Ok(Box::new(MockDescriptorPool { capacity }))
    }
}
