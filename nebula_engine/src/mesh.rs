//! Mesh data and the lightweight drawable objects a node can carry.

use std::sync::Arc;

use crate::error::EngineResult;
use crate::gpu::{Buffer, BufferDesc, BufferUsage, CommandBuffer, Context};
use crate::material::Material;
use crate::skin::{Skeleton, Skin};
use crate::texture::{Dim2, Texture};

/// One indexed draw range within a mesh's shared vertex/index buffers.
#[derive(Debug, Clone, Copy)]
pub struct Primitive {
    pub vertex_offset: u64,
    pub index_offset: u64,
    pub index_count: u32,
    /// 2 for `u16` indices, 4 for `u32`.
    pub index_stride: u8,
}

/// A mesh: one vertex buffer, one index buffer, and the primitives that
/// slice them.
pub struct Mesh {
    vertex_buffer: Box<dyn Buffer>,
    index_buffer: Box<dyn Buffer>,
    primitives: Vec<Primitive>,
}

impl Mesh {
    /// Uploads `vertex_data`/`index_data` verbatim to fresh device buffers.
    pub fn upload(
        ctx: &dyn Context,
        vertex_data: &[u8],
        index_data: &[u8],
        primitives: Vec<Primitive>,
    ) -> EngineResult<Self> {
        let mut vertex_buffer = ctx.create_buffer(&BufferDesc {
            size: vertex_data.len() as u64,
            usage: BufferUsage::Vertex,
        })?;
        vertex_buffer.copy(0, vertex_data)?;

        let mut index_buffer = ctx.create_buffer(&BufferDesc {
            size: index_data.len() as u64,
            usage: BufferUsage::Index,
        })?;
        index_buffer.copy(0, index_data)?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            primitives,
        })
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Binds this mesh's buffers and issues one indexed draw per primitive.
    pub fn draw(&self, cmd: &mut dyn CommandBuffer, instance_count: u32) -> EngineResult<()> {
        for prim in &self.primitives {
            cmd.bind_vertex_buffer(self.vertex_buffer.as_ref(), prim.vertex_offset)?;
            cmd.bind_index_buffer(self.index_buffer.as_ref(), prim.index_offset, prim.index_stride)?;
            cmd.draw_indexed(prim.index_count, instance_count)?;
        }
        Ok(())
    }
}

/// A mesh + material (+ optional skin) instance attached to a node.
#[derive(Clone)]
pub struct Model {
    pub mesh: Arc<Mesh>,
    pub material: Option<Arc<Material>>,
    pub skin: Option<(Arc<Skin>, Arc<Skeleton>)>,
}

/// A heightmap-displaced ground patch.
#[derive(Clone)]
pub struct Terrain {
    pub mesh: Arc<Mesh>,
    pub heightmap: Arc<Texture>,
    pub texture: Arc<Texture>,
}

/// A GPU-simulated particle system sharing one mesh and texture across all
/// live particles.
#[derive(Clone)]
pub struct Particle {
    pub mesh: Arc<Mesh>,
    pub texture: Arc<Texture>,
    pub count: u32,
}

/// A screen-aligned or world-aligned textured rectangle.
#[derive(Clone)]
pub struct Quad {
    pub texture: Arc<Texture>,
    pub dim: Dim2,
}

/// A run of text rendered through a bitmap font.
#[derive(Clone)]
pub struct Label {
    pub font: Arc<crate::collection::Font>,
    pub text: String,
    pub dim: Dim2,
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
