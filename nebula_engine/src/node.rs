//! The scene graph: a parent/child tree of transforms with an optional
//! attached drawable object per node.
//!
//! Nodes live in a single arena (a [`slotmap::SlotMap`]) rather than as
//! individually heap-allocated, pointer-linked structures: this sidesteps the
//! cyclic "object owns node, node back-references object" ownership pattern
//! entirely, while keeping the same externally-visible semantics (insert
//! detaches an existing parent first, subtree size updates incrementally,
//! BFS traversal sees parents before children).

use glam::{Mat4, Quat, Vec3};
use slotmap::{new_key_type, SlotMap};

use crate::error::{set_err, EngineError, EngineResult};
use crate::light::Light;
use crate::mesh::{Label, Model, Particle, Quad, Terrain};

new_key_type! {
    /// Stable handle to a node in a [`NodeGraph`].
    pub struct NodeKey;
}

/// Local transform, decomposed as translation / rotation / scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// The object kind a node can carry, dispatched by `match` rather than a
/// vtable since the set is fixed and the orchestrator enumerates it exhaustively.
#[derive(Debug, Clone)]
pub enum NodeObject {
    None,
    Model(Model),
    Terrain(Terrain),
    Particle(Particle),
    Quad(Quad),
    Label(Label),
    Light(Light),
    /// Reserved; no effect object is implemented yet.
    Effect,
}

impl NodeObject {
    pub fn is_none(&self) -> bool {
        matches!(self, NodeObject::None)
    }
}

pub(crate) struct NodeData {
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    local: Transform,
    world_xform: Mat4,
    world_inv: Mat4,
    world_norm: Mat4,
    /// 1 + sum of children's subtree lengths.
    subtree_len: usize,
    name: Option<String>,
    pub object: NodeObject,
}

impl NodeData {
    fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            local: Transform::default(),
            world_xform: Mat4::IDENTITY,
            world_inv: Mat4::IDENTITY,
            world_norm: Mat4::IDENTITY,
            subtree_len: 1,
            name: None,
            object: NodeObject::None,
        }
    }
}

/// Arena owning every node of one or more scene graphs.
///
/// A single `NodeGraph` may hold several disjoint root trees; nothing in
/// this type assumes there is exactly one root.
#[derive(Default)]
pub struct NodeGraph {
    nodes: SlotMap<NodeKey, NodeData>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Creates a new, parentless node and returns its key.
    pub fn init(&mut self) -> NodeKey {
        self.nodes.insert(NodeData::new())
    }

    /// Inserts `child` as a child of `node`, at the head of its child list.
    ///
    /// If `child` already has a parent, it is first detached (mirrors the
    /// C engine's `yf_node_drop` pre-step).
    pub fn insert(&mut self, node: NodeKey, child: NodeKey) {
        assert_ne!(node, child, "a node cannot be inserted into itself");

        if self.nodes[child].parent.is_some() {
            self.drop_node(child);
        }

        let child_len = self.nodes[child].subtree_len;

        self.nodes[child].parent = Some(node);
        self.nodes[node].children.insert(0, child);

        let mut cursor = Some(node);
        while let Some(key) = cursor {
            self.nodes[key].subtree_len += child_len;
            cursor = self.nodes[key].parent;
        }
    }

    /// Detaches `node` from its parent. No-op if `node` is already a root.
    pub fn drop_node(&mut self, node: NodeKey) {
        let Some(parent) = self.nodes[node].parent else {
            return;
        };

        let node_len = self.nodes[node].subtree_len;
        self.nodes[parent].children.retain(|&c| c != node);
        self.nodes[node].parent = None;

        let mut cursor = Some(parent);
        while let Some(key) = cursor {
            self.nodes[key].subtree_len -= node_len;
            cursor = self.nodes[key].parent;
        }
    }

    /// Detaches every child of `node`; the former children become roots.
    pub fn prune(&mut self, node: NodeKey) {
        let children = std::mem::take(&mut self.nodes[node].children);
        if children.is_empty() {
            return;
        }

        let pruned_len: usize = children.iter().map(|&c| self.nodes[c].subtree_len).sum();
        for &child in &children {
            self.nodes[child].parent = None;
        }

        let mut cursor = Some(node);
        while let Some(key) = cursor {
            self.nodes[key].subtree_len -= pruned_len;
            cursor = self.nodes[key].parent;
        }
    }

    /// Breadth-first traversal of every descendant of `root` (not `root`
    /// itself). Visits parents before children so that world transforms are
    /// always available when a child is processed — the orchestrator relies
    /// on this ordering (see `scene::orchestrator`).
    ///
    /// `visitor` returns `true` to stop traversal early; `traverse` itself
    /// always returns `Ok` unless `visitor` returns an error.
    pub fn traverse<F>(&mut self, root: NodeKey, mut visitor: F) -> EngineResult<()>
    where
        F: FnMut(&mut NodeGraph, NodeKey) -> EngineResult<bool>,
    {
        let mut queue: Vec<NodeKey> = self.nodes[root].children.clone();
        let mut head = 0;

        while head < queue.len() {
            let current = queue[head];
            head += 1;

            self.update_world(current);

            if visitor(self, current)? {
                return Ok(());
            }

            queue.extend(self.nodes[current].children.iter().copied());
        }

        Ok(())
    }

    /// Recomputes `node`'s world transform from its parent's (already-valid)
    /// world transform and its own local transform.
    fn update_world(&mut self, node: NodeKey) {
        let parent_world = match self.nodes[node].parent {
            Some(p) => self.nodes[p].world_xform,
            None => Mat4::IDENTITY,
        };
        let local = self.nodes[node].local.to_mat4();
        let world = parent_world * local;
        let inv = world.inverse();

        let entry = &mut self.nodes[node];
        entry.world_xform = world;
        entry.world_inv = inv;
        entry.world_norm = inv.transpose();
    }

    pub fn descends_from(&self, node: NodeKey, ancestor: NodeKey) -> bool {
        let mut cursor = self.nodes[node].parent;
        while let Some(key) = cursor {
            if key == ancestor {
                return true;
            }
            cursor = self.nodes[key].parent;
        }
        false
    }

    pub fn is_leaf(&self, node: NodeKey) -> bool {
        self.nodes[node].children.is_empty()
    }

    pub fn is_root(&self, node: NodeKey) -> bool {
        self.nodes[node].parent.is_none()
    }

    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.nodes[node].parent
    }

    pub fn children(&self, node: NodeKey) -> &[NodeKey] {
        &self.nodes[node].children
    }

    /// Length of the subtree rooted at `node`, including `node` itself.
    /// Always at least one.
    pub fn len(&self, node: NodeKey) -> usize {
        self.nodes[node].subtree_len
    }

    pub fn local_xform(&self, node: NodeKey) -> &Transform {
        &self.nodes[node].local
    }

    pub fn set_local_xform(&mut self, node: NodeKey, xform: Transform) {
        self.nodes[node].local = xform;
    }

    pub fn world_xform(&self, node: NodeKey) -> Mat4 {
        self.nodes[node].world_xform
    }

    pub fn world_inv(&self, node: NodeKey) -> Mat4 {
        self.nodes[node].world_inv
    }

    pub fn world_norm(&self, node: NodeKey) -> Mat4 {
        self.nodes[node].world_norm
    }

    pub fn name(&self, node: NodeKey) -> Option<&str> {
        self.nodes[node].name.as_deref()
    }

    pub fn set_name(&mut self, node: NodeKey, name: Option<&str>) {
        self.nodes[node].name = name.map(str::to_owned);
    }

    pub fn compare_name(&self, node: NodeKey, other: &str) -> std::cmp::Ordering {
        self.name(node).unwrap_or("").cmp(other)
    }

    pub fn object(&self, node: NodeKey) -> &NodeObject {
        &self.nodes[node].object
    }

    pub fn set_object(&mut self, node: NodeKey, object: NodeObject) {
        self.nodes[node].object = object;
    }

    /// Deinitializes `node` and its whole subtree, detaching it from its
    /// parent first.
    pub fn deinit(&mut self, node: NodeKey) {
        self.drop_node(node);
        let mut stack = vec![node];
        while let Some(key) = stack.pop() {
            if let Some(data) = self.nodes.remove(key) {
                stack.extend(data.children);
            }
        }
    }
}

/// Helper mirroring `yf_seterr(YF_ERR_INVARG, ...)` call sites that the C
/// engine guards with an assertion; used by callers validating node keys
/// from untrusted indices (e.g. glTF node references).
pub fn invalid_node_ref() -> EngineError {
    set_err(EngineError::InvalidArgument)
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
