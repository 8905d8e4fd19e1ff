//! Skins (joint hierarchies) and the skeletons built from them.

use glam::Mat4;

use crate::error::EngineResult;
use crate::node::{NodeGraph, NodeKey, Transform};

/// One joint: its bind-pose local transform, inverse-bind matrix, an index
/// into the parent joint (or `None` for a root, which attaches to the
/// skeleton's synthetic trailing node), and an optional name copied onto
/// the node created for it.
#[derive(Debug, Clone)]
pub struct Joint {
    pub local: Transform,
    pub inverse_bind: Mat4,
    pub parent_index: Option<usize>,
    pub name: Option<String>,
}

/// A skin: the joint list shared by every skeleton built from it.
pub struct Skin {
    pub joints: Vec<Joint>,
}

impl Skin {
    pub fn new(joints: Vec<Joint>) -> Self {
        Self { joints }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Builds a skeleton. With `external_nodes` absent, allocates a fresh,
    /// self-contained node arena of `joint_count + 1` nodes (the extra one a
    /// synthetic trailing root every joint without a `parent_index`
    /// attaches to), copies each joint's local transform in, and wires
    /// parents. With `external_nodes` present, adopts that array verbatim
    /// and this skeleton does not own those nodes.
    pub fn make_skeleton(&self, external_nodes: Option<Vec<NodeKey>>) -> EngineResult<Skeleton> {
        match external_nodes {
            Some(nodes) => Ok(Skeleton {
                nodes: SkeletonNodes::Adopted(nodes),
            }),
            None => {
                let mut graph = NodeGraph::new();
                let root = graph.init();
                let mut joint_nodes = Vec::with_capacity(self.joints.len());

                for joint in &self.joints {
                    let node = graph.init();
                    graph.set_local_xform(node, joint.local);
                    graph.set_name(node, joint.name.as_deref());
                    joint_nodes.push(node);
                }

                for (i, joint) in self.joints.iter().enumerate() {
                    let parent = joint
                        .parent_index
                        .map(|p| joint_nodes[p])
                        .unwrap_or(root);
                    graph.insert(parent, joint_nodes[i]);
                }

                Ok(Skeleton {
                    nodes: SkeletonNodes::Managed {
                        graph,
                        root,
                        joints: joint_nodes,
                    },
                })
            }
        }
    }
}

enum SkeletonNodes {
    /// Owns its own small arena; torn down automatically when the skeleton
    /// is dropped.
    Managed {
        graph: NodeGraph,
        root: NodeKey,
        joints: Vec<NodeKey>,
    },
    /// Indices into a graph owned elsewhere; this skeleton does not manage
    /// their lifetime.
    Adopted(Vec<NodeKey>),
}

/// A concrete set of joint nodes bound to one skin, ready to be sampled by
/// an animation and read by the orchestrator each frame.
pub struct Skeleton {
    nodes: SkeletonNodes,
}

impl Skeleton {
    pub fn joint_count(&self) -> usize {
        match &self.nodes {
            SkeletonNodes::Managed { joints, .. } => joints.len(),
            SkeletonNodes::Adopted(nodes) => nodes.len(),
        }
    }

    /// World transforms of every joint, in joint order, for the orchestrator
    /// to pack into the model instance's joint-matrix array.
    pub fn joint_world_xforms(&self, external_graph: Option<&NodeGraph>) -> Vec<Mat4> {
        match &self.nodes {
            SkeletonNodes::Managed { graph, joints, .. } => {
                joints.iter().map(|&j| graph.world_xform(j)).collect()
            }
            SkeletonNodes::Adopted(joints) => {
                let graph = external_graph.expect("adopted skeleton needs the owning graph");
                joints.iter().map(|&j| graph.world_xform(j)).collect()
            }
        }
    }

    /// Recomputes this skeleton's own node-world transforms, for a
    /// self-contained (managed) skeleton that isn't part of the scene graph
    /// traversed by the orchestrator.
    pub fn update(&mut self) {
        if let SkeletonNodes::Managed { graph, root, .. } = &mut self.nodes {
            let root = *root;
            graph.traverse(root, |_, _| Ok(false)).expect("traverse never errors");
        }
    }
}

#[cfg(test)]
#[path = "skin_tests.rs"]
mod tests;
