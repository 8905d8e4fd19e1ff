//! Named, owned storage for every asset kind, plus the node arena a loaded
//! document's graph lives in.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::KeyframeAnimation;
use crate::error::{set_err, EngineError, EngineResult};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::node::{NodeGraph, NodeKey};
use crate::scene::Scene;
use crate::skin::Skin;
use crate::texture::Texture;

/// A bitmap font: one atlas texture plus the fixed glyph cell it's sliced
/// into. No variable-width glyph metrics; sufficient for the label object
/// this engine renders.
pub struct Font {
    pub texture: Arc<Texture>,
    pub glyph_width: f32,
    pub glyph_height: f32,
}

/// The eight item kinds a collection tracks, in the order their per-kind
/// auto-name counters are indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Scene,
    Node,
    Mesh,
    Skin,
    Material,
    Texture,
    KfAnim,
    Font,
}

const KIND_COUNT: usize = 8;
/// 20-bit mask applied to each kind's counter when generating `unnamed-HHHHH`.
const NAME_COUNTER_MASK: u32 = 0x000F_FFFF;

impl ItemKind {
    fn tag(self) -> &'static str {
        match self {
            ItemKind::Scene => "scene",
            ItemKind::Node => "node",
            ItemKind::Mesh => "mesh",
            ItemKind::Skin => "skin",
            ItemKind::Material => "material",
            ItemKind::Texture => "texture",
            ItemKind::KfAnim => "kfanim",
            ItemKind::Font => "font",
        }
    }
}

/// Per-kind dictionaries of owned items, plus the node arena shared by every
/// node/scene/skeleton this collection holds.
pub struct Collection {
    graph: NodeGraph,
    scenes: FxHashMap<String, Scene>,
    nodes: FxHashMap<String, NodeKey>,
    meshes: FxHashMap<String, Arc<Mesh>>,
    skins: FxHashMap<String, Arc<Skin>>,
    materials: FxHashMap<String, Arc<Material>>,
    textures: FxHashMap<String, Arc<Texture>>,
    kfanims: FxHashMap<String, Arc<KeyframeAnimation>>,
    fonts: FxHashMap<String, Arc<Font>>,
    name_counters: [u32; KIND_COUNT],
}

impl Collection {
    pub fn new() -> Self {
        Self {
            graph: NodeGraph::new(),
            scenes: FxHashMap::default(),
            nodes: FxHashMap::default(),
            meshes: FxHashMap::default(),
            skins: FxHashMap::default(),
            materials: FxHashMap::default(),
            textures: FxHashMap::default(),
            kfanims: FxHashMap::default(),
            fonts: FxHashMap::default(),
            name_counters: [0; KIND_COUNT],
        }
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }

    fn generate_name(&mut self, kind: ItemKind) -> String {
        let counter = &mut self.name_counters[kind as usize];
        let id = *counter & NAME_COUNTER_MASK;
        *counter = counter.wrapping_add(1);
        format!("unnamed-{:05x}", id)
    }

    pub fn len(&self, kind: ItemKind) -> usize {
        match kind {
            ItemKind::Scene => self.scenes.len(),
            ItemKind::Node => self.nodes.len(),
            ItemKind::Mesh => self.meshes.len(),
            ItemKind::Skin => self.skins.len(),
            ItemKind::Material => self.materials.len(),
            ItemKind::Texture => self.textures.len(),
            ItemKind::KfAnim => self.kfanims.len(),
            ItemKind::Font => self.fonts.len(),
        }
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_kind {
    ($manage:ident, $release:ident, $get:ident, $each:ident, $map:ident, $kind:expr, $ty:ty) => {
        impl Collection {
            /// Deposits `item` under `name`, generating an `unnamed-HHHHH`
            /// name if `name` is `None`. Fails with
            /// [`EngineError::Exist`] if the name is already taken.
            pub fn $manage(&mut self, name: Option<&str>, item: $ty) -> EngineResult<String> {
                let name = match name {
                    Some(n) => n.to_owned(),
                    None => self.generate_name($kind),
                };
                if self.$map.contains_key(&name) {
                    return Err(set_err(EngineError::Exist));
                }
                self.$map.insert(name.clone(), item);
                Ok(name)
            }

            pub fn $release(&mut self, name: &str) -> Option<$ty> {
                self.$map.remove(name)
            }

            pub fn $get(&self, name: &str) -> Option<&$ty> {
                self.$map.get(name)
            }

            /// Iterates entries until `visitor` returns `true`.
            pub fn $each(&self, mut visitor: impl FnMut(&str, &$ty) -> bool) {
                for (name, item) in self.$map.iter() {
                    if visitor(name, item) {
                        break;
                    }
                }
            }
        }
    };
}

impl_kind!(manage_scene, release_scene, scene, each_scene, scenes, ItemKind::Scene, Scene);
impl_kind!(manage_mesh, release_mesh, mesh, each_mesh, meshes, ItemKind::Mesh, Arc<Mesh>);
impl_kind!(manage_skin, release_skin, skin, each_skin, skins, ItemKind::Skin, Arc<Skin>);
impl_kind!(
    manage_material,
    release_material,
    material,
    each_material,
    materials,
    ItemKind::Material,
    Arc<Material>
);
impl_kind!(
    manage_texture,
    release_texture,
    texture,
    each_texture,
    textures,
    ItemKind::Texture,
    Arc<Texture>
);
impl_kind!(
    manage_kfanim,
    release_kfanim,
    kfanim,
    each_kfanim,
    kfanims,
    ItemKind::KfAnim,
    Arc<KeyframeAnimation>
);
impl_kind!(manage_font, release_font, font, each_font, fonts, ItemKind::Font, Arc<Font>);

impl Collection {
    /// `Node` is named separately since a released node must also be
    /// deinitialized (detached + its subtree dropped) from the shared graph,
    /// not merely removed from the dictionary.
    pub fn manage_node(&mut self, name: Option<&str>, node: NodeKey) -> EngineResult<String> {
        let name = match name {
            Some(n) => n.to_owned(),
            None => self.generate_name(ItemKind::Node),
        };
        if self.nodes.contains_key(&name) {
            return Err(set_err(EngineError::Exist));
        }
        self.graph.set_name(node, Some(&name));
        self.nodes.insert(name.clone(), node);
        Ok(name)
    }

    pub fn release_node(&mut self, name: &str) -> Option<NodeKey> {
        let node = self.nodes.remove(name)?;
        self.graph.deinit(node);
        Some(node)
    }

    pub fn node(&self, name: &str) -> Option<NodeKey> {
        self.nodes.get(name).copied()
    }

    pub fn each_node(&self, mut visitor: impl FnMut(&str, NodeKey) -> bool) {
        for (name, &node) in self.nodes.iter() {
            if visitor(name, node) {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
