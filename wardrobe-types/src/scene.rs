//! Live scene snapshot: an arena of nodes addressed by [`NodeId`] handles.
//!
//! Handles are only meaningful for the scene that produced them and are never
//! persisted. Anything that outlives a snapshot is stored as a [`PathKey`](crate::PathKey).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn get(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Editor-side flags. Any of them makes the classifier skip the node itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    pub editor_only: bool,
    pub hidden: bool,
    pub not_editable: bool,
}

impl NodeFlags {
    pub fn any(&self) -> bool {
        self.editor_only || self.hidden || self.not_editable
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub active: bool,
    /// Node carries a renderable surface (mesh renderer or similar).
    pub renderable: bool,
    pub flags: NodeFlags,
    /// Continuous parameters exposed by the node (blend shape weights).
    pub blend_weights: BTreeMap<String, f32>,
}

impl SceneNode {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            active: true,
            renderable: false,
            flags: NodeFlags::default(),
            blend_weights: BTreeMap::new(),
        }
    }
}

/// Arena-backed scene tree. Node 0 is always the hierarchy root.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SceneNode::new(root_name.into(), None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Append a child under `parent`. Panics if `parent` is not a node of this scene.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        assert!(self.contains(parent), "parent {} does not belong to this scene", parent);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode::new(name.into(), Some(parent)));
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Append a child that carries a renderable surface.
    pub fn add_mesh(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = self.add_child(parent, name);
        self.nodes[id.index()].renderable = true;
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.name.as_str()).unwrap_or("")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.node(id).map(|n| n.active).unwrap_or(false)
    }

    /// Set the node's own active flag. Returns false if the node does not exist.
    pub fn set_active(&mut self, id: NodeId, active: bool) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.active = active;
                true
            }
            None => false,
        }
    }

    /// First child named `name`, in native child order.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.name(c) == name)
    }

    /// Depth-first pre-order list of every descendant of `id` (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn from_snapshot(snapshot: &SceneSnapshot) -> Self {
        let mut scene = Scene::new(snapshot.name.clone());
        let root = scene.root();
        scene.apply_snapshot_fields(root, snapshot);
        let mut pending: Vec<(NodeId, &SceneSnapshot)> = vec![(root, snapshot)];
        while let Some((parent, snap)) = pending.pop() {
            for child in &snap.children {
                let id = scene.add_child(parent, child.name.clone());
                scene.apply_snapshot_fields(id, child);
                pending.push((id, child));
            }
        }
        scene
    }

    pub fn to_snapshot(&self) -> SceneSnapshot {
        self.snapshot_of(self.root())
    }

    fn snapshot_of(&self, id: NodeId) -> SceneSnapshot {
        let node = &self.nodes[id.index()];
        SceneSnapshot {
            name: node.name.clone(),
            active: node.active,
            renderable: node.renderable,
            editor_only: node.flags.editor_only,
            hidden: node.flags.hidden,
            not_editable: node.flags.not_editable,
            blend_weights: node.blend_weights.clone(),
            children: node.children.iter().map(|&c| self.snapshot_of(c)).collect(),
        }
    }

    fn apply_snapshot_fields(&mut self, id: NodeId, snap: &SceneSnapshot) {
        let node = &mut self.nodes[id.index()];
        node.active = snap.active;
        node.renderable = snap.renderable;
        node.flags = NodeFlags {
            editor_only: snap.editor_only,
            hidden: snap.hidden,
            not_editable: snap.not_editable,
        };
        node.blend_weights = snap.blend_weights.clone();
    }
}

/// Nested, serializable form of a scene, as supplied by the scene snapshot provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub renderable: bool,
    #[serde(default)]
    pub editor_only: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub not_editable: bool,
    #[serde(default)]
    pub blend_weights: BTreeMap<String, f32>,
    #[serde(default)]
    pub children: Vec<SceneSnapshot>,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_child_links_parent_and_children() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let outfits = scene.add_child(root, "Outfits");
        let shirt = scene.add_mesh(outfits, "Shirt");

        assert_eq!(scene.parent(shirt), Some(outfits));
        assert_eq!(scene.children(outfits), &[shirt]);
        assert!(scene.node(shirt).unwrap().renderable);
        assert!(!scene.node(outfits).unwrap().renderable);
    }

    #[test]
    fn find_child_returns_first_duplicate() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let first = scene.add_child(root, "Hat");
        let _second = scene.add_child(root, "Hat");
        assert_eq!(scene.find_child(root, "Hat"), Some(first));
        assert_eq!(scene.find_child(root, "Scarf"), None);
    }

    #[test]
    fn descendants_are_preorder() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let a = scene.add_child(root, "A");
        let a1 = scene.add_child(a, "A1");
        let b = scene.add_child(root, "B");
        assert_eq!(scene.descendants(root), vec![a, a1, b]);
    }

    #[test]
    fn snapshot_round_trip_preserves_shape() {
        let json = r#"{
            "name": "Avatar",
            "children": [
                {"name": "Outfits", "children": [
                    {"name": "Shirt", "renderable": true, "active": false,
                     "blend_weights": {"Shrink": 40.0}}
                ]},
                {"name": "Armature", "editor_only": true}
            ]
        }"#;
        let snapshot: SceneSnapshot = serde_json::from_str(json).unwrap();
        let scene = Scene::from_snapshot(&snapshot);
        assert_eq!(scene.len(), 4);

        let outfits = scene.find_child(scene.root(), "Outfits").unwrap();
        let shirt = scene.find_child(outfits, "Shirt").unwrap();
        let node = scene.node(shirt).unwrap();
        assert!(!node.active);
        assert!(node.renderable);
        assert_eq!(node.blend_weights.get("Shrink"), Some(&40.0));

        let armature = scene.find_child(scene.root(), "Armature").unwrap();
        assert!(scene.node(armature).unwrap().flags.editor_only);

        assert_eq!(scene.to_snapshot(), snapshot);
    }
}
