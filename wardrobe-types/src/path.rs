//! Canonical relative paths between the live scene and persisted slot data.

use serde::{Deserialize, Serialize};

use crate::scene::{NodeId, Scene};

/// `/`-joined node names from an anchor (exclusive) to a target (inclusive).
///
/// The empty path denotes the anchor itself. Paths are anchored at the
/// hierarchy root rather than an organisational sub-folder, so removing a
/// sub-folder from the scan does not invalidate stored paths.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The anchor itself.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn parent(&self) -> Option<PathKey> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(PathKey(self.0[..idx].to_string())),
            None => Some(PathKey::root()),
        }
    }

    pub fn join(&self, name: &str) -> PathKey {
        if self.is_root() {
            PathKey(name.to_string())
        } else {
            PathKey(format!("{}/{}", self.0, name))
        }
    }

    /// Re-express a path relative to a sub-anchor `base` as a path relative to
    /// the outer anchor, given `base`'s own path from the outer anchor.
    pub fn rebase(&self, base: &PathKey) -> PathKey {
        let mut out = base.clone();
        for seg in self.segments() {
            out = out.join(seg);
        }
        out
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        PathKey::new(s)
    }
}

/// Error from path computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The target is not a descendant of the chosen root.
    Unreachable { target: NodeId, root: NodeId },
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable { target, root } => {
                write!(f, "node {} is not a descendant of root {}", target, root)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Path of `target` relative to `root`, walking parent links upward.
pub fn compute_path(scene: &Scene, root: NodeId, target: NodeId) -> Result<PathKey, PathError> {
    let mut names: Vec<&str> = Vec::new();
    let mut cursor = Some(target);
    while let Some(current) = cursor {
        if current == root {
            names.reverse();
            return Ok(PathKey(names.join("/")));
        }
        if !scene.contains(current) {
            break;
        }
        names.push(scene.name(current));
        cursor = scene.parent(current);
    }
    Err(PathError::Unreachable { target, root })
}

/// Find the node at `path` under `root`. Missing segments yield `None`:
/// a deleted or renamed object is an expected condition, not an error.
///
/// When siblings share a name the first one in child order wins.
pub fn resolve_path(scene: &Scene, root: NodeId, path: &PathKey) -> Option<NodeId> {
    if !scene.contains(root) {
        return None;
    }
    let mut current = root;
    for seg in path.segments() {
        current = scene.find_child(current, seg)?;
    }
    Some(current)
}

/// Prefixes of `path` at which more than one sibling carries the segment's
/// name. Resolution stops at the first missing segment.
pub fn ambiguous_segments(scene: &Scene, root: NodeId, path: &PathKey) -> Vec<PathKey> {
    let mut out = Vec::new();
    if !scene.contains(root) {
        return out;
    }
    let mut current = root;
    let mut prefix = PathKey::root();
    for seg in path.segments() {
        prefix = prefix.join(seg);
        let matches = scene
            .children(current)
            .iter()
            .filter(|&&c| scene.name(c) == seg)
            .count();
        if matches > 1 {
            out.push(prefix.clone());
        }
        match scene.find_child(current, seg) {
            Some(next) => current = next,
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Scene, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let outfits = scene.add_child(root, "Outfits");
        let shirt = scene.add_mesh(outfits, "Shirt");
        (scene, root, outfits, shirt)
    }

    #[test]
    fn compute_path_joins_names_below_root() {
        let (scene, root, outfits, shirt) = sample();
        assert_eq!(compute_path(&scene, root, shirt).unwrap().as_str(), "Outfits/Shirt");
        assert_eq!(compute_path(&scene, outfits, shirt).unwrap().as_str(), "Shirt");
        assert!(compute_path(&scene, root, root).unwrap().is_root());
    }

    #[test]
    fn compute_path_rejects_non_descendant() {
        let (mut scene, root, outfits, _) = sample();
        let other = scene.add_child(root, "Props");
        let err = compute_path(&scene, outfits, other).unwrap_err();
        assert_eq!(err, PathError::Unreachable { target: other, root: outfits });
    }

    #[test]
    fn resolve_path_round_trips_compute_path() {
        let (scene, root, _, shirt) = sample();
        let path = compute_path(&scene, root, shirt).unwrap();
        assert_eq!(resolve_path(&scene, root, &path), Some(shirt));
        assert_eq!(resolve_path(&scene, root, &PathKey::root()), Some(root));
    }

    #[test]
    fn resolve_missing_segment_is_none() {
        let (scene, root, _, _) = sample();
        assert_eq!(resolve_path(&scene, root, &"Outfits/Jacket".into()), None);
        assert_eq!(resolve_path(&scene, root, &"Gone/Shirt".into()), None);
    }

    #[test]
    fn duplicate_siblings_resolve_to_first_and_are_reported() {
        let (mut scene, root, outfits, shirt) = sample();
        let _dup = scene.add_mesh(outfits, "Shirt");
        let path: PathKey = "Outfits/Shirt".into();
        assert_eq!(resolve_path(&scene, root, &path), Some(shirt));
        assert_eq!(ambiguous_segments(&scene, root, &path), vec![path.clone()]);
        assert!(ambiguous_segments(&scene, root, &"Outfits".into()).is_empty());
    }

    #[test]
    fn path_key_helpers() {
        let p: PathKey = "Outfits/Tops/Shirt".into();
        assert_eq!(p.parent().unwrap().as_str(), "Outfits/Tops");
        assert_eq!(PathKey::from("Outfits").parent(), Some(PathKey::root()));
        assert_eq!(PathKey::root().parent(), None);
        assert_eq!(PathKey::root().join("A").join("B").as_str(), "A/B");
        assert_eq!(PathKey::from("Shirt").rebase(&"Outfits/Tops".into()), p);
    }
}
