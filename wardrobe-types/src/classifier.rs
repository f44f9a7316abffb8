//! Heuristic discovery of toggleable outfit parts.
//!
//! The classifier is a set of pure functions over a declarative [`Vocabulary`],
//! so every rule can be tested against a hand-built scene.

use std::collections::BTreeSet;

use regex::Regex;

use crate::path::{compute_path, PathKey};
use crate::scene::{NodeId, Scene};

const SYSTEM_KEYWORDS: &[&str] = &[
    "armature",
    "physbone",
    "collider",
    "contact",
    "constraint",
    "editoronly",
];

/// Matched against the whole name or a whole name token.
const BODY_TERMS: &[&str] = &["body", "head", "hair", "eyes", "teeth", "tongue"];

const CLOTHING_TERMS: &[&str] = &[
    "cloth", "outfit", "costume", "uniform", "wear", "accessor",
    "shirt", "top", "jacket", "coat", "hoodie", "sweater", "vest", "dress", "skirt",
    "pants", "jeans", "shorts", "trousers", "leggings", "socks", "stocking",
    "shoe", "boot", "sneaker", "heels", "sandal", "hat", "beanie", "glove",
    "scarf", "belt", "bag", "necklace", "earring", "bracelet", "glasses", "mask",
    "cape", "armor", "bikini", "swimsuit", "kimono", "underwear",
];

const CONTAINER_TERMS: &[&str] = &["outfit", "cloth", "wardrobe", "costume"];

/// Word lists driving the classifier. Keyword lists hold lowercase terms.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Substrings marking system infrastructure; matching nodes are skipped.
    pub system_keywords: Vec<String>,
    /// Body parts that are never outfit candidates.
    pub body_terms: Vec<String>,
    /// Substrings that mark a clothing item.
    pub clothing_terms: Vec<String>,
    /// Folder names that mark a wardrobe container (default-root detection).
    pub container_terms: Vec<String>,
    /// Extra skip rules supplied by the user.
    pub exclude_patterns: Vec<Regex>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        fn owned(terms: &[&str]) -> Vec<String> {
            terms.iter().map(|t| t.to_string()).collect()
        }
        Self {
            system_keywords: owned(SYSTEM_KEYWORDS),
            body_terms: owned(BODY_TERMS),
            clothing_terms: owned(CLOTHING_TERMS),
            container_terms: owned(CONTAINER_TERMS),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Vocabulary {
    pub fn add_system_keywords<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_lowercase(&mut self.system_keywords, terms);
    }

    pub fn add_body_terms<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_lowercase(&mut self.body_terms, terms);
    }

    pub fn add_clothing_terms<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_lowercase(&mut self.clothing_terms, terms);
    }

    /// Compile and append a skip pattern.
    pub fn add_exclude_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.exclude_patterns.push(Regex::new(pattern)?);
        Ok(())
    }

    fn is_system(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.system_keywords.iter().any(|k| lower.contains(k.as_str()))
            || self.exclude_patterns.iter().any(|re| re.is_match(name))
    }

    fn is_body(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.body_terms.iter().any(|term| {
            lower == *term
                || lower
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|token| token == term)
        })
    }

    fn is_clothing(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.clothing_terms.iter().any(|t| lower.contains(t.as_str()))
    }

    fn is_container(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.container_terms.iter().any(|t| lower.contains(t.as_str()))
    }
}

fn push_lowercase<I, S>(list: &mut Vec<String>, terms: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for term in terms {
        let term = term.as_ref().trim().to_lowercase();
        if !term.is_empty() && !list.contains(&term) {
            list.push(term);
        }
    }
}

fn looks_like_clothing(vocab: &Vocabulary, name: &str) -> bool {
    name.contains('-') || vocab.is_clothing(name)
}

/// Whether the node itself is excluded from classification.
/// Its children are still visited: skip is not prune.
pub fn should_skip_subtree(scene: &Scene, node: NodeId, vocab: &Vocabulary) -> bool {
    match scene.node(node) {
        Some(n) => n.flags.any() || vocab.is_system(&n.name),
        None => true,
    }
}

/// Whether the node looks like a wearable part under `scan_root`.
pub fn is_likely_outfit_node(
    scene: &Scene,
    scan_root: NodeId,
    node: NodeId,
    vocab: &Vocabulary,
) -> bool {
    if node == scan_root || !scene.contains(node) {
        return false;
    }
    let name = scene.name(node);
    if vocab.is_body(name) {
        return false;
    }
    if looks_like_clothing(vocab, name) {
        return true;
    }
    // Folder pattern: a container whose children look like clothing.
    if scene
        .children(node)
        .iter()
        .any(|&c| looks_like_clothing(vocab, scene.name(c)))
    {
        return true;
    }
    match scene.parent(node) {
        Some(parent) if parent == scan_root => true,
        Some(parent) => vocab.is_clothing(scene.name(parent)),
        None => false,
    }
}

/// Paths (relative to `root`) of every node under `root` that looks toggleable.
///
/// Traversal is depth-first; a collected container is still descended into,
/// so a folder and its contents may both qualify.
pub fn collect_candidates(scene: &Scene, root: NodeId, vocab: &Vocabulary) -> BTreeSet<PathKey> {
    let mut found = BTreeSet::new();
    let mut skipped = 0usize;
    for node in scene.descendants(root) {
        if should_skip_subtree(scene, node, vocab) {
            skipped += 1;
            continue;
        }
        if is_likely_outfit_node(scene, root, node, vocab) {
            if let Ok(path) = compute_path(scene, root, node) {
                found.insert(path);
            }
        }
    }
    log::debug!(
        target: "classifier",
        "scan of '{}' found {} candidates ({} nodes skipped)",
        scene.name(root),
        found.len(),
        skipped
    );
    found
}

/// Descendants that carry a renderable surface or have children of their own.
pub fn count_toggleable(scene: &Scene, node: NodeId) -> usize {
    scene
        .descendants(node)
        .into_iter()
        .filter(|&d| {
            scene
                .node(d)
                .map(|n| n.renderable || !n.children.is_empty())
                .unwrap_or(false)
        })
        .count()
}

/// Guess the folder holding the avatar's outfits.
///
/// Prefers a direct child of the scene root named like a wardrobe container;
/// otherwise the non-system, non-body child with the most toggleable
/// descendants (first in child order on ties).
pub fn suggest_root(scene: &Scene, vocab: &Vocabulary) -> Option<NodeId> {
    let root = scene.root();
    let children = scene.children(root);

    if let Some(&named) = children.iter().find(|&&c| {
        !should_skip_subtree(scene, c, vocab) && vocab.is_container(scene.name(c))
    }) {
        return Some(named);
    }

    let mut best: Option<(NodeId, usize)> = None;
    for &child in children {
        if should_skip_subtree(scene, child, vocab) || vocab.is_body(scene.name(child)) {
            continue;
        }
        let count = count_toggleable(scene, child);
        if count == 0 {
            continue;
        }
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((child, count));
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::default()
    }

    #[test]
    fn skip_but_recurse() {
        // Avatar -> A -> B(excluded) -> C(qualifies)
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let a = scene.add_child(root, "A");
        let b = scene.add_child(a, "B");
        scene.node_mut(b).unwrap().flags.editor_only = true;
        let _c = scene.add_mesh(b, "Shirt");

        let found = collect_candidates(&scene, root, &vocab());
        assert!(found.contains(&PathKey::from("A/B/Shirt")));
        assert!(!found.contains(&PathKey::from("A/B")));
    }

    #[test]
    fn system_keyword_skips_node_only() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let armature = scene.add_child(root, "Armature");
        let hips = scene.add_child(armature, "Hips");
        let _skirt = scene.add_mesh(hips, "Skirt-Frill");

        let found = collect_candidates(&scene, root, &vocab());
        assert!(!found.contains(&PathKey::from("Armature")));
        assert!(found.contains(&PathKey::from("Armature/Hips/Skirt-Frill")));
        assert!(should_skip_subtree(&scene, armature, &vocab()));
        assert!(!should_skip_subtree(&scene, hips, &vocab()));
    }

    #[test]
    fn body_terms_match_whole_tokens() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let body = scene.add_mesh(root, "Body");
        let base = scene.add_mesh(root, "Body_Base");
        let hair = scene.add_mesh(root, "Hair Front");
        let suit = scene.add_mesh(root, "Bodysuit");
        let v = vocab();
        assert!(!is_likely_outfit_node(&scene, root, body, &v));
        assert!(!is_likely_outfit_node(&scene, root, base, &v));
        assert!(!is_likely_outfit_node(&scene, root, hair, &v));
        // Not a body token; accepted as a direct child of the scan root.
        assert!(is_likely_outfit_node(&scene, root, suit, &v));
    }

    #[test]
    fn name_rules() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let misc = scene.add_child(root, "Misc");
        let deep = scene.add_child(misc, "Deep");
        let tagged = scene.add_mesh(deep, "Ribbon-L");
        let jacket = scene.add_mesh(deep, "LeatherJacket");
        let plain = scene.add_mesh(deep, "Sphere");
        let v = vocab();
        assert!(is_likely_outfit_node(&scene, root, tagged, &v));
        assert!(is_likely_outfit_node(&scene, root, jacket, &v));
        assert!(!is_likely_outfit_node(&scene, root, plain, &v));
        // Folder whose child looks like clothing.
        assert!(is_likely_outfit_node(&scene, root, deep, &v));
    }

    #[test]
    fn parent_rules() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let props = scene.add_child(root, "Props");
        let inner = scene.add_child(props, "Inner");
        let gem = scene.add_mesh(inner, "Gem");
        let shoes = scene.add_child(inner, "Shoes");
        let lace = scene.add_mesh(shoes, "Lace");
        let v = vocab();
        assert!(is_likely_outfit_node(&scene, root, props, &v));
        assert!(!is_likely_outfit_node(&scene, root, gem, &v));
        assert!(is_likely_outfit_node(&scene, root, lace, &v));
        assert!(!is_likely_outfit_node(&scene, root, root, &v));
    }

    #[test]
    fn exclude_pattern_skips_matching_nodes() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let hidden = scene.add_child(root, "_Internal");
        let _coat = scene.add_mesh(hidden, "Coat");
        let mut v = vocab();
        v.add_exclude_pattern("^_").unwrap();
        let found = collect_candidates(&scene, root, &v);
        assert!(!found.contains(&PathKey::from("_Internal")));
        assert!(found.contains(&PathKey::from("_Internal/Coat")));
        assert!(v.add_exclude_pattern("(").is_err());
    }

    #[test]
    fn count_and_suggest_root() {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let _body = scene.add_mesh(root, "Body");
        let armature = scene.add_child(root, "Armature");
        let hips = scene.add_child(armature, "Hips");
        scene.add_child(hips, "Spine");
        let props = scene.add_child(root, "Props");
        let set = scene.add_child(props, "Set");
        scene.add_mesh(set, "Gem");
        scene.add_mesh(set, "Crown");

        assert_eq!(count_toggleable(&scene, props), 3);
        assert_eq!(suggest_root(&scene, &vocab()), Some(props));

        let outfits = scene.add_child(root, "My Outfits");
        assert_eq!(suggest_root(&scene, &vocab()), Some(outfits));
    }

    #[test]
    fn extra_terms_are_lowercased_and_deduplicated() {
        let mut v = vocab();
        let before = v.clothing_terms.len();
        v.add_clothing_terms(["Tabard", "tabard", "  "]);
        assert_eq!(v.clothing_terms.len(), before + 1);
        assert!(v.is_clothing("Knight TABARD"));
    }
}
