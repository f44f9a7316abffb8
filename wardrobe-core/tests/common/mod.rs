#![allow(dead_code)]
//! Shared fixtures for wardrobe-core integration tests.

use std::path::PathBuf;

use wardrobe_core::session::Wardrobe;
use wardrobe_core::Config;
use wardrobe_types::{AvatarId, NodeId, Scene, SceneSnapshot};

/// Avatar with a body, an armature and an `Outfits` folder holding a shirt
/// (visible, with a tuck blend weight), a jacket (hidden) and a hat folder.
pub fn avatar_scene() -> Scene {
    let snapshot: SceneSnapshot = serde_json::from_str(
        r#"{
            "name": "Avatar",
            "children": [
                { "name": "Body", "renderable": true },
                { "name": "Armature", "children": [
                    { "name": "Hips", "children": [ { "name": "Spine" } ] }
                ] },
                { "name": "Outfits", "children": [
                    { "name": "Shirt", "renderable": true, "blend_weights": { "Tuck": 30.0 } },
                    { "name": "Jacket", "renderable": true, "active": false },
                    { "name": "Hats", "children": [
                        { "name": "Beanie", "renderable": true, "active": false }
                    ] }
                ] }
            ]
        }"#,
    )
    .expect("fixture scene");
    Scene::from_snapshot(&snapshot)
}

pub fn outfits_root(scene: &Scene) -> NodeId {
    scene
        .find_child(scene.root(), "Outfits")
        .expect("Outfits folder")
}

pub fn node(scene: &Scene, root: NodeId, path: &str) -> NodeId {
    wardrobe_types::resolve_path(scene, root, &path.into()).expect("node in fixture")
}

/// A fresh database in its own temporary directory.
pub struct TestDb {
    pub dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("wardrobe.sqlite");
        Self { dir, path }
    }

    pub fn open(&self, avatar: &str) -> Wardrobe {
        Wardrobe::open(&self.path, AvatarId::new(avatar), Config::default()).expect("open wardrobe")
    }
}
