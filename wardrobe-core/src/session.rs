//! `Wardrobe`: one avatar's slot store bound to its database.
//!
//! Mutations are applied to a copy of the store and written in one
//! transaction; only a successful save replaces the in-memory store.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use rusqlite::Connection;
use wardrobe_types::{
    collect_candidates, compute_path, resolve_path, suggest_root, validate, AssetRef, AvatarId,
    CaptureOutcome, Controller, Finding, Menu, NodeId, PathKey, Scene, SlotError, SlotStore,
    ValidationInput, Vocabulary,
};

use crate::config::Config;
use crate::host::{HostError, ParameterHost, StateMachineHost};
use crate::persistence::{self, StoreError};
use crate::pipeline::{apply_report, compile_outfits, CompileError, CompileReport};

#[derive(Debug)]
pub enum WardrobeError {
    Store(StoreError),
    Slot(SlotError),
    Compile(CompileError),
    Host(HostError),
}

impl fmt::Display for WardrobeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{}", e),
            Self::Slot(e) => write!(f, "{}", e),
            Self::Compile(e) => write!(f, "compile failed: {}", e),
            Self::Host(e) => write!(f, "host rejected update: {}", e),
        }
    }
}

impl std::error::Error for WardrobeError {}

impl From<StoreError> for WardrobeError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<SlotError> for WardrobeError {
    fn from(e: SlotError) -> Self {
        Self::Slot(e)
    }
}

impl From<CompileError> for WardrobeError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<HostError> for WardrobeError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

pub struct Wardrobe {
    conn: Connection,
    store: SlotStore,
    config: Config,
    vocabulary: Vocabulary,
}

impl Wardrobe {
    /// Open the database at `path` and load (or create) the avatar's store.
    pub fn open(path: &Path, avatar: AvatarId, config: Config) -> Result<Self, WardrobeError> {
        let conn = persistence::open_database(path)?;
        let store = persistence::load_or_create(&conn, &avatar)?;
        let vocabulary = config.vocabulary();
        Ok(Self {
            conn,
            store,
            config,
            vocabulary,
        })
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Folder the classifier scans: the stored hint, or its nearest
    /// resolvable ancestor below the root, else the suggested wardrobe
    /// folder, else the scene root.
    pub fn scan_root(&self, scene: &Scene) -> NodeId {
        if let Some(hint) = self.store.root_hint() {
            let mut cursor = Some(hint.clone());
            while let Some(path) = cursor {
                if path.is_root() && !hint.is_root() {
                    break;
                }
                if let Some(node) = resolve_path(scene, scene.root(), &path) {
                    if &path != hint {
                        log::warn!(target: "slots", "root hint '{}' no longer resolves, using '{}'", hint, path);
                    }
                    return node;
                }
                cursor = path.parent();
            }
            log::warn!(target: "slots", "root hint '{}' no longer resolves", hint);
        }
        suggest_root(scene, &self.vocabulary).unwrap_or_else(|| scene.root())
    }

    /// Candidate outfit parts under the scan root, as paths from the
    /// hierarchy root.
    pub fn scan(&self, scene: &Scene) -> BTreeSet<PathKey> {
        anchored_candidates(scene, self.scan_root(scene), &self.vocabulary)
    }

    fn commit(&mut self, next: SlotStore) -> Result<(), WardrobeError> {
        persistence::save_store(&self.conn, &next)?;
        self.store = next;
        Ok(())
    }

    /// Record `tracked` (paths from the hierarchy root) into slot `index`.
    pub fn capture<I>(
        &mut self,
        index: usize,
        scene: &Scene,
        tracked: I,
    ) -> Result<CaptureOutcome, WardrobeError>
    where
        I: IntoIterator<Item = PathKey>,
    {
        let mut next = self.store.clone();
        let outcome = next.capture(index, scene, scene.root(), tracked)?;
        self.commit(next)?;
        Ok(outcome)
    }

    /// Capture every candidate the classifier finds under the scan root.
    pub fn capture_candidates(
        &mut self,
        index: usize,
        scene: &Scene,
    ) -> Result<CaptureOutcome, WardrobeError> {
        let candidates = self.scan(scene);
        self.capture(index, scene, candidates)
    }

    pub fn clear(&mut self, index: usize) -> Result<(), WardrobeError> {
        let mut next = self.store.clone();
        next.clear(index)?;
        self.commit(next)
    }

    pub fn rename(&mut self, index: usize, name: &str) -> Result<(), WardrobeError> {
        let mut next = self.store.clone();
        next.rename(index, name)?;
        self.commit(next)
    }

    pub fn set_icon(&mut self, index: usize, icon: Option<AssetRef>) -> Result<(), WardrobeError> {
        let mut next = self.store.clone();
        next.set_icon(index, icon)?;
        self.commit(next)
    }

    pub fn set_root_hint(&mut self, hint: Option<PathKey>) -> Result<(), WardrobeError> {
        let mut next = self.store.clone();
        next.set_root_hint(hint);
        self.commit(next)
    }

    /// Compile against the host's current controller and, on success, hand
    /// the result to the host.
    pub fn compile<H>(&self, scene: &Scene, host: &mut H) -> Result<CompileReport, WardrobeError>
    where
        H: StateMachineHost + ParameterHost,
    {
        let existing = host.controller()?;
        let report = compile_outfits(&self.store, scene, scene.root(), &existing, &self.config)?;
        apply_report(host, &report)?;
        Ok(report)
    }

    /// Cross-check the store against metadata the host already holds,
    /// without compiling anything.
    pub fn validate(&self, scene: &Scene, controller: &Controller, menu: Option<&Menu>) -> Vec<Finding> {
        let options = self.config.synthesis_options();
        validate(&ValidationInput {
            store: &self.store,
            parameter_name: &options.parameter_name,
            selector: controller.parameter(&options.parameter_name),
            menu,
            layer: controller.layer(&options.layer_name),
            scene: Some((scene, scene.root())),
        })
    }
}

/// [`collect_candidates`] under `scan_root`, re-anchored at the hierarchy root.
pub fn anchored_candidates(
    scene: &Scene,
    scan_root: NodeId,
    vocabulary: &Vocabulary,
) -> BTreeSet<PathKey> {
    let found = collect_candidates(scene, scan_root, vocabulary);
    match compute_path(scene, scene.root(), scan_root) {
        Ok(base) => found.iter().map(|p| p.rebase(&base)).collect(),
        Err(e) => {
            log::warn!(target: "classifier", "{}", e);
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use wardrobe_types::FindingCode;

    fn scene() -> Scene {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        scene.add_mesh(root, "Body");
        let outfits = scene.add_child(root, "Outfits");
        scene.add_mesh(outfits, "Shirt");
        scene.add_mesh(outfits, "Skirt");
        scene
    }

    fn open(dir: &tempfile::TempDir) -> Wardrobe {
        Wardrobe::open(&dir.path().join("w.sqlite"), AvatarId::new("a"), Config::default())
            .unwrap()
    }

    #[test]
    fn candidates_are_anchored_at_hierarchy_root() {
        let dir = tempfile::tempdir().unwrap();
        let wardrobe = open(&dir);
        let scene = scene();
        assert_eq!(scene.name(wardrobe.scan_root(&scene)), "Outfits");
        let found: Vec<String> = wardrobe.scan(&scene).iter().map(|p| p.to_string()).collect();
        assert_eq!(found, vec!["Outfits/Shirt", "Outfits/Skirt"]);
    }

    #[test]
    fn mutations_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("w.sqlite");
        let scene = scene();
        let avatar = AvatarId::new("guid-1");
        {
            let mut wardrobe = Wardrobe::open(&db, avatar.clone(), Config::default()).unwrap();
            let outcome = wardrobe.capture_candidates(2, &scene).unwrap();
            assert_eq!(outcome.resolved, 2);
            wardrobe.rename(2, "Picnic").unwrap();
            wardrobe.set_icon(2, Some(AssetRef::new("picnic.png"))).unwrap();
        }
        let wardrobe = Wardrobe::open(&db, avatar, Config::default()).unwrap();
        let slot = wardrobe.store().slot(2).unwrap();
        assert_eq!(slot.name, "Picnic");
        assert!(slot.configured);
        assert!(slot.tracked.contains(&PathKey::from("Outfits/Skirt")));
        assert_eq!(slot.icon, Some(AssetRef::new("picnic.png")));
    }

    #[test]
    fn failed_mutation_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut wardrobe = open(&dir);
        let before = wardrobe.store().clone();
        assert!(matches!(
            wardrobe.rename(0, "   "),
            Err(WardrobeError::Slot(SlotError::EmptyName { index: 0 }))
        ));
        assert!(matches!(
            wardrobe.clear(17),
            Err(WardrobeError::Slot(SlotError::IndexOutOfRange { index: 17 }))
        ));
        assert_eq!(wardrobe.store(), &before);
    }

    #[test]
    fn root_hint_wins_when_it_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let mut wardrobe = open(&dir);
        let scene = scene();
        wardrobe.set_root_hint(Some(PathKey::root())).unwrap();
        assert_eq!(wardrobe.scan_root(&scene), scene.root());
        wardrobe.set_root_hint(Some(PathKey::from("Gone"))).unwrap();
        assert_eq!(scene.name(wardrobe.scan_root(&scene)), "Outfits");
    }

    #[test]
    fn stale_root_hint_falls_back_to_nearest_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let mut wardrobe = open(&dir);
        let mut scene = scene();
        let costumes = scene.add_child(scene.root(), "Costumes");
        scene.add_mesh(costumes, "Cape");
        wardrobe
            .set_root_hint(Some(PathKey::from("Costumes/Retired/Set")))
            .unwrap();
        assert_eq!(wardrobe.scan_root(&scene), costumes);
        assert!(wardrobe.scan(&scene).contains(&PathKey::from("Costumes/Cape")));
    }

    #[test]
    fn compile_reaches_host_only_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut wardrobe = open(&dir);
        let scene = scene();
        wardrobe
            .capture(0, &scene, vec![PathKey::from("Outfits/Shirt")])
            .unwrap();

        let mut host = MemoryHost::new();
        host.fail_with("busy");
        assert!(matches!(
            wardrobe.compile(&scene, &mut host),
            Err(WardrobeError::Host(_))
        ));

        let mut host = MemoryHost::new();
        let report = wardrobe.compile(&scene, &mut host).unwrap();
        assert_eq!(host.current_controller(), &report.controller);
        assert_eq!(report.layer.slot_state_count(), 1);
    }

    #[test]
    fn validate_checks_the_supplied_controller() {
        let dir = tempfile::tempdir().unwrap();
        let mut wardrobe = open(&dir);
        let scene = scene();
        wardrobe
            .capture(0, &scene, vec![PathKey::from("Outfits/Shirt")])
            .unwrap();

        let codes: Vec<FindingCode> = wardrobe
            .validate(&scene, &Controller::default(), None)
            .into_iter()
            .map(|f| f.code)
            .collect();
        assert!(codes.contains(&FindingCode::SelectorMissing));
        assert!(codes.contains(&FindingCode::LayerMissing));
        assert!(codes.contains(&FindingCode::MenuEntryMissing { slot: 0 }));

        let mut host = MemoryHost::new();
        wardrobe.compile(&scene, &mut host).unwrap();
        let findings = wardrobe.validate(&scene, host.current_controller(), host.menu());
        assert!(findings.is_empty(), "{:?}", findings);
    }
}
