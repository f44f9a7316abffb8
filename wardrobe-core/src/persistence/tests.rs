#[cfg(test)]
mod tests {
    use crate::persistence::{
        delete_store, list_avatars, load_or_create, load_store, open_database, read_json,
        save_store, schema, write_json,
    };
    use rusqlite::params;
    use wardrobe_types::{AssetRef, AvatarId, PathKey, Scene, SlotStore, SLOT_COUNT};

    fn temp_db() -> (tempfile::TempDir, rusqlite::Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_database(&dir.path().join("slots.sqlite")).unwrap();
        (dir, conn)
    }

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("Avatar");
        let root = scene.root();
        let outfits = scene.add_child(root, "Outfits");
        let shirt = scene.add_mesh(outfits, "Shirt");
        let jacket = scene.add_mesh(outfits, "Jacket");
        scene.set_active(jacket, false);
        scene
            .node_mut(shirt)
            .unwrap()
            .blend_weights
            .insert("Tuck".to_string(), 40.0);
        scene
    }

    #[test]
    fn save_and_load_round_trip() {
        let (_dir, conn) = temp_db();
        let scene = sample_scene();
        let root = scene.root();

        let mut store = SlotStore::new(AvatarId::new("avatar-1"));
        store.rename(0, "Casual").unwrap();
        store
            .capture(0, &scene, root, vec!["Outfits/Shirt".into(), "Outfits/Jacket".into()])
            .unwrap();
        store.set_icon(0, Some(AssetRef::new("icons/casual.png"))).unwrap();
        store.capture(3, &scene, root, vec!["Outfits/Jacket".into()]).unwrap();
        store.set_root_hint(Some(PathKey::from("Outfits")));

        save_store(&conn, &store).unwrap();
        let loaded = load_store(&conn, store.avatar()).unwrap().unwrap();
        assert_eq!(loaded, store);
        assert_eq!(
            loaded.slot(0).unwrap().states[1].continuous.get("Tuck"),
            Some(&40.0)
        );
    }

    #[test]
    fn resave_replaces_previous_rows() {
        let (_dir, conn) = temp_db();
        let scene = sample_scene();
        let root = scene.root();
        let mut store = SlotStore::new(AvatarId::new("a"));
        store.capture(1, &scene, root, vec!["Outfits/Shirt".into()]).unwrap();
        save_store(&conn, &store).unwrap();

        store.clear(1).unwrap();
        save_store(&conn, &store).unwrap();

        let loaded = load_store(&conn, store.avatar()).unwrap().unwrap();
        assert!(!loaded.any_configured());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM slot_states", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn stores_are_isolated_per_avatar() {
        let (_dir, conn) = temp_db();
        let scene = sample_scene();
        let root = scene.root();

        let mut first = SlotStore::new(AvatarId::new("first"));
        first.capture(0, &scene, root, vec!["Outfits/Shirt".into()]).unwrap();
        let second = SlotStore::new(AvatarId::new("second"));
        save_store(&conn, &first).unwrap();
        save_store(&conn, &second).unwrap();

        assert_eq!(
            list_avatars(&conn).unwrap(),
            vec![AvatarId::new("first"), AvatarId::new("second")]
        );
        assert!(delete_store(&conn, second.avatar()).unwrap());
        assert!(!delete_store(&conn, second.avatar()).unwrap());
        assert_eq!(load_store(&conn, first.avatar()).unwrap().unwrap(), first);
        assert!(load_store(&conn, second.avatar()).unwrap().is_none());
    }

    #[test]
    fn load_or_create_persists_an_empty_store() {
        let (_dir, conn) = temp_db();
        let avatar = AvatarId::new("fresh");
        assert!(load_store(&conn, &avatar).unwrap().is_none());

        let store = load_or_create(&conn, &avatar).unwrap();
        assert_eq!(store.slots().len(), SLOT_COUNT);
        assert!(!store.any_configured());
        assert_eq!(load_store(&conn, &avatar).unwrap().unwrap(), store);
    }

    #[test]
    fn legacy_rows_are_repaired_on_load() {
        let (_dir, conn) = temp_db();
        // Two slots only, states without tracked paths.
        conn.execute(
            "INSERT INTO stores (avatar_id, root_hint, updated_at) VALUES ('old', NULL, datetime('now'))",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO slots (avatar_id, slot_index, name, configured, icon) VALUES ('old', 0, 'Summer', 1, NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO slots (avatar_id, slot_index, name, configured, icon) VALUES ('old', 1, '', 0, NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO slot_states (avatar_id, slot_index, position, path, active) VALUES (?1, ?2, ?3, ?4, ?5)",
            params!["old", 0, 0, "Outfits/Shirt", 1],
        )
        .unwrap();

        let store = load_store(&conn, &AvatarId::new("old")).unwrap().unwrap();
        assert_eq!(store.slots().len(), SLOT_COUNT);
        let summer = store.slot(0).unwrap();
        assert!(summer.tracked.contains(&PathKey::from("Outfits/Shirt")));
        assert!(summer.is_active(&PathKey::from("Outfits/Shirt")));
        assert_eq!(store.slot(1).unwrap().name, "Outfit 2");
    }

    #[test]
    fn schema_version_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.sqlite");
        drop(open_database(&path).unwrap());
        let conn = open_database(&path).unwrap();
        assert_eq!(schema::latest_version(&conn).unwrap(), Some(schema::SCHEMA_VERSION));
        assert_eq!(schema::SCHEMA_VERSION, 1);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn json_documents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let snapshot = sample_scene().to_snapshot();
        write_json(&path, &snapshot).unwrap();
        let back: wardrobe_types::SceneSnapshot = read_json(&path).unwrap();
        assert_eq!(Scene::from_snapshot(&back).to_snapshot(), snapshot);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_json::<wardrobe_types::SceneSnapshot>(&path),
            Err(crate::persistence::StoreError::Json(_))
        ));
    }
}
