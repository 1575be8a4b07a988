//! Integration tests for editing sessions (desk-core).
//!
//! Drives the layout store through realistic sequences and checks history,
//! mount consistency and file-backed autosave.

use desk_core::{
    Coord3, FileAutosave, ItemId, ItemKind, ItemPatch, LayoutDocument, LayoutStore,
    ModelRegistry, StoreError,
};

/// A store with a fresh, empty layout.
fn fresh_store() -> LayoutStore {
    let mut store = LayoutStore::default();
    store.new_layout("Integration");
    store
}

// ==========================================================================
// Worked example
// ==========================================================================

#[test]
fn test_worked_example_session() {
    let mut store = fresh_store();

    let desk = store.add(ItemKind::DeskRect).expect("desk");
    assert_eq!(store.history().index(), Some(0));

    let monitor = store.add(ItemKind::Monitor).expect("monitor");
    assert_eq!(store.history().index(), Some(1));
    let desk_height = store
        .get(&desk)
        .and_then(|d| d.params.f32("height"))
        .expect("desk height");
    let monitor_y = store.get(&monitor).expect("monitor").position.y;
    assert!((monitor_y - desk_height).abs() < 1e-6);

    // A monitor is not a host.
    assert_eq!(
        store.mount(&monitor, &desk),
        Err(StoreError::NotMountHost(monitor.clone()))
    );
    assert_eq!(store.history().index(), Some(1));

    let stand = store.add(ItemKind::UniversalStand).expect("stand");
    let laptop = store.add(ItemKind::Macbook).expect("laptop");
    store.mount(&stand, &laptop).expect("mount");
    assert_eq!(store.history().index(), Some(4));
    assert_eq!(
        store.get(&laptop).and_then(|l| l.mounted_to_id.clone()),
        Some(stand.clone())
    );
    assert_eq!(
        store.get(&stand).and_then(|s| s.params.mounted_item_id()),
        Some(laptop.clone())
    );

    assert!(store.undo());
    assert_eq!(store.history().index(), Some(3));
    assert!(!store.get(&laptop).expect("laptop").is_mounted());
    assert!(store
        .get(&stand)
        .expect("stand")
        .params
        .mounted_item_id()
        .is_none());

    store.delete(&desk).expect("delete desk");
    assert!(store.document().is_empty());
}

// ==========================================================================
// History properties
// ==========================================================================

#[test]
fn test_undo_n_then_redo_n_is_identity() {
    let mut store = fresh_store();
    store.add(ItemKind::DeskL).expect("desk");
    let keyboard = store.add(ItemKind::Keyboard).expect("keyboard");
    store
        .update(&keyboard, ItemPatch::new().position(Coord3::new(0.3, 0.75, 0.2)))
        .expect("move");
    let stand = store.add(ItemKind::MonitorArm).expect("arm");
    let monitor = store.add(ItemKind::Monitor).expect("monitor");
    store.mount(&stand, &monitor).expect("mount");
    store.rename("Corner office");

    let final_state = store.document().clone();
    let steps = store.history().index().expect("index");

    for _ in 0..steps {
        assert!(store.undo());
    }
    assert!(!store.undo());
    for _ in 0..steps {
        assert!(store.redo());
    }
    assert!(!store.redo());
    assert_eq!(store.document(), &final_state);
}

#[test]
fn test_branch_truncation_disables_redo() {
    let mut store = fresh_store();
    store.add(ItemKind::Mouse).expect("mouse");
    store.add(ItemKind::Keyboard).expect("keyboard");
    assert!(store.undo());

    store.add(ItemKind::Phone).expect("phone");
    assert!(!store.history().can_redo());
    assert!(!store.redo());
    let kinds: Vec<_> = store.document().items.iter().map(|i| i.kind).collect();
    assert_eq!(kinds, vec![ItemKind::Mouse, ItemKind::Phone]);
}

#[test]
fn test_mount_then_unmount_round_trip() {
    let mut store = fresh_store();
    let stand = store.add(ItemKind::RoundBaseStand).expect("stand");
    let tablet = store.add(ItemKind::Tablet).expect("tablet");
    let before = store.document().clone();

    store.mount(&stand, &tablet).expect("mount");
    store.unmount(&stand).expect("unmount");

    // Everything but the relocated position matches the pre-mount state.
    let mut after = store.document().clone();
    let relocated = after
        .items
        .iter_mut()
        .find(|i| i.id == tablet)
        .expect("tablet");
    relocated.position = before.get(&tablet).expect("tablet").position;
    assert_eq!(after, before);
    store
        .document()
        .validate(store.registry())
        .expect("consistent");
}

// ==========================================================================
// Autosave
// ==========================================================================

#[test]
fn test_file_autosave_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let slot = FileAutosave::new(dir.path()).expect("slot");
        let mut store = LayoutStore::default().with_autosave(Box::new(slot));
        store.new_layout("Persisted");
        store.add(ItemKind::DeskRect).expect("desk");
        store.add(ItemKind::TableLight).expect("lamp");
    }

    let slot = FileAutosave::new(dir.path()).expect("slot");
    let mut store = LayoutStore::default().with_autosave(Box::new(slot));
    assert!(store.restore_autosave());
    assert_eq!(store.document().document_name, "Persisted");
    assert_eq!(store.document().len(), 2);
    assert!(!store.history().can_undo());
}

#[test]
fn test_corrupt_autosave_file_is_cleared() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = FileAutosave::new(dir.path()).expect("slot");
    std::fs::write(slot.path(), "{\"items\": [").expect("write corrupt file");
    let path = slot.path().to_path_buf();

    let mut store = LayoutStore::default().with_autosave(Box::new(slot));
    assert!(!store.restore_autosave());
    assert!(!path.exists());
    assert!(store.document().is_empty());
}

#[test]
fn test_export_import_round_trip() {
    let mut store = fresh_store();
    store.add(ItemKind::DeskRect).expect("desk");
    let stand = store.add(ItemKind::UniversalStand).expect("stand");
    let phone = store.add(ItemKind::Phone).expect("phone");
    store.mount(&stand, &phone).expect("mount");
    let json = store.export_json().expect("export");

    let mut other = LayoutStore::default();
    other.import_json(&json).expect("import");
    assert_eq!(other.document(), store.document());
    assert_eq!(
        LayoutDocument::from_json(&json).expect("parse"),
        *store.document()
    );
}

// ==========================================================================
// Layout files from older releases
// ==========================================================================

const OLDER_LAYOUT: &str = r##"{
    "sceneName": "Studio",
    "objects": [
        {"id": "desk", "type": "desk-rect",
         "position": {"x": 0, "y": 0, "z": 0}, "rotation": {"x": 0, "y": 0, "z": 0},
         "mountedToId": null,
         "params": {"width": 1.4, "depth": 0.7, "height": 0.75, "color": "#8B4513", "showLegs": true}},
        {"id": "kb-full", "type": "keyboard-108",
         "position": {"x": -0.3, "y": 0.75, "z": 0.2}, "rotation": {"x": 0, "y": 0, "z": 0},
         "mountedToId": null,
         "params": {"width": 0.44, "height": 0.02, "depth": 0.14, "isBlack": true}},
        {"id": "kb-tkl", "type": "keyboard-87",
         "position": {"x": 0.3, "y": 0.75, "z": 0.2}, "rotation": {"x": 0, "y": 15, "z": 0},
         "mountedToId": null,
         "params": {"width": 0.36, "height": 0.02, "depth": 0.14, "isBlack": true}},
        {"id": "tower", "type": "pc_case",
         "position": {"x": 0.8, "y": 0, "z": 0}, "rotation": {"x": 0, "y": 0, "z": 0},
         "mountedToId": null,
         "params": {"name": "", "preset": "atx", "width": 0.2, "height": 0.45, "depth": 0.4,
                    "color": "#2b2b2b", "isMountable": true}},
        {"id": "stand", "type": "rectangle-base-stand",
         "position": {"x": 0, "y": 0.75, "z": -0.2}, "rotation": {"x": 0, "y": 0, "z": 0},
         "mountedToId": null,
         "params": {"baseWidth": 0.2, "baseDepth": 0.15, "baseHeight": 0.015, "poleHeight": 0.25,
                    "pivotRadius": 0.02, "tiltX": 0, "color": "#666666", "mountedObjectId": "panel"}},
        {"id": "panel", "type": "monitor-without-stand",
         "position": {"x": 0, "y": 0, "z": 0}, "rotation": {"x": 0, "y": 0, "z": 0},
         "mountedToId": "stand",
         "params": {"width": 0.54, "height": 0.32, "depth": 0.03, "color": "#333333",
                    "curvatureR": 0, "isMountable": true}},
        {"id": "riser", "type": "monitor-riser",
         "position": {"x": 0.4, "y": 0.75, "z": -0.2}, "rotation": {"x": 0, "y": 0, "z": 0},
         "mountedToId": null,
         "params": {"name": "", "width": 0.5, "depth": 0.255, "height": 0.07,
                    "panelThickness": 0.02, "color": "#eeeeee", "isMountable": false}}
    ]
}"##;

#[test]
fn test_import_older_layout_with_extended_kinds() {
    let mut store = fresh_store();
    store.import_json(OLDER_LAYOUT).expect("import");

    let document = store.document();
    assert_eq!(document.document_name, "Studio");
    let kinds: Vec<ItemKind> = document.items.iter().map(|item| item.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ItemKind::DeskRect,
            ItemKind::Keyboard,
            ItemKind::Keyboard87,
            ItemKind::PcCase,
            ItemKind::RectangleBaseStand,
            ItemKind::MonitorWithoutStand,
            ItemKind::MonitorRiser,
        ]
    );

    let stand = ItemId::from("stand");
    let panel = ItemId::from("panel");
    assert_eq!(
        store.get(&stand).and_then(|s| s.params.mounted_item_id()),
        Some(panel.clone())
    );

    let registry = ModelRegistry::with_builtin();
    for item in &document.items {
        let tree = registry.build(item).expect("older item builds");
        assert!(tree.mesh_count() > 0, "{} built nothing", item.kind);
    }

    // Saving writes the current tags; the layout reads back unchanged.
    let json = store.export_json().expect("export");
    assert!(json.contains("\"keyboard-87\""));
    assert!(json.contains("\"pc-case\""));
    assert!(!json.contains("sceneName"));
    assert!(!json.contains("mountedObjectId"));
    let mut reloaded = LayoutStore::default();
    reloaded.import_json(&json).expect("reimport");
    assert_eq!(reloaded.document(), store.document());

    store.unmount(&stand).expect("unmount");
    assert!(!store.get(&panel).expect("panel").is_mounted());
}
