use std::collections::BTreeMap;

use frames::{Element, ElementKind, Stroke};

use super::*;

fn board(channel_id: &str) -> SessionSnapshot {
    SessionSnapshot {
        channel_id: channel_id.to_owned(),
        creator_id: "alice".to_owned(),
        elements: vec![Element {
            id: "e1".to_owned(),
            x: 1.0,
            y: 2.0,
            w: 3.0,
            h: 4.0,
            kind: ElementKind::Text { content: "hello".to_owned(), color: "#000".to_owned() },
        }],
        strokes: vec![Stroke { id: "s1".to_owned(), points: vec![[0.0, 0.0], [1.0, 1.0]], color: "#000".to_owned(), width: 2.0 }],
        permissions: BTreeMap::from([("bob".to_owned(), false)]),
        active_members: BTreeMap::new(),
    }
}

#[test]
fn file_store_saves_and_loads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileSnapshotStore::new(dir.path());
    store.save(&board("voice-1")).expect("save");
    assert!(dir.path().join("voice-1.json").exists());
    assert_eq!(store.load("voice-1").expect("load"), Some(board("voice-1")));
}

#[test]
fn file_store_missing_channel_is_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileSnapshotStore::new(dir.path().join("not-yet-created"));
    assert_eq!(store.load("voice-1").expect("load"), None);
    store.remove("voice-1").expect("remove of missing entry");
}

#[test]
fn file_store_save_replaces_previous() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileSnapshotStore::new(dir.path());
    store.save(&board("voice-1")).expect("save");
    let emptier = SessionSnapshot { strokes: Vec::new(), ..board("voice-1") };
    store.save(&emptier).expect("save");
    assert_eq!(store.load("voice-1").expect("load"), Some(emptier));
    assert!(!dir.path().join("voice-1.json.tmp").exists());
}

#[test]
fn file_store_remove_deletes_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileSnapshotStore::new(dir.path());
    store.save(&board("voice-1")).expect("save");
    store.remove("voice-1").expect("remove");
    assert_eq!(store.load("voice-1").expect("load"), None);
}

#[test]
fn channel_ids_are_sanitized_into_file_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileSnapshotStore::new(dir.path());
    store.save(&board("../guild/voice 1")).expect("save");
    assert!(dir.path().join("___guild_voice_1.json").exists());
    assert!(store.load("../guild/voice 1").expect("load").is_some());
}

#[test]
fn empty_channel_id_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileSnapshotStore::new(dir.path());
    assert!(matches!(store.save(&board("")), Err(SnapshotError::InvalidChannel(_))));
    assert!(matches!(MemorySnapshotStore::new().save(&board("")), Err(SnapshotError::InvalidChannel(_))));
}

#[test]
fn corrupt_file_is_encoding_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("voice-1.json"), b"{not json").expect("write");
    let store = FileSnapshotStore::new(dir.path());
    assert!(matches!(store.load("voice-1"), Err(SnapshotError::Encoding(_))));
}

#[test]
fn memory_store_round_trip_and_remove() {
    let store = MemorySnapshotStore::new();
    assert_eq!(store.load("voice-1").expect("load"), None);
    store.save(&board("voice-1")).expect("save");
    assert_eq!(store.load("voice-1").expect("load"), Some(board("voice-1")));
    store.remove("voice-1").expect("remove");
    assert_eq!(store.load("voice-1").expect("load"), None);
}
