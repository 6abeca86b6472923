use orgcircles_core::db::open_db_in_memory;
use orgcircles_core::model::{SequentialIdGenerator, SNAPSHOT_FORMAT_VERSION};
use orgcircles_core::repo::{HISTORY_LIMIT, StoreResult};
use orgcircles_core::{
    InMemorySnapshotStore, NodeKind, Organization, Snapshot, SnapshotError, SnapshotStore,
    SqliteSnapshotStore, StoreError,
};
use rusqlite::Connection;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn sample_org() -> Organization {
    let mut org = Organization::with_id_generator(Box::new(SequentialIdGenerator::new()));
    let root = org.root_id();
    let guild = org.insert_circle(root, "Guild", "crafts", "quality").unwrap();
    let steward = org.insert_role(guild, "Steward", "", "").unwrap();
    org.create_template("Facilitator", "runs meetings").unwrap();
    let ada = org.add_member("Ada", "").unwrap();
    org.assign(ada, steward);
    org
}

#[test]
fn sqlite_store_requires_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteSnapshotStore::try_new(&conn).err().unwrap();

    assert!(matches!(
        err,
        StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn sqlite_store_round_trips_snapshots() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteSnapshotStore::try_new(&conn).unwrap();
    assert!(store.load().unwrap().is_none());

    let snapshot = sample_org().to_snapshot();
    store.save(&snapshot).unwrap();

    assert_eq!(store.load().unwrap(), Some(snapshot.clone()));

    let mut renamed = snapshot.clone();
    renamed.tree.name = "Renamed".to_string();
    store.save(&renamed).unwrap();
    assert_eq!(store.load().unwrap().unwrap().tree.name, "Renamed");
}

#[test]
fn sqlite_history_is_capped() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteSnapshotStore::try_new(&conn).unwrap();
    let snapshot = sample_org().to_snapshot();

    for _ in 0..(HISTORY_LIMIT + 5) {
        store.save(&snapshot).unwrap();
    }

    let history = store.history(HISTORY_LIMIT * 2).unwrap();
    assert_eq!(history.len(), HISTORY_LIMIT as usize);
    assert!(history
        .iter()
        .all(|entry| entry.format_version == SNAPSHOT_FORMAT_VERSION));
    let stored_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM org_snapshot_history;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored_rows, i64::from(HISTORY_LIMIT));
}

#[test]
fn sqlite_history_records_millisecond_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteSnapshotStore::try_new(&conn).unwrap();

    let before = epoch_ms();
    store.save(&sample_org().to_snapshot()).unwrap();
    let after = epoch_ms();

    let saved_at = store.history(1).unwrap()[0].saved_at;
    assert!(
        saved_at >= before - 2 && saved_at <= after + 2,
        "saved_at {saved_at} outside [{before}, {after}]"
    );
    let current: i64 = conn
        .query_row(
            "SELECT saved_at FROM org_snapshots WHERE slot = 'current';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(current >= before - 2 && current <= after + 2);
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[test]
fn sqlite_store_reports_corrupt_payload() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO org_snapshots (slot, format_version, payload, saved_at)
         VALUES ('current', 1, '{not json', 0);",
        [],
    )
    .unwrap();
    let store = SqliteSnapshotStore::try_new(&conn).unwrap();

    let err = store.load().unwrap_err();

    assert!(matches!(err, StoreError::InvalidData(_)));
    assert_eq!(err.code(), "invalid_data");
}

#[test]
fn in_memory_store_keeps_json_document() {
    let store = InMemorySnapshotStore::new();
    assert!(store.load().unwrap().is_none());

    let snapshot = sample_org().to_snapshot();
    store.save(&snapshot).unwrap();

    let document = store.document().unwrap();
    let value: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(value["tree"]["type"], "circle");
    assert_eq!(value["tree"]["children"][0]["name"], "Guild");
    assert_eq!(store.load().unwrap(), Some(snapshot));
}

#[test]
fn failing_store_rejects_saves() {
    let store = InMemorySnapshotStore::failing("disk full");

    let result: StoreResult<()> = store.save(&sample_org().to_snapshot());

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(store.document().is_none());
}

#[test]
fn minimal_hand_written_document_loads() {
    let text = r#"{
        "tree": {
            "id": "00000000-0000-0000-0000-000000000001",
            "type": "circle",
            "name": "Company",
            "children": [
                {"id": "00000000-0000-0000-0000-000000000002", "type": "role", "name": "Lead"}
            ]
        }
    }"#;
    let store = InMemorySnapshotStore::with_document(text);

    let snapshot = store.load().unwrap().unwrap();
    let org = Organization::from_snapshot(&snapshot).unwrap();

    assert_eq!(snapshot.format_version, SNAPSHOT_FORMAT_VERSION);
    assert_eq!(org.tree().len(), 2);
    assert_eq!(
        org.find_node(Uuid::from_u128(2)).unwrap().kind,
        NodeKind::Role
    );
}

#[test]
fn snapshot_with_unknown_template_is_rejected() {
    let mut snapshot = sample_org().to_snapshot();
    snapshot.templates.clear();

    let err = Organization::from_snapshot(&snapshot).unwrap_err();

    assert!(matches!(err, SnapshotError::UnknownTemplate { .. }));
    assert_eq!(err.code(), "unknown_template");
}

#[test]
fn snapshot_from_newer_format_is_rejected() {
    let mut snapshot = sample_org().to_snapshot();
    snapshot.format_version = SNAPSHOT_FORMAT_VERSION + 1;

    assert!(matches!(
        Organization::from_snapshot(&snapshot),
        Err(SnapshotError::UnsupportedFormatVersion { .. })
    ));
}

#[test]
fn snapshot_with_role_children_is_rejected() {
    let mut snapshot = Snapshot::with_default_root(Uuid::from_u128(1));
    let mut role = snapshot.tree.clone();
    role.id = Uuid::from_u128(2);
    role.kind = NodeKind::Role;
    let mut nested = snapshot.tree.clone();
    nested.id = Uuid::from_u128(3);
    role.children.push(nested);
    snapshot.tree.children.push(role);

    assert!(matches!(
        Organization::from_snapshot(&snapshot),
        Err(SnapshotError::Shape(_))
    ));
}

#[test]
fn one_sided_membership_links_are_repaired_on_load() {
    let org = sample_org();
    let mut snapshot = org.to_snapshot();
    let member_id = snapshot.members[0].id;
    let steward = *snapshot.members[0].assignments.iter().next().unwrap();
    snapshot.members[0].assignments.clear();
    snapshot.members[0].assignments.insert(Uuid::from_u128(999));

    let restored = Organization::from_snapshot(&snapshot).unwrap();

    restored.check_invariants().unwrap();
    assert!(restored.is_assigned(member_id, steward));
    assert!(!restored.member(member_id).unwrap().holds(Uuid::from_u128(999)));
}
