//! End-to-end lifecycle against the JSON file backend.

use std::fs;
use std::path::Path;

use incidents_core::config::StoreConfig;
use incidents_core::error::ErrorCode;
use incidents_core::model::incident::Status;
use incidents_core::persist::{JsonFileStore, Persistence};
use incidents_core::store::{IncidentStore, StartupReport, StoreError};
use incidents_core::validate::CreatePayload;
use tempfile::TempDir;

fn open(dir: &Path) -> (IncidentStore<JsonFileStore>, StartupReport) {
    IncidentStore::open_dir(dir, &StoreConfig::default()).expect("open store")
}

fn payload(title: &str) -> CreatePayload {
    CreatePayload::new(title, "Main server is offline", "IT", "HIGH")
}

#[test]
fn full_lifecycle_survives_restart() {
    let dir = TempDir::new().unwrap();
    let id = {
        let (mut store, report) = open(dir.path());
        assert_eq!(report, StartupReport::Initialized);

        let incident = store.submit(&payload("Server down")).unwrap();
        assert_eq!(incident.status, Status::Open);

        for next in [Status::Investigating, Status::Resolved] {
            let updated = store.change_status(&incident.id, next).unwrap().unwrap();
            assert_eq!(updated.status, next);
        }
        store.archive(&incident.id).unwrap().unwrap();
        incident.id
    };

    let (mut store, report) = open(dir.path());
    assert_eq!(report, StartupReport::Loaded { count: 1 });
    assert_eq!(
        store.find_by_id(&id).map(|i| i.status),
        Some(Status::Archived)
    );

    let back = store.unarchive(&id).unwrap().unwrap();
    assert_eq!(back.status, Status::Open);
}

#[test]
fn skipping_a_step_is_rejected_and_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = open(dir.path());
    let incident = store.submit(&payload("Server down")).unwrap();
    let before = fs::read(store.backend().path()).unwrap();

    let err = store
        .change_status(&incident.id, Status::Resolved)
        .unwrap_err();
    let transition = match err {
        StoreError::Transition(transition) => transition,
        other => panic!("expected transition error, got {other:?}"),
    };
    assert_eq!(transition.from, Status::Open);
    assert_eq!(transition.to, Status::Resolved);
    assert_eq!(transition.allowed, vec![Status::Investigating]);

    assert_eq!(fs::read(store.backend().path()).unwrap(), before);
}

#[test]
fn list_hides_archived_unless_asked() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = open(dir.path());
    let keep = store.submit(&payload("Printer offline")).unwrap();
    let hide = store.submit(&payload("Old outage")).unwrap();
    store.archive(&hide.id).unwrap();

    let visible: Vec<String> = store.list_all(false).into_iter().map(|i| i.id).collect();
    assert_eq!(visible, vec![keep.id.clone()]);

    let all: Vec<String> = store.list_all(true).into_iter().map(|i| i.id).collect();
    assert_eq!(all, vec![keep.id, hide.id]);
}

#[test]
fn delete_is_durable() {
    let dir = TempDir::new().unwrap();
    {
        let (mut store, _) = open(dir.path());
        let doomed = store.submit(&payload("Duplicate ticket")).unwrap();
        store.submit(&payload("Real ticket")).unwrap();
        let removed = store.delete(&doomed.id).unwrap().unwrap();
        assert_eq!(removed.id, doomed.id);
    }

    let (store, _) = open(dir.path());
    let titles: Vec<String> = store.list_all(true).into_iter().map(|i| i.title).collect();
    assert_eq!(titles, vec!["Real ticket".to_string()]);
}

#[test]
fn file_uses_camel_case_keys_and_uppercase_enums() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = open(dir.path());
    store
        .submit(&CreatePayload::new(
            "Wet floor",
            "Spill near the lobby entrance",
            "SAFETY",
            "LOW",
        ))
        .unwrap();

    let raw = fs::read_to_string(store.backend().path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &json[0];
    assert_eq!(record["category"], "SAFETY");
    assert_eq!(record["severity"], "LOW");
    assert_eq!(record["status"], "OPEN");
    assert!(record["reportedAt"].is_string());
    assert!(record.get("reported_at").is_none());
}

#[test]
fn second_open_on_same_dir_hits_lock_contention() {
    let dir = TempDir::new().unwrap();
    let (_held, _) = open(dir.path());

    let quick = StoreConfig {
        lock_timeout_ms: 50,
        ..StoreConfig::default()
    };
    let err = IncidentStore::open_dir(dir.path(), &quick).unwrap_err();
    assert_eq!(err.code(), ErrorCode::LockContention);
}

#[test]
fn custom_store_file_name_is_honored() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        file: "records.json".to_string(),
        ..StoreConfig::default()
    };
    let (mut store, _) = IncidentStore::open_dir(dir.path(), &config).unwrap();
    store.submit(&payload("Server down")).unwrap();

    assert!(dir.path().join("records.json").exists());
    assert!(!dir.path().join("incidents.json").exists());
    assert_eq!(store.backend().load().unwrap().map(|v| v.len()), Some(1));
}
