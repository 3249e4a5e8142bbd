use std::fs;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use cuepoint::{
    EngineConfig, FileStateStore, ResponderEngine, StateStore, StaticVersion, TriggerId,
    UsageState, DEFAULT_STORAGE_KEY,
};

fn file_engine(dir: &TempDir, version: &str) -> ResponderEngine {
    let store = Arc::new(FileStateStore::new(dir.path()).unwrap());
    ResponderEngine::new(
        store,
        Arc::new(StaticVersion::new(version)),
        EngineConfig::default(),
    )
    .unwrap()
}

#[test]
fn round_trip_is_field_for_field_equal() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::new(dir.path()).unwrap();

    let mut state = UsageState::fresh("3.2.1", Utc::now());
    state.record_launch();
    state.record_launch();
    state.record_activation();
    state.record_significant_event("export");
    state.record_significant_event("export");
    state.record_significant_event("share");
    state.apply_version_change("3.3.0", Utc::now(), false);
    state.mark_fired(&TriggerId::from("review"));
    state.mark_fired(&TriggerId::from("tour"));

    store.set("app.state", &state).unwrap();
    let loaded = store.get("app.state").unwrap().unwrap();

    assert_eq!(loaded.launch_count, state.launch_count);
    assert_eq!(loaded.activation_count, state.activation_count);
    assert_eq!(
        loaded.significant_event_counts,
        state.significant_event_counts
    );
    assert_eq!(loaded.installed_at, state.installed_at);
    assert_eq!(loaded.installed_version, state.installed_version);
    assert_eq!(loaded.last_updated_at, state.last_updated_at);
    assert_eq!(loaded.history, state.history);
}

#[test]
fn counters_accumulate_across_engine_constructions() {
    let dir = TempDir::new().unwrap();

    {
        let engine = file_engine(&dir, "1.0.0");
        engine.report_activation().unwrap();
        engine.report_significant_event("export").unwrap();
    }

    let engine = file_engine(&dir, "1.0.0");
    let snapshot = engine.snapshot().unwrap();
    assert_eq!(snapshot.launch_count, 2);
    assert_eq!(snapshot.activation_count, 1);
    assert_eq!(snapshot.significant_event_count("export"), 1);
}

#[test]
fn malformed_record_degrades_to_first_run() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(format!("{DEFAULT_STORAGE_KEY}.json")),
        b"}}}not json",
    )
    .unwrap();

    let engine = file_engine(&dir, "1.0.0");
    let snapshot = engine.snapshot().unwrap();
    assert_eq!(snapshot.launch_count, 1);
    assert_eq!(snapshot.activation_count, 0);
    assert_eq!(snapshot.installed_version, "1.0.0");
    assert!(snapshot.history.is_empty());
}

#[test]
fn fresh_record_is_persisted_immediately_at_construction() {
    let dir = TempDir::new().unwrap();
    {
        let _engine = file_engine(&dir, "1.0.0");
    }

    // A plain store read, with no engine in the way, sees the record the
    // construction wrote.
    let store = FileStateStore::new(dir.path()).unwrap();
    let stored = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    assert_eq!(stored.launch_count, 1);
    assert_eq!(stored.installed_version, "1.0.0");
}

#[test]
fn version_change_is_visible_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let engine = file_engine(&dir, "1.0.0");
        engine.report_activation().unwrap();
    }
    {
        let _engine = file_engine(&dir, "2.0.0");
    }

    let store = FileStateStore::new(dir.path()).unwrap();
    let stored = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    assert_eq!(stored.installed_version, "2.0.0");
    assert!(stored.last_updated_at.is_some());
    assert_eq!(stored.activation_count, 0);
}

#[test]
fn repeated_writes_never_leave_a_torn_record() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::new(dir.path()).unwrap();

    let mut state = UsageState::fresh("1.0.0", Utc::now());
    for _ in 0..50 {
        state.record_launch();
        store.set(DEFAULT_STORAGE_KEY, &state).unwrap();
        let loaded = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(loaded.launch_count, state.launch_count);
    }

    // Temp files from the replace dance never linger.
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
}

#[test]
fn distinct_keys_store_independent_records() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStateStore::new(dir.path()).unwrap());

    let engine_a = ResponderEngine::new(
        Arc::clone(&store) as Arc<dyn StateStore>,
        Arc::new(StaticVersion::new("1.0.0")),
        EngineConfig {
            storage_key: "app-a".to_string(),
            ..EngineConfig::default()
        },
    )
    .unwrap();
    let engine_b = ResponderEngine::new(
        Arc::clone(&store) as Arc<dyn StateStore>,
        Arc::new(StaticVersion::new("1.0.0")),
        EngineConfig {
            storage_key: "app-b".to_string(),
            ..EngineConfig::default()
        },
    )
    .unwrap();

    engine_a.report_activation().unwrap();

    assert_eq!(engine_a.snapshot().unwrap().activation_count, 1);
    assert_eq!(engine_b.snapshot().unwrap().activation_count, 0);
    assert_eq!(store.get("app-a").unwrap().unwrap().activation_count, 1);
    assert_eq!(store.get("app-b").unwrap().unwrap().activation_count, 0);
}
