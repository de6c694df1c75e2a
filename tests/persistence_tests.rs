//! Persistence Tests
//!
//! Save pipeline and startup resolution, run on a paused tokio clock.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value};
use tempfile::tempdir;

use clipdeck::config::{HistoryConfig, PersistenceConfig, DEFAULT_COLLECTION, DEFAULT_LOCAL_KEY};
use clipdeck::persistence::{
    FileStore, LoadSource, LocalStore, MemoryRemoteStore, MemoryStore, PersistenceCoordinator,
    PersistenceMode, SaveStatus, SessionAuth,
};
use clipdeck::state::{Project, StagePayload};
use clipdeck::store::ProjectStore;

const WINDOW_MS: u64 = 5_000;

struct Harness {
    local: Arc<MemoryStore>,
    remote: Arc<MemoryRemoteStore>,
    auth: Arc<SessionAuth>,
    coordinator: PersistenceCoordinator,
}

fn harness(user: Option<&str>) -> Harness {
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());
    let auth = Arc::new(match user {
        Some(user) => SessionAuth::signed_in(user),
        None => SessionAuth::new(),
    });
    let coordinator = PersistenceCoordinator::new(
        PersistenceConfig::default(),
        local.clone(),
        remote.clone(),
        auth.clone(),
    );
    Harness {
        local,
        remote,
        auth,
        coordinator,
    }
}

fn observed(harness: &Harness) -> ProjectStore {
    let mut store = ProjectStore::default();
    harness.coordinator.observe(&mut store);
    store
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Let spawned tasks run to their next await point.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn keys(fields: &Map<String, Value>) -> BTreeSet<&str> {
    fields.keys().map(String::as_str).collect()
}

fn project(id: &str, name: &str) -> Project {
    let mut project = Project::new(id, Utc::now());
    project.name = name.to_string();
    project
}

fn remote_fields(project: &Project, owner: &str, updated_at: &str) -> Map<String, Value> {
    let Value::Object(mut fields) = serde_json::to_value(project).unwrap() else {
        panic!("project must serialize to an object");
    };
    fields.insert("ownerId".to_string(), Value::from(owner));
    fields.insert("updatedAt".to_string(), Value::from(updated_at));
    fields
}

fn cache(harness: &Harness, project: &Project) {
    harness
        .local
        .write(DEFAULT_LOCAL_KEY, &serde_json::to_string(project).unwrap())
        .unwrap();
}

// === Save pipeline ===

#[tokio::test(start_paused = true)]
async fn test_burst_collapses_to_one_remote_write() {
    let h = harness(Some("user-1"));
    let mut store = observed(&h);

    for i in 0..5 {
        store.set_name(format!("Draft {}", i));
        if i < 4 {
            sleep_ms(1_000).await;
        }
    }
    assert_eq!(h.coordinator.status().save_status, SaveStatus::Pending);
    assert_eq!(h.coordinator.read_local().unwrap().name, "Draft 4");

    sleep_ms(WINDOW_MS - 1).await;
    settle().await;
    assert_eq!(h.remote.merge_attempts(), 0);

    sleep_ms(2).await;
    settle().await;
    assert_eq!(h.remote.merge_attempts(), 1);

    let merge = h.remote.last_merge().unwrap();
    assert_eq!(merge.collection, DEFAULT_COLLECTION);
    assert_eq!(merge.id, store.project().id);
    assert_eq!(merge.fields["name"], "Draft 4");
    assert_eq!(merge.fields["ownerId"], "user-1");

    let status = h.coordinator.status();
    assert_eq!(status.save_status, SaveStatus::Saved);
    assert_eq!(status.mode, PersistenceMode::Hybrid);
    assert!(status.last_saved.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_write_falls_back_to_local() {
    let h = harness(Some("user-1"));
    h.remote.set_fail_writes(true);
    let mut store = observed(&h);

    store.set_name("First");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;

    let status = h.coordinator.status();
    assert_eq!(status.save_status, SaveStatus::Error);
    assert_eq!(status.mode, PersistenceMode::Local);
    assert_eq!(h.remote.merge_attempts(), 1);

    store.set_name("After failure");
    assert_eq!(h.coordinator.read_local().unwrap().name, "After failure");
    assert_eq!(h.coordinator.status().save_status, SaveStatus::Pending);

    h.remote.set_fail_writes(false);
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;
    assert_eq!(h.coordinator.status().mode, PersistenceMode::Hybrid);
    assert_eq!(
        h.remote.document(DEFAULT_COLLECTION, &store.project().id).unwrap()["name"],
        "After failure"
    );
}

#[tokio::test(start_paused = true)]
async fn test_remote_only_when_local_write_fails() {
    let h = harness(Some("user-1"));
    h.local.set_fail_writes(true);
    let mut store = observed(&h);

    store.set_name("Remote only");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;

    let status = h.coordinator.status();
    assert_eq!(status.save_status, SaveStatus::Saved);
    assert_eq!(status.mode, PersistenceMode::Remote);
    assert!(h.coordinator.read_local().is_none());

    h.local.set_fail_writes(false);
    store.set_name("Both tiers");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;
    assert_eq!(h.coordinator.status().mode, PersistenceMode::Hybrid);
}

#[tokio::test]
async fn test_restore_from_remote_without_local_cache_is_remote_only() {
    let h = harness(Some("user-1"));
    h.local.set_fail_writes(true);
    let remote_project = project("project-remote", "From remote");
    h.remote.insert_document(
        DEFAULT_COLLECTION,
        "project-remote",
        remote_fields(&remote_project, "user-1", "2024-01-01T00:00:00Z"),
    );

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Remote);
    assert_eq!(h.coordinator.status().mode, PersistenceMode::Remote);
}

#[tokio::test(start_paused = true)]
async fn test_second_write_carries_only_changed_fields() {
    let h = harness(Some("user-1"));
    let mut store = observed(&h);

    store.set_name("One");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;
    let first = h.remote.last_merge().unwrap();
    assert!(first.fields.contains_key("clips"));
    assert!(first.fields.contains_key("tracks"));

    store.set_name("Two");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;

    let second = h.remote.last_merge().unwrap();
    assert_eq!(
        keys(&second.fields),
        BTreeSet::from(["id", "lastModified", "name", "ownerId", "updatedAt"])
    );

    let document = h.remote.document(DEFAULT_COLLECTION, &store.project().id).unwrap();
    assert_eq!(document["name"], "Two");
    assert!(document.contains_key("clips"));
}

#[tokio::test(start_paused = true)]
async fn test_write_timeout_is_a_failure() {
    let h = harness(Some("user-1"));
    h.remote.set_write_delay(Some(Duration::from_secs(60)));
    let mut store = observed(&h);

    store.set_name("Slow");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;
    assert_eq!(h.coordinator.status().save_status, SaveStatus::Saving);

    sleep_ms(30_000).await;
    settle().await;

    let status = h.coordinator.status();
    assert_eq!(status.save_status, SaveStatus::Error);
    assert_eq!(status.mode, PersistenceMode::Local);
    assert_eq!(h.remote.merge_attempts(), 1);
    assert!(h.remote.merges().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_writes_never_overlap() {
    let h = harness(Some("user-1"));
    h.remote.set_write_delay(Some(Duration::from_secs(10)));
    let mut store = observed(&h);

    // First write runs from 5s to 15s; the second fires at 11s and waits.
    store.set_name("First");
    sleep_ms(6_000).await;
    store.set_name("Second");

    sleep_ms(8_000).await;
    settle().await;
    assert_eq!(h.remote.merge_attempts(), 1);

    sleep_ms(12_000).await;
    settle().await;
    let names: Vec<Value> = h
        .remote
        .merges()
        .into_iter()
        .map(|merge| merge.fields["name"].clone())
        .collect();
    assert_eq!(names, vec![Value::from("First"), Value::from("Second")]);
    assert_eq!(h.coordinator.status().save_status, SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_signed_out_stays_local() {
    let h = harness(None);
    let mut store = observed(&h);

    store.set_name("Offline");
    let status = h.coordinator.status();
    assert_eq!(status.save_status, SaveStatus::Saved);
    assert_eq!(status.mode, PersistenceMode::Local);

    sleep_ms(WINDOW_MS * 2).await;
    settle().await;
    assert_eq!(h.remote.merge_attempts(), 0);
    assert_eq!(h.coordinator.read_local().unwrap().name, "Offline");
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_before_fire_skips_remote() {
    let h = harness(Some("user-1"));
    let mut store = observed(&h);

    store.set_name("Draft");
    h.auth.sign_out();
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;

    assert_eq!(h.remote.merge_attempts(), 0);
    assert_eq!(h.coordinator.status().mode, PersistenceMode::Local);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_write() {
    let h = harness(Some("user-1"));
    let mut store = observed(&h);

    store.set_name("Unsaved remotely");
    h.coordinator.shutdown();
    sleep_ms(WINDOW_MS * 2).await;
    settle().await;

    assert_eq!(h.remote.merge_attempts(), 0);
    assert_eq!(h.coordinator.read_local().unwrap().name, "Unsaved remotely");
}

#[tokio::test(start_paused = true)]
async fn test_session_changes_are_not_saved() {
    let h = harness(None);
    let mut store = observed(&h);

    store.zoom_in();
    assert!(h.coordinator.read_local().is_none());
    assert_eq!(h.coordinator.status().save_status, SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_status_channel_reports_progress() {
    let h = harness(Some("user-1"));
    let mut status = h.coordinator.subscribe_status();
    let mut store = observed(&h);

    store.set_name("Watched");
    assert!(status.has_changed().unwrap());
    assert_eq!(status.borrow_and_update().save_status, SaveStatus::Pending);

    sleep_ms(WINDOW_MS + 1).await;
    settle().await;
    assert_eq!(status.borrow_and_update().save_status, SaveStatus::Saved);
}

// === Startup resolution ===

#[tokio::test]
async fn test_restore_signed_out_uses_cache() {
    let h = harness(None);
    let cached = project("project-local", "Cached");
    cache(&h, &cached);

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Local);
    assert_eq!(outcome.project, Some(cached));
}

#[tokio::test]
async fn test_restore_without_anything_is_default() {
    let h = harness(Some("user-1"));

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Default);

    let store = outcome.into_store(&HistoryConfig::default()).unwrap();
    assert_eq!(store.project().name, clipdeck::state::DEFAULT_PROJECT_NAME);
}

#[tokio::test]
async fn test_restore_keeps_confirmed_cache() {
    let h = harness(Some("user-1"));
    let cached = project("project-local", "Cached");
    cache(&h, &cached);
    h.remote.insert_document(
        DEFAULT_COLLECTION,
        "project-local",
        remote_fields(&cached, "user-1", "2024-01-01T00:00:00Z"),
    );
    let newer = project("project-newer", "Newer");
    h.remote.insert_document(
        DEFAULT_COLLECTION,
        "project-newer",
        remote_fields(&newer, "user-1", "2024-06-01T00:00:00Z"),
    );

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Local);
    assert_eq!(outcome.project, Some(cached));
    assert_eq!(h.coordinator.status().mode, PersistenceMode::Hybrid);
}

#[tokio::test]
async fn test_restore_replaces_foreign_cache_with_latest_remote() {
    let h = harness(Some("user-1"));
    let cached = project("project-foreign", "Someone else's");
    cache(&h, &cached);
    h.remote.insert_document(
        DEFAULT_COLLECTION,
        "project-foreign",
        remote_fields(&cached, "user-2", "2024-07-01T00:00:00Z"),
    );
    for (id, updated) in [("project-a", "2024-01-01T00:00:00Z"), ("project-b", "2024-03-01T00:00:00Z")] {
        h.remote.insert_document(
            DEFAULT_COLLECTION,
            id,
            remote_fields(&project(id, id), "user-1", updated),
        );
    }

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Remote);
    assert_eq!(outcome.project.as_ref().unwrap().id, "project-b");
    assert_eq!(h.coordinator.read_local().unwrap().id, "project-b");
}

#[tokio::test]
async fn test_restore_falls_back_to_unordered_query() {
    let h = harness(Some("user-1"));
    h.remote.set_fail_ordered_queries(true);
    for (id, updated) in [
        ("project-a", "2024-05-01T00:00:00Z"),
        ("project-b", "2024-02-01T00:00:00Z"),
        ("project-c", "2024-04-01T00:00:00Z"),
    ] {
        h.remote.insert_document(
            DEFAULT_COLLECTION,
            id,
            remote_fields(&project(id, id), "user-1", updated),
        );
    }

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Remote);
    assert_eq!(outcome.project.unwrap().id, "project-a");
}

#[tokio::test]
async fn test_restore_keeps_cache_when_every_query_fails() {
    let h = harness(Some("user-1"));
    h.remote.set_fail_reads(true);
    h.remote.set_fail_ordered_queries(true);
    h.remote.set_fail_unordered_queries(true);
    let cached = project("project-local", "Cached");
    cache(&h, &cached);

    let outcome = h.coordinator.restore().await;
    assert_eq!(outcome.source, LoadSource::Local);
    assert_eq!(outcome.project, Some(cached));
    assert_eq!(h.coordinator.status().mode, PersistenceMode::Local);
}

#[tokio::test(start_paused = true)]
async fn test_write_after_remote_restore_is_incremental() {
    let h = harness(Some("user-1"));
    let remote_project = project("project-remote", "From remote");
    h.remote.insert_document(
        DEFAULT_COLLECTION,
        "project-remote",
        remote_fields(&remote_project, "user-1", "2024-01-01T00:00:00Z"),
    );

    let outcome = h.coordinator.restore().await;
    let mut store = outcome.into_store(&HistoryConfig::default()).unwrap();
    h.coordinator.observe(&mut store);

    store.set_name("Renamed");
    sleep_ms(WINDOW_MS + 1).await;
    settle().await;

    let merge = h.remote.last_merge().unwrap();
    assert_eq!(merge.id, "project-remote");
    assert_eq!(
        keys(&merge.fields),
        BTreeSet::from(["id", "lastModified", "name", "ownerId", "updatedAt"])
    );
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempdir().unwrap();
    let open = || {
        PersistenceCoordinator::new(
            PersistenceConfig::default(),
            Arc::new(FileStore::open(dir.path()).unwrap()),
            Arc::new(MemoryRemoteStore::new()),
            Arc::new(SessionAuth::new()),
        )
    };

    let first = open();
    let mut store = ProjectStore::default();
    first.observe(&mut store);
    store.set_name("On disk");
    store.mark_step_completed(1);
    let saved = store.export_project();

    let outcome = open().restore().await;
    assert_eq!(outcome.source, LoadSource::Local);
    assert_eq!(outcome.project, Some(saved));
}

#[tokio::test]
async fn test_file_store_keeps_workflow_data() {
    let dir = tempdir().unwrap();
    let coordinator = PersistenceCoordinator::new(
        PersistenceConfig::default(),
        Arc::new(FileStore::open(dir.path()).unwrap()),
        Arc::new(MemoryRemoteStore::new()),
        Arc::new(SessionAuth::new()),
    );

    let mut store = ProjectStore::default();
    coordinator.observe(&mut store);
    store
        .update_workflow_data(
            0,
            StagePayload::Audio {
                file_url: "song.mp3".to_string(),
                duration: Some(182.5),
                bpm: Some(120.0),
            },
        )
        .unwrap();
    store
        .update_workflow_data(
            5,
            StagePayload::Timeline {
                render_progress: 40,
                final_video_url: None,
            },
        )
        .unwrap();

    let loaded = coordinator.read_local().unwrap();
    assert_eq!(loaded.workflow_data, store.project().workflow_data);
    let restored = ProjectStore::from_project(loaded, &HistoryConfig::default()).unwrap();
    assert_eq!(restored.project().workflow_data.len(), 2);
}
