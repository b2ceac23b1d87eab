//! Integration tests for the sync engine against the in-memory stores.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use worksync_engine::{
    ConsentDecision, DiffOp, DiffPlan, DiffSynchronizer, HydrateSource, PushStrategy, RetryConfig,
    SessionState, StaticConsent, SyncConfig, SyncEngine, SyncError,
};
use worksync_model::{AppSettings, Document, DocumentKind, ExtensionRecord, ExtensionRegistry, FileTree};
use worksync_remote::{MemoryRemoteStore, RemoteStore};
use worksync_store::{ConsentStatus, ConsentStore, InMemoryStore, LocalCache, StoreKey};

struct Harness {
    remote: Arc<MemoryRemoteStore>,
    kv: Arc<InMemoryStore>,
    prompt: Arc<StaticConsent>,
    engine: SyncEngine,
}

fn harness(decision: ConsentDecision) -> Harness {
    harness_with(decision, SyncConfig::default().with_retry(RetryConfig::no_retry()))
}

fn harness_with(decision: ConsentDecision, config: SyncConfig) -> Harness {
    let remote = Arc::new(MemoryRemoteStore::new());
    let kv = Arc::new(InMemoryStore::new());
    let prompt = Arc::new(StaticConsent::new(decision));
    let engine = SyncEngine::new(
        remote.clone(),
        LocalCache::new(kv.clone()),
        ConsentStore::new(kv.clone()),
        config,
        prompt.clone(),
    );
    Harness {
        remote,
        kv,
        prompt,
        engine,
    }
}

fn settings_with_font(size: u32) -> AppSettings {
    let mut settings = AppSettings::default();
    settings.editor.font_size = size;
    settings
}

fn cache_settings(kv: &Arc<InMemoryStore>, owner: &str, settings: &AppSettings) {
    let cache = LocalCache::new(kv.clone());
    let raw = settings.encode_cache().unwrap();
    cache
        .set(&StoreKey::owned("settings", Some(owner)), &raw)
        .unwrap();
}

fn cached_settings(kv: &Arc<InMemoryStore>, owner: &str) -> Option<AppSettings> {
    let cache = LocalCache::new(kv.clone());
    let raw = cache
        .get(&StoreKey::owned("settings", Some(owner)))
        .unwrap()?;
    Some(AppSettings::decode_cache(&raw).unwrap())
}

fn remote_settings(remote: &MemoryRemoteStore) -> Option<AppSettings> {
    let folder = remote.folder_at(&["worksync", "Settings"])?;
    let bytes = remote.file_content(&folder, "app-settings.json")?;
    AppSettings::decode_blobs(&[Some(bytes.to_vec())]).unwrap()
}

fn files(pairs: &[(&str, &str)]) -> Vec<(String, Bytes)> {
    pairs
        .iter()
        .map(|(n, c)| (n.to_string(), Bytes::from(c.to_string())))
        .collect()
}

/// Long enough for any debounce, retry or write in these tests to finish.
async fn settle() {
    sleep(Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn hydrate_twice_yields_same_value() {
    let h = harness(ConsentDecision::Granted);
    cache_settings(&h.kv, "alice", &settings_with_font(19));
    let settings = h.engine.session::<AppSettings>();

    h.engine.connect(Some("alice")).await;
    let first = settings.document_state();
    let source = settings.hydrate().await;
    let second = settings.document_state();

    assert_eq!(source, HydrateSource::Local);
    assert_eq!(first.value, second.value);
    assert_eq!(second.value.editor.font_size, 19);
    assert!(second.hydrated);
}

#[tokio::test(start_paused = true)]
async fn burst_of_mutations_is_written_once_with_last_value() {
    let h = harness(ConsentDecision::Granted);
    let settings = h.engine.session::<AppSettings>();
    h.engine.connect(Some("alice")).await;
    assert_eq!(h.remote.calls().writes(), 0);

    for size in 10..15 {
        settings.mutate(settings_with_font(size));
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(settings.state(), SessionState::Dirty);
    assert_eq!(h.remote.calls().writes(), 0);

    settle().await;
    assert_eq!(h.remote.calls().writes(), 1);
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 14);
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 14);

    let state = settings.document_state();
    assert!(!state.dirty);
    assert_eq!(settings.state(), SessionState::Idle);
    assert_eq!(state.last_persisted, Some(state.value.fingerprint().unwrap()));
}

#[tokio::test(start_paused = true)]
async fn mutation_during_persist_is_not_lost() {
    let h = harness(ConsentDecision::Granted);
    let settings = h.engine.session::<AppSettings>();
    h.engine.connect(Some("alice")).await;
    h.remote.set_latency(Duration::from_millis(500));

    settings.mutate(settings_with_font(20));
    // The timer fires at 1.1s; the write takes 1s.
    sleep(Duration::from_millis(1200)).await;
    assert_eq!(settings.state(), SessionState::Persisting);
    settings.mutate(settings_with_font(21));

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 20);
    assert_eq!(settings.state(), SessionState::Dirty);
    assert!(settings.document_state().dirty);

    settle().await;
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 21);
    let state = settings.document_state();
    assert!(!state.dirty);
    assert_eq!(settings.state(), SessionState::Idle);
    assert_eq!(state.last_persisted, Some(settings_with_font(21).fingerprint().unwrap()));
}

#[tokio::test]
async fn diff_creates_missing_and_updates_existing_only() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let folder = remote.seed_folder(None, "project");
    let b = remote.seed_file(&folder, "b", "old");
    remote.seed_file(&folder, "c", "untouched");

    let listing = remote.list(&folder).await.unwrap();
    let plan = DiffPlan::plan(files(&[("a", "1"), ("b", "2")]), listing, true);
    assert_eq!(
        plan.ops,
        vec![
            DiffOp::Create {
                name: "a".into(),
                content: Bytes::from("1"),
            },
            DiffOp::Update {
                id: b,
                name: "b".into(),
                content: Bytes::from("2"),
            },
        ]
    );

    remote.reset_counters();
    let outcome = DiffSynchronizer::new(remote.clone(), PushStrategy::Bounded(5))
        .sync(&folder, files(&[("a", "1"), ("b", "2")]))
        .await
        .unwrap();
    assert!(outcome.success());
    let calls = remote.calls();
    assert_eq!((calls.create, calls.update, calls.delete), (1, 1, 0));
    assert_eq!(remote.file_content(&folder, "c"), Some(Bytes::from("untouched")));
    assert_eq!(remote.file_names(&folder), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn bounded_pool_finishes_in_waves_of_k() {
    let latency = Duration::from_millis(100);
    let remote = Arc::new(MemoryRemoteStore::with_latency(latency));
    let folder = remote.seed_folder(None, "project");
    let local: Vec<(String, Bytes)> = (0..50)
        .map(|i| (format!("file-{i:02}.txt"), Bytes::from(format!("content {i}"))))
        .collect();

    let start = Instant::now();
    let outcome = DiffSynchronizer::new(remote.clone(), PushStrategy::Bounded(5))
        .sync(&folder, local)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome.created.len(), 50);
    assert_eq!(remote.peak_in_flight(), 5);
    // One listing plus ten waves of five.
    assert!(elapsed >= latency * 11, "{elapsed:?}");
    assert!(elapsed < latency * 12, "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn sequential_push_takes_one_latency_per_operation() {
    let latency = Duration::from_millis(100);
    let remote = Arc::new(MemoryRemoteStore::with_latency(latency));
    let folder = remote.seed_folder(None, "project");
    let local: Vec<(String, Bytes)> = (0..20)
        .map(|i| (format!("f{i}"), Bytes::from_static(b"x")))
        .collect();

    let start = Instant::now();
    DiffSynchronizer::new(remote.clone(), PushStrategy::Sequential)
        .sync(&folder, local)
        .await
        .unwrap();

    assert_eq!(remote.peak_in_flight(), 1);
    assert!(start.elapsed() >= latency * 21);
}

#[tokio::test(start_paused = true)]
async fn declined_consent_blocks_every_remote_write() {
    let h = harness(ConsentDecision::Declined);
    cache_settings(&h.kv, "alice", &settings_with_font(18));
    let settings = h.engine.session::<AppSettings>();

    h.engine.connect(Some("alice")).await;
    assert_eq!(h.prompt.prompts(), 1);
    assert_eq!(
        h.engine.consent_status(DocumentKind::Settings).unwrap(),
        ConsentStatus::Declined
    );

    for size in 20..30 {
        settings.mutate(settings_with_font(size));
        settle().await;
    }
    settings.flush().await.unwrap();
    settings.hydrate().await;

    assert_eq!(h.remote.calls().writes(), 0);
    assert_eq!(h.prompt.prompts(), 1);
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 29);
    assert_eq!(settings.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn declined_consent_blocks_workspace_diff_push() {
    let h = harness(ConsentDecision::Granted);
    ConsentStore::new(h.kv.clone())
        .set(
            &StoreKey::owned("workspace-consent", Some("alice")),
            ConsentStatus::Declined,
        )
        .unwrap();
    let workspace = h.engine.session::<FileTree>();
    h.engine.connect(Some("alice")).await;

    workspace
        .try_update(|tree| tree.write("/README.md", "# Private\n"))
        .unwrap();
    settle().await;
    workspace.flush().await.unwrap();

    let calls = h.remote.calls();
    assert_eq!((calls.create, calls.update), (0, 0));
    assert_eq!(h.prompt.prompts(), 0);
    let pushed = h
        .remote
        .folder_at(&["worksync", "Projects", "Default Project"])
        .map(|project| h.remote.file_names(&project))
        .unwrap_or_default();
    assert!(pushed.is_empty(), "{pushed:?}");
    assert_eq!(workspace.value().content("/README.md"), Some("# Private\n"));
    assert_eq!(workspace.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn granted_consent_uploads_existing_local_data() {
    let h = harness(ConsentDecision::Granted);
    cache_settings(&h.kv, "alice", &settings_with_font(17));
    let settings = h.engine.session::<AppSettings>();

    h.engine.connect(Some("alice")).await;
    assert_eq!(settings.state(), SessionState::Dirty);
    settle().await;

    assert_eq!(h.prompt.prompts(), 1);
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 17);
    assert_eq!(settings.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn partial_batch_failure_reports_failed_names() {
    let h = harness(ConsentDecision::Granted);
    let workspace = h.engine.session::<FileTree>();
    h.engine.connect(Some("alice")).await;

    h.remote.fail_writes_for("/README.md");
    let err = workspace.flush().await.unwrap_err();
    match err {
        SyncError::PartialBatchFailure { failed } => {
            assert_eq!(failed, vec!["/README.md".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let project = h.remote.folder_at(&["worksync", "Projects", "Default Project"]).unwrap();
    assert!(h.remote.file_content(&project, "/src/main.ts").is_some());
    assert!(h.remote.file_content(&project, "workspace.json").is_some());
    assert!(h.remote.file_content(&project, "/README.md").is_none());

    let status = h.engine.status();
    assert!(status.error.is_some());
    assert!(!status.sync_in_progress);
    assert_eq!(workspace.state(), SessionState::Dirty);

    h.remote.clear_failures();
    workspace.flush().await.unwrap();
    assert!(h.remote.file_content(&project, "/README.md").is_some());
    assert_eq!(workspace.state(), SessionState::Idle);
    assert!(h.engine.status().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn unchanged_files_are_skipped() {
    let h = harness(ConsentDecision::Granted);
    let workspace = h.engine.session::<FileTree>();
    h.engine.connect(Some("alice")).await;
    settle().await;

    h.remote.reset_counters();
    workspace
        .try_update(|tree| tree.write("/README.md", "# Changed\n"))
        .unwrap();
    workspace.flush().await.unwrap();

    // The edited file and the tree blob; main.ts matches its remote hash.
    assert_eq!(h.remote.calls().update, 2);
    let status = h.engine.status();
    let doc = status.document(DocumentKind::Workspace).unwrap();
    assert_eq!((doc.total_items, doc.completed_items), (2, 2));
}

#[tokio::test(start_paused = true)]
async fn remote_value_wins_and_enables_consent() {
    let h = harness(ConsentDecision::Declined);
    let root = h.remote.seed_folder(None, "worksync");
    let folder = h.remote.seed_folder(Some(&root), "Settings");
    let blobs = settings_with_font(22).encode_blobs().unwrap();
    h.remote.seed_file(&folder, "app-settings.json", blobs[0].bytes.clone());
    cache_settings(&h.kv, "alice", &settings_with_font(30));

    let settings = h.engine.session::<AppSettings>();
    let hydrated = h.engine.connect(Some("alice")).await;

    assert_eq!(hydrated, vec![(DocumentKind::Settings, HydrateSource::Remote)]);
    assert_eq!(settings.value().editor.font_size, 22);
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 22);
    assert_eq!(h.prompt.prompts(), 0);
    assert_eq!(
        h.engine.consent_status(DocumentKind::Settings).unwrap(),
        ConsentStatus::Enabled
    );
    assert_eq!(settings.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn malformed_remote_blob_falls_back_to_local() {
    let h = harness(ConsentDecision::Granted);
    let root = h.remote.seed_folder(None, "worksync");
    let folder = h.remote.seed_folder(Some(&root), "Settings");
    h.remote.seed_file(&folder, "app-settings.json", "{not json");
    cache_settings(&h.kv, "alice", &settings_with_font(16));

    let settings = h.engine.session::<AppSettings>();
    let hydrated = h.engine.connect(Some("alice")).await;

    assert_eq!(hydrated, vec![(DocumentKind::Settings, HydrateSource::Local)]);
    assert_eq!(settings.value().editor.font_size, 16);
}

#[tokio::test(start_paused = true)]
async fn unreachable_remote_keeps_working_locally() {
    let h = harness(ConsentDecision::Granted);
    h.remote.set_online(false);
    let settings = h.engine.session::<AppSettings>();

    let hydrated = h.engine.connect(Some("alice")).await;
    assert_eq!(hydrated, vec![(DocumentKind::Settings, HydrateSource::Default)]);
    assert!(h.engine.status().error.is_some());
    assert_eq!(h.prompt.prompts(), 0);

    settings.mutate(settings_with_font(25));
    settle().await;
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 25);
    assert_eq!(h.remote.calls().writes(), 0);
    assert!(!settings.document_state().dirty);
}

#[tokio::test(start_paused = true)]
async fn sessions_sync_independently() {
    let h = harness(ConsentDecision::Granted);
    let sessions = h.engine.open_sessions();
    let hydrated = h.engine.connect(Some("alice")).await;
    assert_eq!(hydrated.len(), 4);

    sessions.settings.mutate(settings_with_font(15));
    sessions
        .extensions
        .update(|registry| registry.install(ExtensionRecord::new("rust-analyzer", "Rust", "0.3.0")));
    settle().await;

    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 15);
    let ext = h.remote.folder_at(&["worksync", "Extensions"]).unwrap();
    let installed = h.remote.file_content(&ext, "extensions-installed.json").unwrap();
    let marketplace = h.remote.file_content(&ext, "extensions-marketplace.json");
    let registry =
        ExtensionRegistry::decode_blobs(&[Some(installed.to_vec()), marketplace.map(|b| b.to_vec())])
            .unwrap()
            .unwrap();
    assert!(registry.installed("rust-analyzer").is_some());

    let project = h.remote.folder_at(&["worksync", "Projects", "Default Project"]).unwrap();
    assert!(h.remote.file_content(&project, "workspace.json").is_some());

    let status = h.engine.status();
    assert!(status.connected);
    assert!(!status.sync_in_progress);
    for kind in DocumentKind::ALL {
        assert_eq!(status.document(kind).unwrap().phase, SessionState::Idle, "{kind}");
    }
    assert_eq!(sessions.sdk.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn disconnect_saves_pending_edit_locally_and_stops_remote_writes() {
    let h = harness(ConsentDecision::Granted);
    let settings = h.engine.session::<AppSettings>();
    h.engine.connect(Some("alice")).await;

    settings.mutate(settings_with_font(12));
    h.engine.disconnect();
    assert_eq!(settings.state(), SessionState::Disconnected);
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 12);

    settings.mutate(settings_with_font(13));
    settle().await;
    assert_eq!(h.remote.calls().writes(), 0);
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 13);
    assert!(!h.engine.is_connected());
    assert!(!h.engine.status().connected);

    let hydrated = h.engine.connect(Some("alice")).await;
    assert_eq!(hydrated, vec![(DocumentKind::Settings, HydrateSource::Local)]);
    settle().await;
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 13);
    assert_eq!(settings.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn hydrate_inside_debounce_window_keeps_pending_edit() {
    let h = harness(ConsentDecision::Granted);
    cache_settings(&h.kv, "alice", &settings_with_font(12));
    let settings = h.engine.session::<AppSettings>();
    h.engine.connect(Some("alice")).await;
    settle().await;
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 12);

    h.remote.set_online(false);
    settings.mutate(settings_with_font(30));
    sleep(Duration::from_millis(200)).await;
    let source = settings.hydrate().await;

    assert_eq!(source, HydrateSource::Local);
    assert_eq!(settings.value().editor.font_size, 30);
    assert_eq!(cached_settings(&h.kv, "alice").unwrap().editor.font_size, 30);
    assert!(settings.document_state().dirty);

    settle().await;
    assert_eq!(settings.value().editor.font_size, 30);
    assert_eq!(settings.state(), SessionState::Dirty);

    h.remote.set_online(true);
    settings.flush().await.unwrap();
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 30);

    // A reachable remote value does not override an unsaved edit either.
    settings.mutate(settings_with_font(31));
    settings.hydrate().await;
    assert_eq!(settings.value().editor.font_size, 31);
    settle().await;
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 31);
    assert_eq!(settings.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn consent_is_scoped_per_owner() {
    let h = harness(ConsentDecision::Dismissed);
    h.engine.connect(Some("alice")).await;
    h.engine
        .set_consent(DocumentKind::Settings, ConsentStatus::Declined)
        .unwrap();

    h.engine.disconnect();
    h.engine.connect(Some("bob")).await;
    assert_eq!(h.engine.owner().as_deref(), Some("bob"));
    assert_eq!(
        h.engine.consent_status(DocumentKind::Settings).unwrap(),
        ConsentStatus::Unset
    );

    h.engine.disconnect();
    h.engine.connect(Some("alice")).await;
    assert_eq!(
        h.engine.consent_status(DocumentKind::Settings).unwrap(),
        ConsentStatus::Declined
    );
    h.engine.revoke_consent(DocumentKind::Settings).unwrap();
    assert_eq!(
        h.engine.consent_status(DocumentKind::Settings).unwrap(),
        ConsentStatus::Unset
    );
}

#[tokio::test(start_paused = true)]
async fn dismissed_prompt_leaves_consent_open() {
    let h = harness(ConsentDecision::Dismissed);
    cache_settings(&h.kv, "alice", &settings_with_font(11));
    let settings = h.engine.session::<AppSettings>();

    h.engine.connect(Some("alice")).await;
    settings.mutate(settings_with_font(12));
    settle().await;

    assert_eq!(h.prompt.prompts(), 1);
    assert_eq!(h.remote.calls().writes(), 0);
    assert_eq!(
        h.engine.consent_status(DocumentKind::Settings).unwrap(),
        ConsentStatus::Unset
    );

    settings.hydrate().await;
    assert_eq!(h.prompt.prompts(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_persist_is_retried_with_backoff() {
    let retry = RetryConfig::new(3)
        .with_initial_delay(Duration::from_millis(500))
        .with_jitter(false);
    let h = harness_with(
        ConsentDecision::Granted,
        SyncConfig::default().with_retry(retry),
    );
    let settings = h.engine.session::<AppSettings>();
    h.engine.connect(Some("alice")).await;

    h.remote.fail_writes_for("app-settings.json");
    settings.mutate(settings_with_font(9));
    sleep(Duration::from_millis(1200)).await;
    assert!(h.engine.status().error.is_some());
    assert_eq!(settings.state(), SessionState::Dirty);

    h.remote.clear_failures();
    settle().await;
    assert_eq!(remote_settings(&h.remote).unwrap().editor.font_size, 9);
    assert_eq!(settings.state(), SessionState::Idle);
    assert!(h.engine.status().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn status_subscribers_observe_progress() {
    let h = harness(ConsentDecision::Granted);
    let workspace = h.engine.session::<FileTree>();
    let mut rx = h.engine.subscribe();
    h.engine.connect(None).await;
    let _ = rx.borrow_and_update();

    workspace
        .try_update(|tree| {
            let path = tree.create("/", "notes.md", worksync_model::NodeKind::File)?;
            tree.write(&path, "todo")
        })
        .unwrap();
    workspace.flush().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let status = rx.borrow_and_update().clone();
    assert!(status.connected);
    assert_eq!(status.total_items, status.completed_items);
    assert!(status.last_sync_at.is_some());
}
