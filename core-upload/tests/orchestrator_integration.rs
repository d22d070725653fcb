//! End-to-end upload runs against in-process fakes.
//!
//! The fake remote delivers every callback from a spawned task, the way a
//! real SDK reports from its own notification thread.

use async_trait::async_trait;
use bridge_desktop::SqliteSettingsStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, Listener, MediaClass, MediaCollection, MediaLibrary, NetworkChangeStream,
    NetworkInfo, NetworkMonitor, NetworkType, NodeHandle, PendingItem, QuotaKind, QuotaNotice,
    QuotaObserver, RemoteClient, RemoteError, RemoteErrorCode, RemoteSession, SecureStore,
    SettingsStore,
};
use chrono::{FixedOffset, TimeZone};
use core_auth::{AuthManager, SessionTokenStore};
use core_runtime::config::{CoreConfig, UploadPolicy};
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use core_runtime::CompletionBridge;
use core_upload::run_config::keys;
use core_upload::{FailureTracker, QuotaSignal, RunOutcome, RunSummary, UploadOrchestrator};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::Receiver;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct RemoteState {
    calls: Vec<String>,
    present: HashSet<String>,
    failures: HashMap<String, VecDeque<RemoteError>>,
    quota_on: Option<String>,
    duplicate_finish: bool,
    root: Option<NodeHandle>,
    login_error: Option<RemoteError>,
    next_node: u64,
}

struct FakeRemote {
    state: Mutex<RemoteState>,
    observer: Mutex<Option<Arc<dyn QuotaObserver>>>,
}

impl FakeRemote {
    fn new() -> Self {
        Self {
            state: Mutex::new(RemoteState {
                root: Some(NodeHandle(42)),
                next_node: 100,
                ..Default::default()
            }),
            observer: Mutex::new(None),
        }
    }

    fn with_present(self, name: &str) -> Self {
        self.state.lock().unwrap().present.insert(name.to_string());
        self
    }

    fn failing(self, name: &str, errors: Vec<RemoteErrorCode>) -> Self {
        let errors = errors
            .into_iter()
            .map(|code| RemoteError::new(code, format!("{} rejected", name)))
            .collect();
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(name.to_string(), errors);
        self
    }

    fn quota_on(self, name: &str) -> Self {
        self.state.lock().unwrap().quota_on = Some(name.to_string());
        self
    }

    fn duplicate_finish(self) -> Self {
        self.state.lock().unwrap().duplicate_finish = true;
        self
    }

    fn without_root(self) -> Self {
        self.state.lock().unwrap().root = None;
        self
    }

    fn rejecting_login(self, code: RemoteErrorCode) -> Self {
        self.state.lock().unwrap().login_error = Some(RemoteError::new(code, "session expired"));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Dedupe and upload calls made for one item.
    fn calls_for(&self, name: &str) -> Vec<String> {
        let suffix = format!(":{}", name);
        self.calls()
            .into_iter()
            .filter(|call| call.ends_with(&suffix))
            .collect()
    }

    fn has_observer(&self) -> bool {
        self.observer.lock().unwrap().is_some()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }
}

fn deliver<T: Send + 'static>(
    listener: Listener<T>,
    result: Result<T, RemoteError>,
    duplicate: Option<Result<T, RemoteError>>,
) {
    tokio::spawn(async move {
        listener.on_start();
        tokio::task::yield_now().await;
        listener.on_update();
        listener.on_finish(result);
        if let Some(extra) = duplicate {
            listener.on_finish(extra);
        }
    });
}

impl RemoteClient for FakeRemote {
    fn login(&self, _session_token: &str, listener: Listener<RemoteSession>) {
        self.record("login");
        let result = match self.state.lock().unwrap().login_error.clone() {
            Some(err) => Err(err),
            None => Ok(RemoteSession {
                account_id: "account-1".to_string(),
            }),
        };
        deliver(listener, result, None);
    }

    fn fetch_remote_index(&self, listener: Listener<()>) {
        self.record("fetch_remote_index");
        deliver(listener, Ok(()), None);
    }

    fn resolve_or_create_upload_root(
        &self,
        _hint: Option<NodeHandle>,
        listener: Listener<Option<NodeHandle>>,
    ) {
        self.record("resolve_upload_root");
        let root = self.state.lock().unwrap().root;
        deliver(listener, Ok(root), None);
    }

    fn exists_by_fingerprint(
        &self,
        item: &PendingItem,
        _root: NodeHandle,
        _mtime: i64,
        listener: Listener<bool>,
    ) {
        self.record(format!("exists:{}", item.name));
        let state = self.state.lock().unwrap();
        let present = state.present.contains(&item.name);
        let duplicate = state.duplicate_finish.then_some(Ok(!present));
        drop(state);
        deliver(listener, Ok(present), duplicate);
    }

    fn upload(
        &self,
        item: &PendingItem,
        _root: NodeHandle,
        _mtime: i64,
        listener: Listener<NodeHandle>,
    ) {
        self.record(format!("upload:{}", item.name));
        let mut state = self.state.lock().unwrap();

        if state.quota_on.as_deref() == Some(item.name.as_str()) {
            let observer = self.observer.lock().unwrap().clone();
            tokio::spawn(async move {
                if let Some(observer) = observer {
                    observer.on_quota_exceeded(QuotaNotice {
                        kind: QuotaKind::Storage,
                        message: "storage full".to_string(),
                    });
                }
                listener.on_finish(Err(RemoteError::new(
                    RemoteErrorCode::OverQuota,
                    "storage full",
                )));
            });
            return;
        }

        let failure = state
            .failures
            .get_mut(&item.name)
            .and_then(|queue| queue.pop_front());
        let result = match failure {
            Some(err) => Err(err),
            None => {
                state.present.insert(item.name.clone());
                state.next_node += 1;
                Ok(NodeHandle(state.next_node))
            }
        };
        let duplicate = if state.duplicate_finish {
            Some(Err(RemoteError::new(RemoteErrorCode::Internal, "late")))
        } else {
            None
        };
        drop(state);
        deliver(listener, result, duplicate);
    }

    fn enable_auto_resume(&self, listener: Listener<()>) {
        self.record("enable_auto_resume");
        deliver(listener, Ok(()), None);
    }

    fn retry_pending_connections(&self) {
        self.record("retry_pending_connections");
    }

    fn set_quota_observer(&self, observer: Option<Arc<dyn QuotaObserver>>) {
        *self.observer.lock().unwrap() = observer;
    }
}

struct FakeLibrary {
    items: Mutex<Vec<PendingItem>>,
}

impl FakeLibrary {
    fn add(&self, item: PendingItem) {
        self.items.lock().unwrap().push(item);
    }
}

#[async_trait]
impl MediaLibrary for FakeLibrary {
    async fn list_candidates(
        &self,
        collection: MediaCollection,
        since_millis: i64,
    ) -> BridgeResult<Vec<PendingItem>> {
        let mut items: Vec<PendingItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.class == collection.class() && item.modified_millis() > since_millis)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        Ok(items)
    }
}

/// Replays scripted readings, then reports `steady` forever.
struct FakeNetwork {
    script: Mutex<VecDeque<NetworkInfo>>,
    steady: NetworkInfo,
}

impl FakeNetwork {
    fn steady(connection: NetworkType) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            steady: NetworkInfo::connected(connection),
        }
    }

    fn drops_after(readings: usize) -> Self {
        Self {
            script: Mutex::new(
                std::iter::repeat(NetworkInfo::connected(NetworkType::WiFi))
                    .take(readings)
                    .collect(),
            ),
            steady: NetworkInfo::disconnected(),
        }
    }
}

#[async_trait]
impl NetworkMonitor for FakeNetwork {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        let scripted = self.script.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| self.steady.clone()))
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        Err(BridgeError::NotAvailable("change stream".to_string()))
    }
}

#[derive(Default)]
struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.secrets.lock().unwrap().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.secrets.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.secrets.lock().unwrap().keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.secrets.lock().unwrap().clear();
        Ok(())
    }
}

/// Reads go to SQLite; every write is rejected.
struct ReadOnlySettings {
    inner: SqliteSettingsStore,
    rejected_writes: AtomicUsize,
}

impl ReadOnlySettings {
    fn reject(&self, key: &str) -> BridgeResult<()> {
        self.rejected_writes.fetch_add(1, Ordering::SeqCst);
        Err(BridgeError::DatabaseError(format!("disk full writing {}", key)))
    }
}

#[async_trait]
impl SettingsStore for ReadOnlySettings {
    async fn set_string(&self, key: &str, _value: &str) -> BridgeResult<()> {
        self.reject(key)
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        self.inner.get_string(key).await
    }

    async fn set_bool(&self, key: &str, _value: bool) -> BridgeResult<()> {
        self.reject(key)
    }

    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        self.inner.get_bool(key).await
    }

    async fn set_i64(&self, key: &str, _value: i64) -> BridgeResult<()> {
        self.reject(key)
    }

    async fn get_i64(&self, key: &str) -> BridgeResult<Option<i64>> {
        self.inner.get_i64(key).await
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.reject(key)
    }

    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        self.inner.has_key(key).await
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        self.inner.list_keys().await
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.reject("*")
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    remote: Arc<FakeRemote>,
    library: Arc<FakeLibrary>,
    settings: Arc<dyn SettingsStore>,
    events: EventBus,
    orchestrator: UploadOrchestrator,
}

impl Harness {
    async fn new(remote: FakeRemote, items: Vec<PendingItem>, network: FakeNetwork) -> Self {
        Self::with_token(remote, items, network, Some("session-abc")).await
    }

    async fn with_token(
        remote: FakeRemote,
        items: Vec<PendingItem>,
        network: FakeNetwork,
        token: Option<&str>,
    ) -> Self {
        let settings: Arc<dyn SettingsStore> =
            Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
        Self::assemble(remote, items, network, token, settings).await
    }

    async fn with_settings(
        remote: FakeRemote,
        items: Vec<PendingItem>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self::assemble(
            remote,
            items,
            FakeNetwork::steady(NetworkType::WiFi),
            Some("session-abc"),
            settings,
        )
        .await
    }

    async fn assemble(
        remote: FakeRemote,
        items: Vec<PendingItem>,
        network: FakeNetwork,
        token: Option<&str>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let remote = Arc::new(remote);
        let library = Arc::new(FakeLibrary {
            items: Mutex::new(items),
        });
        let secure: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::default());

        let config = CoreConfig::builder()
            .secure_store(Arc::clone(&secure))
            .settings_store(Arc::clone(&settings))
            .network_monitor(Arc::new(network))
            .media_library(library.clone())
            .remote_client(remote.clone())
            .upload_policy(UploadPolicy::default())
            .build()
            .await
            .unwrap();

        let tokens = SessionTokenStore::new(secure, config.upload_policy.session_token_key.clone());
        if let Some(token) = token {
            tokens.save(token).await.unwrap();
        }

        let events = EventBus::new(256);
        let auth = Arc::new(AuthManager::new(
            tokens,
            CompletionBridge::new(remote.clone(), config.upload_policy.keep_alive_interval),
            events.clone(),
        ));
        let orchestrator = UploadOrchestrator::new(&config, auth, events.clone());

        Self {
            remote,
            library,
            settings,
            events,
            orchestrator,
        }
    }

    async fn photo_watermark(&self) -> Option<i64> {
        self.settings.get_i64(keys::WATERMARK_PHOTOS).await.unwrap()
    }

    async fn failures_for(&self, item: &PendingItem) -> u32 {
        FailureTracker::load(Arc::clone(&self.settings), 64)
            .await
            .failure_count(&item.identity)
    }
}

fn photo(name: &str, offset_secs: i64) -> PendingItem {
    let zone = FixedOffset::east_opt(2 * 3600).unwrap();
    PendingItem {
        identity: format!("/camera/{}", name),
        name: name.to_string(),
        path: format!("/camera/{}", name).into(),
        class: MediaClass::Photo,
        modified_at: zone.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap(),
        size: 1024,
    }
}

fn upload_events(rx: &mut Receiver<CoreEvent>) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Upload(event) = event {
            events.push(event);
        }
    }
    events
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_mixed_batch_uploads_dedupes_and_tracks_failure() {
    let a = photo("A.jpg", 10);
    let b = photo("B.jpg", 20);
    let c = photo("C.jpg", 30);
    let remote = FakeRemote::new()
        .with_present("B.jpg")
        .failing("C.jpg", vec![RemoteErrorCode::Args]);
    let h = Harness::new(
        remote,
        vec![a.clone(), b.clone(), c.clone()],
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;
    let mut rx = h.events.subscribe();

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            uploaded: 1,
            already_present: 1,
            failed: 1,
            skipped: 0,
        })
    );
    assert!(outcome.is_success());
    assert_eq!(h.remote.calls_for("A.jpg"), vec!["exists:A.jpg", "upload:A.jpg"]);
    assert_eq!(h.remote.calls_for("B.jpg"), vec!["exists:B.jpg"]);
    assert_eq!(h.remote.calls_for("C.jpg"), vec!["exists:C.jpg", "upload:C.jpg"]);
    assert_eq!(h.photo_watermark().await, Some(b.modified_millis()));
    assert_eq!(h.failures_for(&c).await, 1);
    assert_eq!(h.failures_for(&a).await, 0);

    let events = upload_events(&mut rx);
    assert!(matches!(events.first(), Some(UploadEvent::RunStarted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, UploadEvent::ItemFailed { item, failures: 1, .. } if item == "C.jpg")));
    match events.last() {
        Some(UploadEvent::RunFinished {
            outcome,
            uploaded,
            already_present,
            failed,
            ..
        }) => {
            assert_eq!(outcome, "completed");
            assert_eq!((*uploaded, *already_present, *failed), (1, 1, 1));
        }
        other => panic!("unexpected last event: {:?}", other),
    }
}

#[tokio::test]
async fn test_second_run_transfers_nothing() {
    let items = vec![photo("1.jpg", 1), photo("2.jpg", 2), photo("3.jpg", 3)];
    let h = Harness::new(FakeRemote::new(), items, FakeNetwork::steady(NetworkType::WiFi)).await;

    let first = h.orchestrator.run().await;
    assert_eq!(first.summary().uploaded, 3);
    let calls_after_first = h.remote.calls().len();

    let second = h.orchestrator.run().await;
    assert_eq!(second, RunOutcome::Completed(RunSummary::default()));

    let new_calls = &h.remote.calls()[calls_after_first..];
    assert!(new_calls
        .iter()
        .all(|call| !call.starts_with("upload:") && !call.starts_with("exists:")));
}

#[tokio::test]
async fn test_lost_watermark_falls_back_to_fingerprint_dedupe() {
    let items = vec![photo("1.jpg", 1), photo("2.jpg", 2)];
    let h = Harness::new(FakeRemote::new(), items, FakeNetwork::steady(NetworkType::WiFi)).await;

    h.orchestrator.run().await;
    h.settings.delete(keys::WATERMARK_PHOTOS).await.unwrap();

    let rerun = h.orchestrator.run().await;

    assert_eq!(
        rerun,
        RunOutcome::Completed(RunSummary {
            already_present: 2,
            ..Default::default()
        })
    );
    let uploads = h
        .remote
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("upload:"))
        .count();
    assert_eq!(uploads, 2);
}

#[tokio::test]
async fn test_duplicate_terminal_callbacks_are_ignored() {
    let items = vec![photo("a.jpg", 1), photo("b.jpg", 2)];
    let h = Harness::new(
        FakeRemote::new().duplicate_finish(),
        items,
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            uploaded: 2,
            ..Default::default()
        })
    );
    assert_eq!(h.remote.calls_for("a.jpg"), vec!["exists:a.jpg", "upload:a.jpg"]);
    assert_eq!(h.remote.calls_for("b.jpg"), vec!["exists:b.jpg", "upload:b.jpg"]);
}

#[tokio::test]
async fn test_item_skipped_after_three_failures() {
    let bad = photo("bad.jpg", 5);
    let remote = FakeRemote::new().failing("bad.jpg", vec![RemoteErrorCode::Write; 10]);
    let h = Harness::new(remote, vec![bad.clone()], FakeNetwork::steady(NetworkType::WiFi)).await;

    for expected in 1..=3u32 {
        let outcome = h.orchestrator.run().await;
        assert_eq!(outcome.summary().failed, 1);
        assert_eq!(h.failures_for(&bad).await, expected);
    }
    let calls_before = h.remote.calls_for("bad.jpg").len();
    assert_eq!(calls_before, 6);

    let mut rx = h.events.subscribe();
    let fourth = h.orchestrator.run().await;

    assert_eq!(
        fourth,
        RunOutcome::Completed(RunSummary {
            skipped: 1,
            ..Default::default()
        })
    );
    assert_eq!(h.remote.calls_for("bad.jpg").len(), calls_before);
    assert!(upload_events(&mut rx)
        .iter()
        .any(|e| matches!(e, UploadEvent::ItemSkipped { failures: 3, .. })));
}

#[tokio::test]
async fn test_success_clears_failure_record() {
    let flaky = photo("flaky.jpg", 5);
    let remote = FakeRemote::new().failing(
        "flaky.jpg",
        vec![RemoteErrorCode::Args, RemoteErrorCode::Read],
    );
    let h = Harness::new(remote, vec![flaky.clone()], FakeNetwork::steady(NetworkType::WiFi)).await;

    h.orchestrator.run().await;
    h.orchestrator.run().await;
    assert_eq!(h.failures_for(&flaky).await, 2);

    let third = h.orchestrator.run().await;
    assert_eq!(third.summary().uploaded, 1);
    assert_eq!(h.failures_for(&flaky).await, 0);
    assert!(!h.settings.has_key(keys::FAILURES).await.unwrap());

    // The flaky item got through; a new failure starts counting from one.
    let later = photo("later.jpg", 50);
    h.library.add(later.clone());
    {
        let mut state = h.remote.state.lock().unwrap();
        state.failures.insert(
            "later.jpg".to_string(),
            VecDeque::from(vec![RemoteError::new(RemoteErrorCode::Read, "unreadable")]),
        );
    }

    h.orchestrator.run().await;
    assert_eq!(h.failures_for(&later).await, 1);
}

#[tokio::test]
async fn test_quota_stops_remaining_items() {
    let items: Vec<PendingItem> = (1..=5).map(|i| photo(&format!("{}.jpg", i), i)).collect();
    let h = Harness::new(
        FakeRemote::new().quota_on("2.jpg"),
        items.clone(),
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;
    let mut rx = h.events.subscribe();

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        RunOutcome::QuotaExceeded(RunSummary {
            uploaded: 1,
            ..Default::default()
        })
    );
    assert!(outcome.requires_disable());
    assert!(!outcome.is_success());
    for name in ["3.jpg", "4.jpg", "5.jpg"] {
        assert!(h.remote.calls_for(name).is_empty(), "{} was attempted", name);
    }
    assert_eq!(h.failures_for(&items[1]).await, 0);
    assert_eq!(h.photo_watermark().await, Some(items[0].modified_millis()));
    assert!(!h.remote.has_observer());
    assert!(upload_events(&mut rx)
        .iter()
        .any(|e| matches!(e, UploadEvent::QuotaExceeded { .. })));
}

#[tokio::test]
async fn test_raised_signal_prevents_any_transfer() {
    let h = Harness::new(
        FakeRemote::new(),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;
    let quota = QuotaSignal::new();
    quota.raise(QuotaNotice {
        kind: QuotaKind::Bandwidth,
        message: "transfer quota".to_string(),
    });

    let outcome = h.orchestrator.run_with_signal(quota).await;

    assert_eq!(outcome, RunOutcome::QuotaExceeded(RunSummary::default()));
    assert!(h.remote.calls_for("x.jpg").is_empty());
}

#[tokio::test]
async fn test_unmetered_policy_on_cellular_makes_no_remote_calls() {
    let h = Harness::new(
        FakeRemote::new(),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::Cellular),
    )
    .await;
    h.settings
        .set_string(keys::CONNECTION_POLICY, "unmetered_only")
        .await
        .unwrap();

    let outcome = h.orchestrator.run().await;

    assert!(matches!(outcome, RunOutcome::NotReady(_)));
    assert!(outcome.is_success());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_any_policy_allows_cellular() {
    let h = Harness::new(
        FakeRemote::new(),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::Cellular),
    )
    .await;
    h.settings
        .set_string(keys::CONNECTION_POLICY, "any")
        .await
        .unwrap();

    let outcome = h.orchestrator.run().await;

    assert_eq!(outcome.summary().uploaded, 1);
}

#[tokio::test]
async fn test_connectivity_loss_stops_loop() {
    let items = vec![photo("1.jpg", 1), photo("2.jpg", 2), photo("3.jpg", 3)];
    // One reading for the start gate, one for the first item.
    let h = Harness::new(FakeRemote::new(), items, FakeNetwork::drops_after(2)).await;

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        RunOutcome::ConnectivityLost(RunSummary {
            uploaded: 1,
            ..Default::default()
        })
    );
    assert!(h.remote.calls_for("2.jpg").is_empty());
    assert!(h.remote.calls_for("3.jpg").is_empty());
}

#[tokio::test]
async fn test_missing_token_ends_run_without_remote_calls() {
    let h = Harness::with_token(
        FakeRemote::new(),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::WiFi),
        None,
    )
    .await;

    let outcome = h.orchestrator.run().await;

    assert!(matches!(outcome, RunOutcome::NotReady(_)));
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_login_rejection_fails_run() {
    let h = Harness::new(
        FakeRemote::new().rejecting_login(RemoteErrorCode::Access),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;

    let outcome = h.orchestrator.run().await;

    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert!(!outcome.is_success());
    assert_eq!(h.remote.calls(), vec!["login"]);
}

#[tokio::test]
async fn test_missing_upload_root_ends_quietly() {
    let h = Harness::new(
        FakeRemote::new().without_root(),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;

    let outcome = h.orchestrator.run().await;

    assert_eq!(outcome, RunOutcome::RootUnavailable);
    assert!(outcome.is_success());
    assert!(h.remote.calls_for("x.jpg").is_empty());
    assert_eq!(h.settings.get_i64(keys::UPLOAD_ROOT).await.unwrap(), None);
}

#[tokio::test]
async fn test_resolved_root_is_persisted() {
    let h = Harness::new(
        FakeRemote::new(),
        vec![photo("x.jpg", 1)],
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;

    h.orchestrator.run().await;

    assert_eq!(
        h.settings.get_i64(keys::UPLOAD_ROOT).await.unwrap(),
        Some(NodeHandle(42).to_setting())
    );
}

#[tokio::test]
async fn test_out_of_memory_stops_run_and_keeps_progress() {
    let items = vec![photo("1.jpg", 1), photo("2.jpg", 2), photo("3.jpg", 3)];
    let remote = FakeRemote::new().failing("2.jpg", vec![RemoteErrorCode::OutOfMemory]);
    let h = Harness::new(remote, items.clone(), FakeNetwork::steady(NetworkType::WiFi)).await;

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        RunOutcome::ResourceExhausted(RunSummary {
            uploaded: 1,
            failed: 1,
            ..Default::default()
        })
    );
    assert!(h.remote.calls_for("3.jpg").is_empty());
    assert_eq!(h.photo_watermark().await, Some(items[0].modified_millis()));
    assert_eq!(h.failures_for(&items[1]).await, 1);
}

#[tokio::test]
async fn test_video_filter_ignores_photos() {
    let mut clip = photo("clip.mp4", 7);
    clip.class = MediaClass::Video;
    let h = Harness::new(
        FakeRemote::new(),
        vec![photo("still.jpg", 1), clip.clone()],
        FakeNetwork::steady(NetworkType::WiFi),
    )
    .await;
    h.settings
        .set_string(keys::FILE_CLASS, "videos")
        .await
        .unwrap();

    let outcome = h.orchestrator.run().await;

    assert_eq!(outcome.summary().uploaded, 1);
    assert!(h.remote.calls_for("still.jpg").is_empty());
    assert_eq!(
        h.settings.get_i64(keys::WATERMARK_VIDEOS).await.unwrap(),
        Some(clip.modified_millis())
    );
    assert_eq!(h.photo_watermark().await, None);
}

#[tokio::test]
async fn test_settings_write_failures_do_not_abort_run() {
    let good = photo("good.jpg", 1);
    let bad = photo("bad.jpg", 2);
    let settings = Arc::new(ReadOnlySettings {
        inner: SqliteSettingsStore::in_memory().await.unwrap(),
        rejected_writes: AtomicUsize::new(0),
    });
    let h = Harness::with_settings(
        FakeRemote::new().failing("bad.jpg", vec![RemoteErrorCode::Args]),
        vec![good, bad],
        settings.clone(),
    )
    .await;

    let outcome = h.orchestrator.run().await;

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            uploaded: 1,
            failed: 1,
            ..Default::default()
        })
    );
    assert_eq!(h.remote.calls_for("good.jpg"), vec!["exists:good.jpg", "upload:good.jpg"]);
    assert_eq!(h.remote.calls_for("bad.jpg"), vec!["exists:bad.jpg", "upload:bad.jpg"]);
    // Upload root, watermark and failure record writes were all attempted.
    assert!(settings.rejected_writes.load(Ordering::SeqCst) >= 3);
    assert_eq!(h.photo_watermark().await, None);
    assert!(!h.settings.has_key(keys::FAILURES).await.unwrap());
}
