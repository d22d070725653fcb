//! # Upload Orchestrator
//!
//! Runs one camera-upload pass.
//!
//! ## Workflow
//!
//! 1. Load [`RunConfiguration`] from settings
//! 2. Check the [`NetworkGate`]; a closed gate ends the run before any remote call
//! 3. Authenticate with the persisted session token
//! 4. Fetch the remote index (dedupe against a stale index would duplicate files)
//! 5. Resolve or create the upload folder; absence ends the run quietly
//! 6. Install the [`QuotaSignal`] as quota observer
//! 7. Enumerate candidates newer than each class's watermark
//! 8. For each candidate, in order:
//!    - skip it if the failure tracker says so
//!    - re-check the gate, stop the run if it closed
//!    - dedupe by fingerprint and modification time, upload if absent
//!    - commit tracker and watermark writes before the next item
//!
//! Any remote step races the quota signal; once raised, no further item is
//! attempted.

use crate::network_gate::NetworkGate;
use crate::outcome::{RunOutcome, RunSummary, TransferOutcome, UploadRunId};
use crate::quota::QuotaSignal;
use crate::run_config::{keys, RunConfiguration};
use crate::tracker::FailureTracker;
use crate::watermark::WatermarkTracker;
use bridge_traits::{
    Clock, FailureClass, MediaLibrary, NetworkMonitor, NodeHandle, PendingItem, QuotaKind,
    QuotaNotice, RemoteClient, RemoteError, SettingsStore,
};
use core_auth::{AuthError, AuthManager};
use core_runtime::config::{CoreConfig, UploadPolicy};
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use core_runtime::CompletionBridge;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Modification time as the transfer layer stamps it.
///
/// The transfer layer has no time zone: the item's local wall-clock time is
/// read as if it were UTC and expressed in whole seconds since the epoch.
pub fn transfer_mtime(item: &PendingItem) -> i64 {
    item.modified_at.naive_local().and_utc().timestamp()
}

pub struct UploadOrchestrator {
    settings: Arc<dyn SettingsStore>,
    network_monitor: Arc<dyn NetworkMonitor>,
    media_library: Arc<dyn MediaLibrary>,
    bridge: CompletionBridge,
    auth: Arc<AuthManager>,
    event_bus: EventBus,
    policy: UploadPolicy,
    clock: Arc<dyn Clock>,
}

impl UploadOrchestrator {
    pub fn new(config: &CoreConfig, auth: Arc<AuthManager>, event_bus: EventBus) -> Self {
        Self {
            settings: Arc::clone(&config.settings_store),
            network_monitor: Arc::clone(&config.network_monitor),
            media_library: Arc::clone(&config.media_library),
            bridge: CompletionBridge::new(
                Arc::clone(&config.remote_client),
                config.upload_policy.keep_alive_interval,
            ),
            auth,
            event_bus,
            policy: config.upload_policy.clone(),
            clock: Arc::clone(&config.clock),
        }
    }

    /// Run once with a fresh quota signal.
    pub async fn run(&self) -> RunOutcome {
        self.run_with_signal(QuotaSignal::new()).await
    }

    /// Run once, aborting as soon as `quota` is raised.
    pub async fn run_with_signal(&self, quota: QuotaSignal) -> RunOutcome {
        let run_id = UploadRunId::new();
        let started = self.clock.unix_timestamp_millis();
        self.emit(UploadEvent::RunStarted {
            run_id: run_id.to_string(),
        });

        let outcome = self.execute(run_id, &quota).await;

        let summary = outcome.summary();
        let duration_ms = (self.clock.unix_timestamp_millis() - started).max(0) as u64;
        info!(
            run_id = %run_id,
            outcome = %outcome,
            uploaded = summary.uploaded,
            already_present = summary.already_present,
            failed = summary.failed,
            skipped = summary.skipped,
            duration_ms,
            "Upload run finished"
        );
        self.emit(UploadEvent::RunFinished {
            run_id: run_id.to_string(),
            outcome: outcome.label().to_string(),
            uploaded: summary.uploaded,
            already_present: summary.already_present,
            failed: summary.failed,
            skipped: summary.skipped,
            duration_ms,
        });

        outcome
    }

    #[instrument(skip(self, run_id, quota), fields(run_id = %run_id))]
    async fn execute(&self, run_id: UploadRunId, quota: &QuotaSignal) -> RunOutcome {
        let config = RunConfiguration::load(self.settings.as_ref()).await;

        let gate = NetworkGate::new(
            Arc::clone(&self.network_monitor),
            config.connection_policy.clone(),
        );
        let decision = gate.check().await;
        if !decision.is_allowed() {
            info!(decision = %decision, "Network gate closed, not starting");
            return RunOutcome::NotReady(format!("network gate closed: {}", decision));
        }

        if let Err(err) = self.auth.authenticate().await {
            error!(error = %err, "Authentication failed");
            return match err {
                AuthError::LoginFailed(_) => RunOutcome::Failed(err.to_string()),
                _ => RunOutcome::NotReady(err.to_string()),
            };
        }

        if let Err(err) = self
            .bridge
            .await_operation("fetch_remote_index", |remote, listener| {
                remote.fetch_remote_index(listener)
            })
            .await
        {
            error!(error = %err, "Fetching remote index failed");
            return RunOutcome::Failed(format!("remote index: {}", err));
        }

        let root = match self.resolve_root(config.upload_root).await {
            Ok(Some(root)) => root,
            Ok(None) => {
                info!("Upload folder unavailable, retrying next run");
                return RunOutcome::RootUnavailable;
            }
            Err(err) => {
                error!(error = %err, "Resolving upload folder failed");
                return RunOutcome::Failed(format!("upload folder: {}", err));
            }
        };

        if let Err(err) = self
            .bridge
            .await_operation("enable_auto_resume", |remote, listener| {
                remote.enable_auto_resume(listener)
            })
            .await
        {
            warn!(error = %err, "Could not enable transfer auto-resume");
        }

        let _registration = QuotaRegistration::install(self.bridge.remote(), quota);

        let candidates = self.enumerate(&config).await;
        info!(candidates = candidates.len(), root = %root, "Starting per-item loop");

        self.process_items(run_id, root, &gate, quota, &config, candidates)
            .await
    }

    async fn resolve_root(
        &self,
        hint: Option<NodeHandle>,
    ) -> std::result::Result<Option<NodeHandle>, RemoteError> {
        let root = self
            .bridge
            .await_operation("resolve_upload_root", |remote, listener| {
                remote.resolve_or_create_upload_root(hint, listener)
            })
            .await?;

        if let Some(handle) = root {
            if Some(handle) != hint {
                if let Err(e) = self
                    .settings
                    .set_i64(keys::UPLOAD_ROOT, handle.to_setting())
                    .await
                {
                    warn!(error = %e, "Could not persist upload folder handle");
                }
            }
        }
        Ok(root)
    }

    async fn enumerate(&self, config: &RunConfiguration) -> Vec<PendingItem> {
        let mut candidates = Vec::new();
        for collection in config.file_class.collections() {
            let since = config.watermarks.get(collection.class());
            match self.media_library.list_candidates(collection, since).await {
                Ok(items) => {
                    debug!(?collection, since, count = items.len(), "Listed candidates");
                    candidates.extend(items);
                }
                Err(e) => {
                    warn!(?collection, error = %e, "Could not enumerate collection, skipping it");
                }
            }
        }
        candidates
    }

    async fn process_items(
        &self,
        run_id: UploadRunId,
        root: NodeHandle,
        gate: &NetworkGate,
        quota: &QuotaSignal,
        config: &RunConfiguration,
        candidates: Vec<PendingItem>,
    ) -> RunOutcome {
        let run = run_id.to_string();
        let threshold = self.policy.skip_threshold;
        let mut tracker = FailureTracker::load(
            Arc::clone(&self.settings),
            self.policy.failure_record_capacity,
        )
        .await;
        let mut watermarks = WatermarkTracker::new(Arc::clone(&self.settings), config.watermarks);
        let mut summary = RunSummary::default();

        for item in candidates {
            if quota.is_raised() {
                return self.quota_stop(&run, quota, summary);
            }

            if tracker.should_skip(&item.identity, threshold) {
                let failures = tracker.failure_count(&item.identity);
                info!(item = %item.name, failures, "Skipping item over failure threshold");
                summary.skipped += 1;
                if let Err(e) = watermarks.hold_before(&item).await {
                    warn!(item = %item.name, error = %e, "Could not persist watermark");
                }
                self.emit(UploadEvent::ItemSkipped {
                    run_id: run.clone(),
                    item: item.name.clone(),
                    failures,
                });
                continue;
            }

            let decision = gate.check().await;
            if !decision.is_allowed() {
                warn!(decision = %decision, "Connectivity lost, stopping run");
                return RunOutcome::ConnectivityLost(summary);
            }

            let mtime = transfer_mtime(&item);
            match self.transfer_item(&item, root, mtime, quota).await {
                TransferOutcome::Success => {
                    info!(item = %item.name, "Uploaded");
                    summary.uploaded += 1;
                    self.record_success(&mut tracker, &mut watermarks, &item)
                        .await;
                    self.emit(UploadEvent::ItemUploaded {
                        run_id: run.clone(),
                        item: item.name.clone(),
                    });
                }
                TransferOutcome::AlreadyPresent => {
                    debug!(item = %item.name, "Already present remotely");
                    summary.already_present += 1;
                    self.record_success(&mut tracker, &mut watermarks, &item)
                        .await;
                    self.emit(UploadEvent::ItemAlreadyPresent {
                        run_id: run.clone(),
                        item: item.name.clone(),
                    });
                }
                TransferOutcome::QuotaExceeded { message } => {
                    quota.raise(QuotaNotice {
                        kind: QuotaKind::Storage,
                        message,
                    });
                    return self.quota_stop(&run, quota, summary);
                }
                TransferOutcome::Failed(err) => {
                    let class = err.classify();
                    if class == FailureClass::QuotaExceeded {
                        quota.raise(QuotaNotice {
                            kind: QuotaKind::Storage,
                            message: err.message.clone(),
                        });
                        return self.quota_stop(&run, quota, summary);
                    }

                    let failures = self
                        .record_failure(&mut tracker, &mut watermarks, &item)
                        .await;
                    summary.failed += 1;
                    self.emit(UploadEvent::ItemFailed {
                        run_id: run.clone(),
                        item: item.name.clone(),
                        failures,
                        reason: err.to_string(),
                    });

                    if class == FailureClass::ResourceExhausted {
                        error!(item = %item.name, error = %err, "Out of local resources, stopping run");
                        return RunOutcome::ResourceExhausted(summary);
                    }
                    warn!(item = %item.name, failures, error = %err, "Item failed, continuing");
                }
            }
        }

        RunOutcome::Completed(summary)
    }

    /// Dedupe then transfer one item, racing the quota signal.
    async fn transfer_item(
        &self,
        item: &PendingItem,
        root: NodeHandle,
        mtime: i64,
        quota: &QuotaSignal,
    ) -> TransferOutcome {
        let exists = tokio::select! {
            biased;
            notice = quota.raised() => {
                return TransferOutcome::QuotaExceeded { message: notice.message };
            }
            result = self.bridge.await_operation("exists_by_fingerprint", |remote, listener| {
                remote.exists_by_fingerprint(item, root, mtime, listener)
            }) => result,
        };

        match exists {
            Ok(true) => return TransferOutcome::AlreadyPresent,
            Ok(false) => {}
            Err(err) => return TransferOutcome::Failed(err),
        }

        let uploaded = tokio::select! {
            biased;
            notice = quota.raised() => {
                return TransferOutcome::QuotaExceeded { message: notice.message };
            }
            result = self.bridge.await_transfer("upload", |remote, listener| {
                remote.upload(item, root, mtime, listener)
            }) => result,
        };

        match uploaded {
            Ok(node) => {
                debug!(item = %item.name, node = %node, "Transfer finished");
                TransferOutcome::Success
            }
            Err(err) => TransferOutcome::Failed(err),
        }
    }

    async fn record_success(
        &self,
        tracker: &mut FailureTracker,
        watermarks: &mut WatermarkTracker,
        item: &PendingItem,
    ) {
        if let Err(e) = tracker.clear(&item.identity).await {
            warn!(item = %item.name, error = %e, "Could not persist failure records");
        }
        if let Err(e) = watermarks.advance(item).await {
            warn!(item = %item.name, error = %e, "Could not persist watermark");
        }
    }

    async fn record_failure(
        &self,
        tracker: &mut FailureTracker,
        watermarks: &mut WatermarkTracker,
        item: &PendingItem,
    ) -> u32 {
        let failures = match tracker.record_failure(&item.identity).await {
            Ok(count) => count,
            Err(e) => {
                warn!(item = %item.name, error = %e, "Could not persist failure records");
                tracker.failure_count(&item.identity)
            }
        };
        if let Err(e) = watermarks.hold_before(item).await {
            warn!(item = %item.name, error = %e, "Could not persist watermark");
        }
        failures
    }

    fn quota_stop(&self, run: &str, quota: &QuotaSignal, summary: RunSummary) -> RunOutcome {
        let message = quota
            .notice()
            .map(|notice| notice.message)
            .unwrap_or_default();
        error!(message = %message, "Quota exceeded, stopping run");
        self.emit(UploadEvent::QuotaExceeded {
            run_id: run.to_string(),
            message,
        });
        RunOutcome::QuotaExceeded(summary)
    }

    fn emit(&self, event: UploadEvent) {
        self.event_bus.emit(CoreEvent::Upload(event)).ok();
    }
}

/// Keeps the quota signal installed on the remote client until dropped.
struct QuotaRegistration {
    remote: Arc<dyn RemoteClient>,
}

impl QuotaRegistration {
    fn install(remote: &Arc<dyn RemoteClient>, signal: &QuotaSignal) -> Self {
        remote.set_quota_observer(Some(Arc::new(signal.clone())));
        Self {
            remote: Arc::clone(remote),
        }
    }
}

impl Drop for QuotaRegistration {
    fn drop(&mut self) {
        self.remote.set_quota_observer(None);
    }
}
