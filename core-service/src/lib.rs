//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (secure storage,
//! settings, connectivity, media enumeration, remote SDK) into the camera
//! upload core. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`); mobile hosts inject their own
//! adapters through [`CoreConfig`].
//!
//! The background scheduler only ever sees a [`BackgroundRunResult`]:
//! everything that goes wrong inside a run is logged and folded into that
//! coarse result.

pub mod connectivity;
pub mod error;

pub use connectivity::ConnectivityService;
pub use error::{CoreError, Result};

use std::sync::Arc;

use core_auth::{AuthManager, SessionTokenStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::CompletionBridge;
use core_upload::run_config::{is_enabled, set_enabled};
use core_upload::{FailureTracker, QuotaSignal, RunOutcome, UploadOrchestrator};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, instrument, warn};

#[cfg(feature = "desktop-shims")]
use bridge_traits::RemoteClient;
#[cfg(feature = "desktop-shims")]
use std::path::PathBuf;

const EVENT_CAPACITY: usize = 256;

/// Coarse result reported back to the host's background-task scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundRunResult {
    /// The run finished or ended early for a reason the next run may clear.
    Succeeded,
    /// The run failed; the scheduler may retry with backoff.
    Failed,
    /// Camera uploads are switched off. Do not reschedule until re-enabled.
    Disabled,
}

impl From<&RunOutcome> for BackgroundRunResult {
    fn from(outcome: &RunOutcome) -> Self {
        if outcome.requires_disable() {
            BackgroundRunResult::Disabled
        } else if outcome.is_success() {
            BackgroundRunResult::Succeeded
        } else {
            BackgroundRunResult::Failed
        }
    }
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    config: CoreConfig,
    connectivity: Arc<ConnectivityService>,
    auth: Arc<AuthManager>,
    orchestrator: UploadOrchestrator,
    event_bus: EventBus,
    run_lock: Mutex<()>,
}

impl CoreService {
    /// Build the service from a validated configuration and start the
    /// connectivity subscription.
    ///
    /// The orchestrator polls the connectivity service, never the raw
    /// monitor from `config`.
    pub async fn start(mut config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let connectivity = Arc::new(ConnectivityService::new(Arc::clone(
            &config.network_monitor,
        )));
        connectivity.start().await;
        config.network_monitor = connectivity.clone();

        let event_bus = EventBus::new(EVENT_CAPACITY);
        let policy = &config.upload_policy;
        let auth = Arc::new(AuthManager::new(
            SessionTokenStore::new(
                Arc::clone(&config.secure_store),
                policy.session_token_key.clone(),
            ),
            CompletionBridge::new(
                Arc::clone(&config.remote_client),
                policy.keep_alive_interval,
            ),
            event_bus.clone(),
        ));
        let orchestrator = UploadOrchestrator::new(&config, Arc::clone(&auth), event_bus.clone());

        info!(policy = ?config.upload_policy, "Core service started");

        Ok(Self {
            config,
            connectivity,
            auth,
            orchestrator,
            event_bus,
            run_lock: Mutex::new(()),
        })
    }

    /// Run one camera-upload pass.
    ///
    /// Overlapping calls are serialized. On quota exhaustion the job disables
    /// itself; [`set_camera_uploads_enabled`](Self::set_camera_uploads_enabled)
    /// turns it back on.
    #[instrument(skip(self))]
    pub async fn run_camera_uploads(&self) -> BackgroundRunResult {
        let _guard = self.run_lock.lock().await;
        let settings = self.config.settings_store.as_ref();

        if !is_enabled(settings).await {
            info!("Camera uploads disabled, not running");
            return BackgroundRunResult::Disabled;
        }

        let outcome = self.orchestrator.run_with_signal(QuotaSignal::new()).await;

        if outcome.requires_disable() {
            warn!("Quota exhausted, disabling camera uploads");
            if let Err(e) = set_enabled(settings, false).await {
                error!(error = %e, "Could not persist disabled state");
            }
        }

        let result = BackgroundRunResult::from(&outcome);
        info!(outcome = %outcome, result = ?result, "Background run reported");
        result
    }

    pub async fn camera_uploads_enabled(&self) -> bool {
        is_enabled(self.config.settings_store.as_ref()).await
    }

    pub async fn set_camera_uploads_enabled(&self, enabled: bool) -> Result<()> {
        set_enabled(self.config.settings_store.as_ref(), enabled).await?;
        info!(enabled, "Camera uploads toggled");
        Ok(())
    }

    /// Forget every per-item failure count, so skipped items are retried.
    pub async fn reset_failures(&self) -> Result<()> {
        let mut tracker = FailureTracker::load(
            Arc::clone(&self.config.settings_store),
            self.config.upload_policy.failure_record_capacity,
        )
        .await;
        let forgotten = tracker.len();
        tracker.reset().await?;
        info!(forgotten, "Failure records reset");
        Ok(())
    }

    pub fn auth(&self) -> Arc<AuthManager> {
        Arc::clone(&self.auth)
    }

    pub fn connectivity(&self) -> Arc<ConnectivityService> {
        Arc::clone(&self.connectivity)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Tear down the connectivity subscription.
    pub async fn shutdown(&self) {
        self.connectivity.shutdown().await;
        info!("Core service stopped");
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses the keyring secure store, an SQLite settings database at
/// `settings_path`, the TCP reachability monitor and the user's picture and
/// video directories. Only the remote SDK adapter has to be supplied.
///
/// ```ignore
/// use core_service::bootstrap_desktop;
///
/// let core = bootstrap_desktop(remote, "camera-uploads.db".into()).await?;
/// let result = core.run_camera_uploads().await;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    remote: Arc<dyn RemoteClient>,
    settings_path: PathBuf,
) -> Result<CoreService> {
    use bridge_desktop::{DesktopNetworkMonitor, DirectoryMediaLibrary};

    let config = CoreConfig::builder()
        .network_monitor(Arc::new(DesktopNetworkMonitor::new()))
        .media_library(Arc::new(DirectoryMediaLibrary::new()))
        .remote_client(remote)
        .settings_path(settings_path)
        .build()
        .await?;

    CoreService::start(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_upload::RunSummary;

    #[test]
    fn test_background_result_mapping() {
        let summary = RunSummary::default();
        let cases = [
            (RunOutcome::Completed(summary), BackgroundRunResult::Succeeded),
            (
                RunOutcome::NotReady("offline".to_string()),
                BackgroundRunResult::Succeeded,
            ),
            (RunOutcome::RootUnavailable, BackgroundRunResult::Succeeded),
            (
                RunOutcome::ConnectivityLost(summary),
                BackgroundRunResult::Succeeded,
            ),
            (
                RunOutcome::Failed("index".to_string()),
                BackgroundRunResult::Failed,
            ),
            (
                RunOutcome::ResourceExhausted(summary),
                BackgroundRunResult::Failed,
            ),
            (
                RunOutcome::QuotaExceeded(summary),
                BackgroundRunResult::Disabled,
            ),
        ];

        for (outcome, expected) in cases {
            assert_eq!(BackgroundRunResult::from(&outcome), expected, "{}", outcome);
        }
    }

    #[test]
    fn test_runtime_error_mapping() {
        let missing: CoreError = core_runtime::Error::CapabilityMissing {
            capability: "RemoteClient".to_string(),
            message: "inject it".to_string(),
        }
        .into();
        assert!(matches!(missing, CoreError::CapabilityMissing { ref capability, .. } if capability == "RemoteClient"));

        let config: CoreError = core_runtime::Error::Config("skip_threshold".to_string()).into();
        assert!(matches!(config, CoreError::InitializationFailed(_)));
    }
}
