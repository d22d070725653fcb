//! # Core Configuration Module
//!
//! Builds the `CoreConfig` that wires host bridges into the camera-upload core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every bridge and policy value the upload job needs.
//! It enforces fail-fast validation so a background run never starts with a
//! missing collaborator.
//!
//! ## Required Dependencies
//!
//! - `SecureStore` - Session token persistence
//! - `SettingsStore` - Run configuration, watermarks, failure records
//! - `NetworkMonitor` - Connectivity class for the network gate
//! - `MediaLibrary` - Local photo/video enumeration
//! - `RemoteClient` - Remote storage operations
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `SecureStore` and `SettingsStore` are injected automatically if not provided.
//! The SQLite settings store needs `settings_path` in that case.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, UploadPolicy};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .secure_store(Arc::new(MySecureStore))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .network_monitor(Arc::new(MyNetworkMonitor))
//!     .media_library(Arc::new(MyMediaLibrary))
//!     .remote_client(Arc::new(MyRemoteClient))
//!     .upload_policy(UploadPolicy::default().with_skip_threshold(5))
//!     .build()
//!     .await?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    Clock, MediaLibrary, NetworkMonitor, RemoteClient, SecureStore, SettingsStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted skip threshold.
pub const MAX_SKIP_THRESHOLD: u32 = 10;

/// Core configuration for the camera-upload core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Session token storage (required)
    pub secure_store: Arc<dyn SecureStore>,

    /// Key/value settings used for run configuration and progress (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Connectivity source for the network gate (required)
    pub network_monitor: Arc<dyn NetworkMonitor>,

    /// Local candidate enumeration (required)
    pub media_library: Arc<dyn MediaLibrary>,

    /// Remote storage SDK (required)
    pub remote_client: Arc<dyn RemoteClient>,

    /// Time source, defaults to the system clock
    pub clock: Arc<dyn Clock>,

    pub upload_policy: UploadPolicy,

    /// Location of the desktop settings database, if the default store is used
    pub settings_path: Option<PathBuf>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("network_monitor", &"NetworkMonitor { ... }")
            .field("media_library", &"MediaLibrary { ... }")
            .field("remote_client", &"RemoteClient { ... }")
            .field("upload_policy", &self.upload_policy)
            .field("settings_path", &self.settings_path)
            .finish()
    }
}

/// Fixed policy values for upload runs.
///
/// These are process-level constants chosen by the host, unlike the
/// per-run settings read from the `SettingsStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Consecutive failures after which an item is skipped.
    ///
    /// Default: 3, valid range 1..=10
    pub skip_threshold: u32,

    /// How often an in-flight transfer without progress nudges the connection.
    ///
    /// Default: 5 seconds
    pub keep_alive_interval: Duration,

    /// Maximum number of failing identities remembered by the tracker.
    ///
    /// Default: 64
    pub failure_record_capacity: usize,

    /// Secure-store key holding the persisted session token.
    pub session_token_key: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            skip_threshold: 3,
            keep_alive_interval: Duration::from_secs(5),
            failure_record_capacity: 64,
            session_token_key: "session_token".to_string(),
        }
    }
}

impl UploadPolicy {
    pub fn with_skip_threshold(mut self, threshold: u32) -> Self {
        self.skip_threshold = threshold;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    pub fn with_failure_record_capacity(mut self, capacity: usize) -> Self {
        self.failure_record_capacity = capacity;
        self
    }

    pub fn with_session_token_key(mut self, key: impl Into<String>) -> Self {
        self.session_token_key = key.into();
        self
    }

    /// Validates the policy values
    pub fn validate(&self) -> Result<()> {
        if self.skip_threshold == 0 || self.skip_threshold > MAX_SKIP_THRESHOLD {
            return Err(Error::Config(format!(
                "Skip threshold must be between 1 and {}, got {}",
                MAX_SKIP_THRESHOLD, self.skip_threshold
            )));
        }

        if self.keep_alive_interval.is_zero() {
            return Err(Error::Config(
                "Keep-alive interval must be greater than 0".to_string(),
            ));
        }

        if self.failure_record_capacity == 0 {
            return Err(Error::Config(
                "Failure record capacity must be greater than 0".to_string(),
            ));
        }

        if self.session_token_key.trim().is_empty() {
            return Err(Error::Config(
                "Session token key cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.settings_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Settings path cannot be empty".to_string()));
            }
        }

        self.upload_policy.validate()
    }
}

fn missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    missing(
        "SecureStore",
        "SecureStore implementation is required for session persistence. \
         Desktop: ensure the 'desktop-shims' feature is enabled to use the default KeyringSecureStore. \
         Mobile: inject platform-native secure storage (Keychain/Keystore).",
    )
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    missing(
        "SettingsStore",
        "SettingsStore implementation is required for upload settings and progress. \
         Desktop: ensure the 'desktop-shims' feature is enabled to use the default SqliteSettingsStore. \
         Mobile: inject platform-native settings (UserDefaults/DataStore).",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_settings_store(
    settings_path: Option<&PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;

    let path = settings_path.cloned().ok_or_else(|| {
        Error::Config(
            "Settings path is required for the default SettingsStore. \
             Use .settings_path() or inject a SettingsStore."
                .to_string(),
        )
    })?;

    let store = SqliteSettingsStore::new(path).await.map_err(|e| {
        Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
    })?;

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_settings_store(
    _settings_path: Option<&PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once every required bridge has
/// been set. Missing bridges produce `Error::CapabilityMissing` naming the
/// capability.
#[derive(Default)]
pub struct CoreConfigBuilder {
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    media_library: Option<Arc<dyn MediaLibrary>>,
    remote_client: Option<Arc<dyn RemoteClient>>,
    clock: Option<Arc<dyn Clock>>,
    upload_policy: Option<UploadPolicy>,
    settings_path: Option<PathBuf>,
}

impl CoreConfigBuilder {
    /// Sets the secure store implementation (required).
    ///
    /// The secure store holds the persisted session token. It must provide
    /// platform-appropriate security (Keychain on macOS/iOS, Keystore on
    /// Android, the OS keyring on desktop).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the settings store implementation (required).
    ///
    /// Every write made by an upload run is a single key write, so the
    /// store only needs per-key atomicity.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the network monitor implementation (required).
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the media library implementation (required).
    pub fn media_library(mut self, library: Arc<dyn MediaLibrary>) -> Self {
        self.media_library = Some(library);
        self
    }

    /// Sets the remote client implementation (required).
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use core_runtime::config::CoreConfig;
    /// use std::sync::Arc;
    ///
    /// let builder = CoreConfig::builder()
    ///     .remote_client(Arc::new(MyRemoteClient::new(sdk_handle)));
    /// ```
    pub fn remote_client(mut self, client: Arc<dyn RemoteClient>) -> Self {
        self.remote_client = Some(client);
        self
    }

    /// Overrides the time source.
    ///
    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the upload policy.
    ///
    /// Default: [`UploadPolicy::default()`]
    pub fn upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = Some(policy);
        self
    }

    /// Sets where the default desktop settings database lives.
    ///
    /// Only used when no `SettingsStore` is injected and the `desktop-shims`
    /// feature is enabled.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - A required bridge is missing
    /// - The default settings store cannot be opened
    /// - Policy values are out of range
    pub async fn build(self) -> Result<CoreConfig> {
        let network_monitor = self.network_monitor.ok_or_else(|| {
            missing(
                "NetworkMonitor",
                "NetworkMonitor implementation is required to evaluate the connection policy. \
                 Desktop: use bridge_desktop::DesktopNetworkMonitor.",
            )
        })?;

        let media_library = self.media_library.ok_or_else(|| {
            missing(
                "MediaLibrary",
                "MediaLibrary implementation is required to enumerate local photos and videos. \
                 Desktop: use bridge_desktop::DirectoryMediaLibrary.",
            )
        })?;

        let remote_client = self.remote_client.ok_or_else(|| {
            missing(
                "RemoteClient",
                "RemoteClient implementation is required to reach the remote storage account.",
            )
        })?;

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path.as_ref()).await?,
        };

        let config = CoreConfig {
            secure_store,
            settings_store,
            network_monitor,
            media_library,
            remote_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            upload_policy: self.upload_policy.unwrap_or_default(),
            settings_path: self.settings_path,
        };

        config.validate()?;

        Ok(config)
    }
}
