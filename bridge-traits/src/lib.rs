//! # Host Bridge Traits
//!
//! Contracts between the camera-upload core and the host platform.
//!
//! ## Overview
//!
//! The core drives a background upload run but owns none of the platform
//! machinery it depends on. Each trait in this crate names one such
//! capability; hosts (desktop, iOS, Android) ship concrete adapters.
//!
//! ## Traits
//!
//! ### Remote storage
//! - [`RemoteClient`](remote::RemoteClient) - Push-style remote SDK operations
//! - [`OperationListener`](remote::OperationListener) - Per-operation callbacks
//! - [`QuotaObserver`](remote::QuotaObserver) - Out-of-band quota notices
//!
//! ### Local state
//! - [`MediaLibrary`](media::MediaLibrary) - Enumerates local photos and videos
//! - [`SecureStore`](storage::SecureStore) - Session token persistence (Keychain/Keystore)
//! - [`SettingsStore`](storage::SettingsStore) - Key-value run configuration and progress
//!
//! ### Platform integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity and metered network detection
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! is missing:
//!
//! ```ignore
//! let remote = config.remote_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "RemoteClient".to_string(),
//!         message: "Inject the platform remote SDK adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! Bridges require `Send + Sync` on native targets. Remote listeners in
//! particular are invoked from the SDK's own notification thread.

pub mod error;
pub mod media;
pub mod network;
pub mod platform;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use media::{MediaClass, MediaCollection, MediaLibrary, PendingItem};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use remote::{
    FailureClass, Listener, NodeHandle, OperationListener, QuotaKind, QuotaNotice, QuotaObserver,
    RemoteClient, RemoteError, RemoteErrorCode, RemoteSession,
};
pub use storage::{SecureStore, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
