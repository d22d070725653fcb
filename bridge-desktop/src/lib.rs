//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SecureStore` using the `keyring` crate
//! - `SettingsStore` using an SQLite-backed key-value table
//! - `NetworkMonitor` using a TCP reachability check
//! - `MediaLibrary` walking the user's picture and video directories
//!
//! The remote SDK adapter is not provided here; hosts inject their own
//! `RemoteClient`.
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryMediaLibrary, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = SqliteSettingsStore::new("camera-uploads.db".into()).await?;
//!     let media = DirectoryMediaLibrary::new();
//!     // Use in core configuration
//! }
//! ```

mod media;
mod network;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use media::DirectoryMediaLibrary;
pub use network::DesktopNetworkMonitor;
pub use settings::SqliteSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
