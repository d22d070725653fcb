//! # Run Configuration
//!
//! Settings read once at the start of every run. Reads never fail the run:
//! a missing or unreadable key falls back to its default.
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `camera_uploads.connection_policy` | `any` / `unmetered_only` | `unmetered_only` |
//! | `camera_uploads.file_class` | `photos` / `videos` / `both` | `photos` |
//! | `camera_uploads.upload_root` | i64 node handle | absent |
//! | `camera_uploads.watermark.photos` | i64 epoch millis | 0 |
//! | `camera_uploads.watermark.videos` | i64 epoch millis | 0 |
//! | `camera_uploads.failures` | JSON failure records | empty |
//! | `camera_uploads.enabled` | bool | true |

use crate::network_gate::ConnectionPolicy;
use crate::watermark::Watermarks;
use bridge_traits::{MediaCollection, NodeHandle, SettingsStore};
use tracing::{debug, warn};

/// Settings keys owned by the upload job.
pub mod keys {
    pub const CONNECTION_POLICY: &str = "camera_uploads.connection_policy";
    pub const FILE_CLASS: &str = "camera_uploads.file_class";
    pub const UPLOAD_ROOT: &str = "camera_uploads.upload_root";
    pub const WATERMARK_PHOTOS: &str = "camera_uploads.watermark.photos";
    pub const WATERMARK_VIDEOS: &str = "camera_uploads.watermark.videos";
    pub const FAILURES: &str = "camera_uploads.failures";
    pub const ENABLED: &str = "camera_uploads.enabled";
}

/// Which local collections a run uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileClassFilter {
    #[default]
    Photos,
    Videos,
    Both,
}

impl FileClassFilter {
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "photos" => Some(Self::Photos),
            "videos" => Some(Self::Videos),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_setting(&self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Videos => "videos",
            Self::Both => "both",
        }
    }

    /// Collections to enumerate, in processing order.
    pub fn collections(&self) -> Vec<MediaCollection> {
        match self {
            Self::Photos => vec![MediaCollection::Pictures],
            Self::Videos => vec![MediaCollection::Videos],
            Self::Both => vec![MediaCollection::Pictures, MediaCollection::Videos],
        }
    }
}

/// Immutable settings snapshot for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunConfiguration {
    pub connection_policy: ConnectionPolicy,
    pub file_class: FileClassFilter,
    pub upload_root: Option<NodeHandle>,
    pub watermarks: Watermarks,
}

impl RunConfiguration {
    pub async fn load(settings: &dyn SettingsStore) -> Self {
        let connection_policy = read_string(settings, keys::CONNECTION_POLICY)
            .await
            .map(|raw| ConnectionPolicy::from_setting(&raw))
            .unwrap_or_default();

        let file_class = match read_string(settings, keys::FILE_CLASS).await {
            Some(raw) => FileClassFilter::from_setting(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown file class, uploading photos only");
                FileClassFilter::default()
            }),
            None => FileClassFilter::default(),
        };

        let upload_root = read_i64(settings, keys::UPLOAD_ROOT)
            .await
            .map(NodeHandle::from_setting);

        let watermarks = Watermarks {
            photos: read_i64(settings, keys::WATERMARK_PHOTOS).await.unwrap_or(0),
            videos: read_i64(settings, keys::WATERMARK_VIDEOS).await.unwrap_or(0),
        };

        let config = Self {
            connection_policy,
            file_class,
            upload_root,
            watermarks,
        };
        debug!(?config, "Run configuration loaded");
        config
    }
}

/// Whether scheduled runs are enabled. Unreadable means enabled.
pub async fn is_enabled(settings: &dyn SettingsStore) -> bool {
    match settings.get_bool(keys::ENABLED).await {
        Ok(value) => value.unwrap_or(true),
        Err(e) => {
            warn!(key = keys::ENABLED, error = %e, "Could not read setting, using default");
            true
        }
    }
}

pub async fn set_enabled(
    settings: &dyn SettingsStore,
    enabled: bool,
) -> bridge_traits::error::Result<()> {
    settings.set_bool(keys::ENABLED, enabled).await
}

async fn read_string(settings: &dyn SettingsStore, key: &str) -> Option<String> {
    match settings.get_string(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Could not read setting, using default");
            None
        }
    }
}

async fn read_i64(settings: &dyn SettingsStore, key: &str) -> Option<i64> {
    match settings.get_i64(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Could not read setting, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::SqliteSettingsStore;

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        let config = RunConfiguration::load(&store).await;

        assert_eq!(config, RunConfiguration::default());
        assert_eq!(config.connection_policy, ConnectionPolicy::UnmeteredOnly);
        assert_eq!(config.file_class, FileClassFilter::Photos);
        assert!(config.upload_root.is_none());
        assert!(is_enabled(&store).await);
    }

    #[tokio::test]
    async fn test_reads_stored_values() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_string(keys::CONNECTION_POLICY, "any").await.unwrap();
        store.set_string(keys::FILE_CLASS, "both").await.unwrap();
        store.set_i64(keys::UPLOAD_ROOT, 99).await.unwrap();
        store.set_i64(keys::WATERMARK_VIDEOS, 1_700_000_000_000).await.unwrap();

        let config = RunConfiguration::load(&store).await;
        assert_eq!(config.connection_policy, ConnectionPolicy::AnyConnection);
        assert_eq!(config.file_class, FileClassFilter::Both);
        assert_eq!(config.upload_root, Some(NodeHandle(99)));
        assert_eq!(config.watermarks.photos, 0);
        assert_eq!(config.watermarks.videos, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_unknown_policy_kept_unrecognized() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store
            .set_string(keys::CONNECTION_POLICY, "roaming_ok")
            .await
            .unwrap();

        let config = RunConfiguration::load(&store).await;
        assert_eq!(
            config.connection_policy,
            ConnectionPolicy::Unrecognized("roaming_ok".to_string())
        );
    }

    #[tokio::test]
    async fn test_wrong_type_falls_back_to_default() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_string(keys::WATERMARK_PHOTOS, "yesterday").await.unwrap();
        store.set_string(keys::ENABLED, "maybe").await.unwrap();

        let config = RunConfiguration::load(&store).await;
        assert_eq!(config.watermarks.photos, 0);
        assert!(is_enabled(&store).await);
    }

    #[tokio::test]
    async fn test_set_enabled() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        set_enabled(&store, false).await.unwrap();
        assert!(!is_enabled(&store).await);
    }

    #[test]
    fn test_collections_order() {
        assert_eq!(
            FileClassFilter::Both.collections(),
            vec![MediaCollection::Pictures, MediaCollection::Videos]
        );
        assert_eq!(FileClassFilter::from_setting("raw"), None);
    }
}
