//! Media Library Implementation over local directories

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{MediaCollection, MediaLibrary, PendingItem},
};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "gif", "webp", "dng", "tif", "tiff",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "mkv", "avi", "webm"];

/// Media library that walks the user's picture and video folders
///
/// Hidden files and directories are ignored. A collection whose directory is
/// not configured or does not exist lists as empty.
pub struct DirectoryMediaLibrary {
    pictures_dir: Option<PathBuf>,
    videos_dir: Option<PathBuf>,
}

impl DirectoryMediaLibrary {
    /// Use the platform's default picture and video directories
    pub fn new() -> Self {
        Self {
            pictures_dir: dirs::picture_dir(),
            videos_dir: dirs::video_dir(),
        }
    }

    pub fn with_directories(pictures_dir: Option<PathBuf>, videos_dir: Option<PathBuf>) -> Self {
        Self {
            pictures_dir,
            videos_dir,
        }
    }

    fn root_for(&self, collection: MediaCollection) -> Option<&Path> {
        match collection {
            MediaCollection::Pictures => self.pictures_dir.as_deref(),
            MediaCollection::Videos => self.videos_dir.as_deref(),
        }
    }

    fn extensions_for(collection: MediaCollection) -> &'static [&'static str] {
        match collection {
            MediaCollection::Pictures => PHOTO_EXTENSIONS,
            MediaCollection::Videos => VIDEO_EXTENSIONS,
        }
    }

    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
    }

    fn has_extension(path: &Path, extensions: &[&str]) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                extensions.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    fn to_pending_item(
        path: PathBuf,
        metadata: &std::fs::Metadata,
        collection: MediaCollection,
    ) -> Result<PendingItem> {
        let modified = metadata.modified().map_err(BridgeError::Io)?;
        let local: DateTime<Local> = modified.into();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(PendingItem {
            identity: path.to_string_lossy().into_owned(),
            name,
            path,
            class: collection.class(),
            modified_at: local.fixed_offset(),
            size: metadata.len(),
        })
    }
}

impl Default for DirectoryMediaLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaLibrary for DirectoryMediaLibrary {
    async fn list_candidates(
        &self,
        collection: MediaCollection,
        since_millis: i64,
    ) -> Result<Vec<PendingItem>> {
        let Some(root) = self.root_for(collection) else {
            debug!(?collection, "No directory configured for collection");
            return Ok(Vec::new());
        };

        if !fs::try_exists(root).await.unwrap_or(false) {
            debug!(?collection, path = ?root, "Collection directory missing");
            return Ok(Vec::new());
        }

        let extensions = Self::extensions_for(collection);
        let mut items = Vec::new();
        let mut pending_dirs = vec![root.to_path_buf()];

        while let Some(dir) = pending_dirs.pop() {
            let mut read_dir = match fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    warn!(path = ?dir, error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            while let Some(entry) = read_dir.next_entry().await.map_err(BridgeError::Io)? {
                let path = entry.path();
                if Self::is_hidden(&path) {
                    continue;
                }

                let metadata = match entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = ?path, error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if metadata.is_dir() {
                    pending_dirs.push(path);
                } else if metadata.is_file() && Self::has_extension(&path, extensions) {
                    let item = Self::to_pending_item(path, &metadata, collection)?;
                    if item.modified_millis() > since_millis {
                        items.push(item);
                    }
                }
            }
        }

        items.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.identity.cmp(&b.identity))
        });

        debug!(?collection, count = items.len(), since_millis, "Listed candidates");
        Ok(items)
    }
}
