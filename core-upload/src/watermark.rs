//! # Watermarks
//!
//! Per-class lower bound for enumeration, in epoch milliseconds.
//!
//! Within one run a class only advances across a contiguous prefix of items
//! that were uploaded or found already present. The first failed or skipped
//! item of a class freezes it for the rest of the run (and pulls it back
//! below that item if needed), so the item is enumerated again next run and
//! the skip threshold stays reachable.

use crate::error::Result;
use crate::run_config::keys;
use bridge_traits::{MediaClass, PendingItem, SettingsStore};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermarks {
    pub photos: i64,
    pub videos: i64,
}

impl Watermarks {
    pub fn get(&self, class: MediaClass) -> i64 {
        match class {
            MediaClass::Photo => self.photos,
            MediaClass::Video => self.videos,
        }
    }

    fn set(&mut self, class: MediaClass, value: i64) {
        match class {
            MediaClass::Photo => self.photos = value,
            MediaClass::Video => self.videos = value,
        }
    }

    pub fn key_for(class: MediaClass) -> &'static str {
        match class {
            MediaClass::Photo => keys::WATERMARK_PHOTOS,
            MediaClass::Video => keys::WATERMARK_VIDEOS,
        }
    }
}

pub struct WatermarkTracker {
    settings: Arc<dyn SettingsStore>,
    current: Watermarks,
    frozen_photos: bool,
    frozen_videos: bool,
}

impl WatermarkTracker {
    pub fn new(settings: Arc<dyn SettingsStore>, initial: Watermarks) -> Self {
        Self {
            settings,
            current: initial,
            frozen_photos: false,
            frozen_videos: false,
        }
    }

    pub fn current(&self) -> Watermarks {
        self.current
    }

    pub fn is_frozen(&self, class: MediaClass) -> bool {
        match class {
            MediaClass::Photo => self.frozen_photos,
            MediaClass::Video => self.frozen_videos,
        }
    }

    /// Move the item's class up to the item's modification time.
    ///
    /// Returns `Ok(false)` when the class is frozen or already at or past
    /// the item. The in-memory value moves even if persisting fails.
    pub async fn advance(&mut self, item: &PendingItem) -> Result<bool> {
        let class = item.class;
        let millis = item.modified_millis();
        if self.is_frozen(class) || millis <= self.current.get(class) {
            return Ok(false);
        }

        self.current.set(class, millis);
        self.persist(class).await?;
        debug!(class = %class, watermark = millis, "Watermark advanced");
        Ok(true)
    }

    /// Freeze the item's class for the rest of the run, keeping the item
    /// strictly above the watermark.
    pub async fn hold_before(&mut self, item: &PendingItem) -> Result<()> {
        let class = item.class;
        match class {
            MediaClass::Photo => self.frozen_photos = true,
            MediaClass::Video => self.frozen_videos = true,
        }

        let limit = item.modified_millis().saturating_sub(1);
        if self.current.get(class) > limit {
            self.current.set(class, limit);
            self.persist(class).await?;
            debug!(class = %class, watermark = limit, "Watermark pulled back");
        }
        Ok(())
    }

    async fn persist(&self, class: MediaClass) -> Result<()> {
        self.settings
            .set_i64(Watermarks::key_for(class), self.current.get(class))
            .await?;
        Ok(())
    }
}
