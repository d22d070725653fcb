//! Local Media Enumeration Abstraction

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{error::Result, platform::PlatformSendSync};

/// Media class of a local file. Watermarks are tracked per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Photo,
    Video,
}

impl MediaClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaClass::Photo => "photo",
            MediaClass::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source collection the host exposes (camera roll pictures, recorded videos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaCollection {
    Pictures,
    Videos,
}

impl MediaCollection {
    /// Class of every item listed from this collection
    pub fn class(&self) -> MediaClass {
        match self {
            MediaCollection::Pictures => MediaClass::Photo,
            MediaCollection::Videos => MediaClass::Video,
        }
    }
}

/// A local file waiting to be uploaded.
///
/// Produced by enumeration and consumed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    /// Stable identity used for failure tracking (normally the full path)
    pub identity: String,
    /// File name as it should appear remotely
    pub name: String,
    /// Location the transfer layer reads from
    pub path: PathBuf,
    pub class: MediaClass,
    /// Last modification time, carrying the local UTC offset it was observed in
    pub modified_at: DateTime<FixedOffset>,
    pub size: u64,
}

impl PendingItem {
    /// Modification instant in epoch milliseconds, the unit watermarks use.
    pub fn modified_millis(&self) -> i64 {
        self.modified_at.timestamp_millis()
    }
}

/// Local file enumeration trait
///
/// # Contract
///
/// - Only items strictly newer than `since_millis` are returned.
/// - The result is finite and deterministic: listing twice with the same
///   watermark and no file-system changes yields the same items in the same
///   order (ascending modification time, ties broken by identity).
/// - Listing is restartable; no cursor is kept between calls.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaLibrary: PlatformSendSync {
    async fn list_candidates(
        &self,
        collection: MediaCollection,
        since_millis: i64,
    ) -> Result<Vec<PendingItem>>;
}
