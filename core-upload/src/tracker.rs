//! # Failure-Isolation Tracker
//!
//! Remembers how many consecutive times each item failed so that one
//! corrupt or oversized file cannot stall every run.
//!
//! Records live in a bounded LRU map (identity → consecutive failures). The
//! whole map is persisted as one JSON string under
//! [`keys::FAILURES`](crate::run_config::keys::FAILURES) after every
//! mutation, which makes each update a single atomic settings write.
//!
//! An item at or above the threshold is excluded from this and future runs
//! until its record is cleared by a success for the same identity or by
//! [`FailureTracker::reset`].

use crate::error::Result;
use crate::run_config::keys;
use bridge_traits::SettingsStore;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persisted failure state for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub identity: String,
    pub consecutive_failures: u32,
}

pub struct FailureTracker {
    settings: Arc<dyn SettingsStore>,
    records: LruCache<String, u32>,
}

impl FailureTracker {
    /// Load persisted records.
    ///
    /// A missing, unreadable or malformed entry yields an empty tracker.
    pub async fn load(settings: Arc<dyn SettingsStore>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let mut records = LruCache::new(capacity);

        match settings.get_string(keys::FAILURES).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ErrorRecord>>(&raw) {
                // Stored least recently used first
                Ok(stored) => {
                    for record in stored {
                        records.put(record.identity, record.consecutive_failures);
                    }
                }
                Err(e) => warn!(error = %e, "Ignoring malformed failure records"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read failure records, starting empty"),
        }

        debug!(records = records.len(), "Failure tracker loaded");
        Self { settings, records }
    }

    /// Whether `identity` has failed at least `threshold` consecutive times.
    pub fn should_skip(&self, identity: &str, threshold: u32) -> bool {
        self.failure_count(identity) >= threshold
    }

    pub fn failure_count(&self, identity: &str) -> u32 {
        self.records.peek(identity).copied().unwrap_or(0)
    }

    /// Count one more failure for `identity` and persist.
    ///
    /// Returns the new consecutive count. The in-memory count is updated even
    /// when persisting fails.
    pub async fn record_failure(&mut self, identity: &str) -> Result<u32> {
        let count = self.failure_count(identity).saturating_add(1);
        if let Some((evicted, _)) = self.records.push(identity.to_string(), count) {
            if evicted != identity {
                debug!(evicted = %evicted, "Evicted oldest failure record");
            }
        }
        self.persist().await?;
        Ok(count)
    }

    /// Drop the record for `identity`. Returns whether one existed.
    pub async fn clear(&mut self, identity: &str) -> Result<bool> {
        if self.records.pop(identity).is_none() {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    /// Forget every record.
    pub async fn reset(&mut self) -> Result<()> {
        self.records.clear();
        self.settings.delete(keys::FAILURES).await?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn snapshot(&self) -> Vec<ErrorRecord> {
        // `iter` runs most recent first; store the reverse so `load` restores order.
        self.records
            .iter()
            .rev()
            .map(|(identity, count)| ErrorRecord {
                identity: identity.clone(),
                consecutive_failures: *count,
            })
            .collect()
    }

    async fn persist(&self) -> Result<()> {
        if self.records.is_empty() {
            self.settings.delete(keys::FAILURES).await?;
            return Ok(());
        }
        let json = serde_json::to_string(&self.snapshot())?;
        self.settings.set_string(keys::FAILURES, &json).await?;
        Ok(())
    }
}
