//! Run and transfer outcomes.

use bridge_traits::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadRunId(Uuid);

impl UploadRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one item's dedupe-then-transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    AlreadyPresent,
    /// Always ends the run.
    QuotaExceeded { message: String },
    Failed(RemoteError),
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub uploaded: u64,
    pub already_present: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl RunSummary {
    pub fn processed(&self) -> u64 {
        self.uploaded + self.already_present + self.failed + self.skipped
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every candidate was considered.
    Completed(RunSummary),
    /// A local precondition failed: gate closed, not logged in, unreadable
    /// local state. Nothing was sent.
    NotReady(String),
    /// Remote login or index fetch failed.
    Failed(String),
    /// No upload folder after the creation attempt; retried next run.
    RootUnavailable,
    /// The gate closed mid-run. Finished items are kept.
    ConnectivityLost(RunSummary),
    /// The transfer layer ran out of local resources.
    ResourceExhausted(RunSummary),
    /// The account quota is exhausted. Scheduling should stop.
    QuotaExceeded(RunSummary),
}

impl RunOutcome {
    /// Coarse pass/fail for the background-task contract.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunOutcome::Completed(_)
                | RunOutcome::NotReady(_)
                | RunOutcome::RootUnavailable
                | RunOutcome::ConnectivityLost(_)
        )
    }

    /// Whether future scheduled runs should be disabled.
    pub fn requires_disable(&self) -> bool {
        matches!(self, RunOutcome::QuotaExceeded(_))
    }

    pub fn summary(&self) -> RunSummary {
        match self {
            RunOutcome::Completed(summary)
            | RunOutcome::ConnectivityLost(summary)
            | RunOutcome::ResourceExhausted(summary)
            | RunOutcome::QuotaExceeded(summary) => *summary,
            RunOutcome::NotReady(_) | RunOutcome::Failed(_) | RunOutcome::RootUnavailable => {
                RunSummary::default()
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed(_) => "completed",
            RunOutcome::NotReady(_) => "not_ready",
            RunOutcome::Failed(_) => "failed",
            RunOutcome::RootUnavailable => "root_unavailable",
            RunOutcome::ConnectivityLost(_) => "connectivity_lost",
            RunOutcome::ResourceExhausted(_) => "resource_exhausted",
            RunOutcome::QuotaExceeded(_) => "quota_exceeded",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NotReady(reason) | RunOutcome::Failed(reason) => {
                write!(f, "{}: {}", self.label(), reason)
            }
            _ => f.write_str(self.label()),
        }
    }
}
