//! # Camera Upload Module
//!
//! Background upload of local photos and videos to remote storage.
//!
//! ## Overview
//!
//! One run of the job is a linear pipeline:
//!
//! ```text
//! LoadConfig → NetworkGate → Authenticate → FetchRemoteIndex
//!     → ResolveUploadRoot → EnumerateCandidates → per-item loop → End
//! ```
//!
//! Items are processed strictly one at a time. Each item's tracker and
//! watermark writes are committed before the next item starts, so a run
//! killed by the host between items loses at most the in-flight item.
//!
//! ## Components
//!
//! - **Failure Tracker** (`tracker`): per-identity consecutive failure counts, skip decisions
//! - **Network Gate** (`network_gate`): connection policy evaluation, fails closed
//! - **Quota Signal** (`quota`): one-shot abort raised by the transfer layer
//! - **Run Configuration** (`run_config`): settings read once per run
//! - **Watermarks** (`watermark`): per-class enumeration lower bound
//! - **Upload Orchestrator** (`orchestrator`): the pipeline itself

pub mod error;
pub mod network_gate;
pub mod orchestrator;
pub mod outcome;
pub mod quota;
pub mod run_config;
pub mod tracker;
pub mod watermark;

pub use error::{Result, UploadError};
pub use network_gate::{allowed, ConnectionPolicy, GateDecision, NetworkGate};
pub use orchestrator::{transfer_mtime, UploadOrchestrator};
pub use outcome::{RunOutcome, RunSummary, TransferOutcome, UploadRunId};
pub use quota::QuotaSignal;
pub use run_config::{FileClassFilter, RunConfiguration};
pub use tracker::{ErrorRecord, FailureTracker};
pub use watermark::{WatermarkTracker, Watermarks};
