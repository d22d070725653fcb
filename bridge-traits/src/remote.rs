//! Remote Storage SDK Abstraction
//!
//! The remote SDK exposes push-style operations: each call returns
//! immediately and later reports progress through an [`OperationListener`]
//! from the SDK's own notification thread. The contract promised by the SDK
//! is that every operation delivers exactly one terminal
//! [`OperationListener::on_finish`] call, preceded by any number of
//! start/update/temporary-error notifications.
//!
//! The core never calls these methods directly from orchestration code. It
//! goes through the completion bridge in `core-runtime`, which turns each
//! operation into a single awaitable result.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{media::PendingItem, platform::PlatformSendSync};

/// Opaque handle of a remote node (file or folder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

impl NodeHandle {
    /// Settings stores persist handles as signed integers.
    pub fn to_setting(self) -> i64 {
        self.0 as i64
    }

    pub fn from_setting(value: i64) -> Self {
        Self(value as u64)
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Session established by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub account_id: String,
}

/// Error codes reported by the remote SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorCode {
    /// A node with the same name already exists
    Exists,
    /// Invalid arguments
    Args,
    /// Reading the local file failed
    Read,
    /// Writing remotely failed
    Write,
    /// The referenced node does not exist
    NoEntry,
    /// Access denied
    Access,
    /// Storage or bandwidth quota exhausted
    OverQuota,
    /// The transfer layer ran out of local memory
    OutOfMemory,
    /// SDK internal failure, also used when an operation ends without a result
    Internal,
    /// Code this crate does not know about
    Other(i32),
}

/// How a failed operation should affect the run it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Only the current item failed; the run may continue.
    Recoverable,
    /// Local resources are exhausted; stop the run, keep progress.
    ResourceExhausted,
    /// The account quota is exhausted; stop the run and future scheduling.
    QuotaExceeded,
}

/// Error reported by a remote operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code:?}: {message}")]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Unknown codes are treated as recoverable so a single odd file
    /// cannot stop a whole run.
    pub fn classify(&self) -> FailureClass {
        match self.code {
            RemoteErrorCode::OverQuota => FailureClass::QuotaExceeded,
            RemoteErrorCode::OutOfMemory => FailureClass::ResourceExhausted,
            RemoteErrorCode::Exists
            | RemoteErrorCode::Args
            | RemoteErrorCode::Read
            | RemoteErrorCode::Write
            | RemoteErrorCode::NoEntry
            | RemoteErrorCode::Access
            | RemoteErrorCode::Internal
            | RemoteErrorCode::Other(_) => FailureClass::Recoverable,
        }
    }
}

/// Listener for one remote operation.
///
/// Methods may be invoked from any thread.
pub trait OperationListener<T>: PlatformSendSync {
    /// The operation was accepted and started.
    fn on_start(&self) {}

    /// Progress was made.
    fn on_update(&self) {}

    /// A transient problem the SDK will retry on its own.
    fn on_temporary_error(&self, _error: &RemoteError) {}

    /// Terminal event. Delivered exactly once per operation.
    fn on_finish(&self, result: std::result::Result<T, RemoteError>);
}

/// Shared listener handle passed to the SDK
pub type Listener<T> = Arc<dyn OperationListener<T>>;

/// Kind of quota that ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaKind {
    Storage,
    Bandwidth,
}

/// Out-of-band notice that the account quota is exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaNotice {
    pub kind: QuotaKind,
    pub message: String,
}

/// Receiver of out-of-band quota notices
pub trait QuotaObserver: PlatformSendSync {
    fn on_quota_exceeded(&self, notice: QuotaNotice);
}

/// Remote storage client
///
/// Every operation method only initiates work and must not block. The
/// outcome is delivered to `listener`.
pub trait RemoteClient: PlatformSendSync {
    /// Exchange a persisted session token for an active session.
    fn login(&self, session_token: &str, listener: Listener<RemoteSession>);

    /// Fetch the remote node index needed for dedupe and folder lookups.
    fn fetch_remote_index(&self, listener: Listener<()>);

    /// Locate the upload destination folder, creating it when missing.
    ///
    /// `hint` is the previously persisted handle, if any. Resolves to `None`
    /// when no folder is available after the creation attempt.
    fn resolve_or_create_upload_root(
        &self,
        hint: Option<NodeHandle>,
        listener: Listener<Option<NodeHandle>>,
    );

    /// Whether content with this item's fingerprint and modification time
    /// already exists under `root`.
    fn exists_by_fingerprint(
        &self,
        item: &PendingItem,
        root: NodeHandle,
        mtime: i64,
        listener: Listener<bool>,
    );

    /// Upload `item` into `root`, stamping it with `mtime`.
    fn upload(&self, item: &PendingItem, root: NodeHandle, mtime: i64, listener: Listener<NodeHandle>);

    /// Let the SDK resume interrupted transfers on its own.
    fn enable_auto_resume(&self, listener: Listener<()>);

    /// Nudge stalled connections. Called by the keep-alive timer while a
    /// transfer is in flight.
    fn retry_pending_connections(&self);

    /// Install (or remove, with `None`) the receiver of out-of-band quota notices.
    fn set_quota_observer(&self, observer: Option<Arc<dyn QuotaObserver>>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let cases = [
            (RemoteErrorCode::Exists, FailureClass::Recoverable),
            (RemoteErrorCode::Args, FailureClass::Recoverable),
            (RemoteErrorCode::Read, FailureClass::Recoverable),
            (RemoteErrorCode::Write, FailureClass::Recoverable),
            (RemoteErrorCode::Other(-99), FailureClass::Recoverable),
            (RemoteErrorCode::OutOfMemory, FailureClass::ResourceExhausted),
            (RemoteErrorCode::OverQuota, FailureClass::QuotaExceeded),
        ];

        for (code, expected) in cases {
            assert_eq!(RemoteError::new(code, "x").classify(), expected, "{:?}", code);
        }
    }

    #[test]
    fn test_node_handle_setting_round_trip() {
        let handle = NodeHandle(u64::MAX - 1);
        assert_eq!(NodeHandle::from_setting(handle.to_setting()), handle);
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::new(RemoteErrorCode::Args, "bad size");
        assert_eq!(err.to_string(), "Args: bad size");
    }
}
