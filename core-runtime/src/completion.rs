//! # Completion Bridge
//!
//! Turns the remote SDK's push-style listener interface into one awaitable
//! result per operation.
//!
//! Every call to [`CompletionBridge::await_operation`] or
//! [`CompletionBridge::await_transfer`] builds a fresh [`CompletionSlot`] and
//! listener, so no state is shared between operations. The SDK may deliver
//! callbacks on any thread; only the first terminal callback resolves the
//! slot and later ones are ignored.
//!
//! Transfers additionally get a keep-alive task that calls
//! [`RemoteClient::retry_pending_connections`] whenever a full interval passes
//! without start/update activity. The task is tied to a `CancellationToken`
//! and stops on the terminal callback, on error, and when the awaiting future
//! is dropped.
//!
//! If the SDK drops a listener without ever calling `on_finish`, the awaiting
//! step resolves with a `RemoteErrorCode::Internal` error instead of hanging.
//! A listener that is kept alive but never finished still blocks the caller.

use bridge_traits::{Listener, OperationListener, RemoteClient, RemoteError, RemoteErrorCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

type Outcome<T> = std::result::Result<T, RemoteError>;

/// Single-assignment result holder.
///
/// The first call to [`resolve`](CompletionSlot::resolve) wins; later calls
/// return `false` and drop their value.
pub struct CompletionSlot<T> {
    resolved: AtomicBool,
    // Only ever locked by the writer that won the compare-exchange.
    sender: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
}

impl<T> CompletionSlot<T> {
    /// Create an empty slot and the receiver its result will arrive on.
    pub fn new() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Self {
            resolved: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
        };
        (slot, receiver)
    }

    /// Assign the result. Returns `true` only for the first writer.
    pub fn resolve(&self, outcome: Outcome<T>) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(sender) = sender {
            // Receiver gone means the awaiting step was cancelled.
            let _ = sender.send(outcome);
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

struct BridgeListener<T> {
    slot: CompletionSlot<T>,
    activity: Option<Arc<AtomicBool>>,
    /// Stops the keep-alive task of a transfer.
    finished: Option<CancellationToken>,
    operation: &'static str,
}

impl<T> BridgeListener<T> {
    fn mark_activity(&self) {
        if let Some(activity) = &self.activity {
            activity.store(true, Ordering::Release);
        }
    }
}

impl<T: Send + 'static> OperationListener<T> for BridgeListener<T> {
    fn on_start(&self) {
        trace!(operation = self.operation, "Remote operation started");
        self.mark_activity();
    }

    fn on_update(&self) {
        self.mark_activity();
    }

    fn on_temporary_error(&self, error: &RemoteError) {
        debug!(
            operation = self.operation,
            error = %error,
            "Temporary remote error, waiting for the SDK to retry"
        );
    }

    fn on_finish(&self, result: Outcome<T>) {
        if let Some(finished) = &self.finished {
            finished.cancel();
        }
        if !self.slot.resolve(result) {
            warn!(
                operation = self.operation,
                "Ignoring duplicate terminal callback"
            );
        }
    }
}

/// Adapter between the callback-driven [`RemoteClient`] and sequential
/// async code.
#[derive(Clone)]
pub struct CompletionBridge {
    remote: Arc<dyn RemoteClient>,
    keep_alive_interval: Duration,
}

impl CompletionBridge {
    pub fn new(remote: Arc<dyn RemoteClient>, keep_alive_interval: Duration) -> Self {
        Self {
            remote,
            keep_alive_interval,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteClient> {
        &self.remote
    }

    /// Start one remote operation and wait for its terminal callback.
    ///
    /// `start` receives the client and the listener to register; it must only
    /// initiate the operation.
    ///
    /// ```ignore
    /// let session = bridge
    ///     .await_operation("login", |remote, listener| remote.login(&token, listener))
    ///     .await?;
    /// ```
    pub async fn await_operation<T, F>(&self, operation: &'static str, start: F) -> Outcome<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RemoteClient, Listener<T>),
    {
        let (slot, receiver) = CompletionSlot::new();
        let listener: Listener<T> = Arc::new(BridgeListener {
            slot,
            activity: None,
            finished: None,
            operation,
        });

        start(self.remote.as_ref(), listener);
        settle(operation, receiver).await
    }

    /// Like [`await_operation`](Self::await_operation), with the keep-alive
    /// timer running while the transfer is in flight.
    pub async fn await_transfer<T, F>(&self, operation: &'static str, start: F) -> Outcome<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RemoteClient, Listener<T>),
    {
        let (slot, receiver) = CompletionSlot::new();
        let activity = Arc::new(AtomicBool::new(false));
        let finished = CancellationToken::new();
        let _stop_keep_alive = finished.clone().drop_guard();

        self.spawn_keep_alive(operation, Arc::clone(&activity), finished.clone());

        let listener: Listener<T> = Arc::new(BridgeListener {
            slot,
            activity: Some(activity),
            finished: Some(finished),
            operation,
        });

        start(self.remote.as_ref(), listener);
        settle(operation, receiver).await
    }

    fn spawn_keep_alive(
        &self,
        operation: &'static str,
        activity: Arc<AtomicBool>,
        finished: CancellationToken,
    ) {
        let remote = Arc::clone(&self.remote);
        let period = self.keep_alive_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = finished.cancelled() => break,
                    _ = ticker.tick() => {
                        if activity.swap(false, Ordering::AcqRel) {
                            continue;
                        }
                        debug!(operation, "No transfer activity, retrying pending connections");
                        remote.retry_pending_connections();
                    }
                }
            }

            trace!(operation, "Keep-alive stopped");
        });
    }
}

async fn settle<T>(operation: &'static str, receiver: oneshot::Receiver<Outcome<T>>) -> Outcome<T> {
    match receiver.await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(operation, "Listener dropped without a terminal callback");
            Err(RemoteError::new(
                RemoteErrorCode::Internal,
                format!("{} ended without a terminal callback", operation),
            ))
        }
    }
}
