//! # Quota Signal
//!
//! One-shot abort raised when the account runs out of storage or bandwidth.
//!
//! The orchestrator installs a clone as the remote client's
//! [`QuotaObserver`] for the duration of a run and races every in-flight
//! remote step against [`QuotaSignal::raised`]. Once raised the signal stays
//! raised; later notices are ignored.

use bridge_traits::{QuotaKind, QuotaNotice, QuotaObserver};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Clone, Default)]
pub struct QuotaSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    token: CancellationToken,
    notice: OnceLock<QuotaNotice>,
}

impl QuotaSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` only for the first notice.
    pub fn raise(&self, notice: QuotaNotice) -> bool {
        let first = self.inner.notice.set(notice).is_ok();
        self.inner.token.cancel();
        first
    }

    pub fn is_raised(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The notice that raised the signal, if any.
    pub fn notice(&self) -> Option<QuotaNotice> {
        self.inner.notice.get().cloned()
    }

    /// Completes once the signal is raised.
    pub async fn raised(&self) -> QuotaNotice {
        self.inner.token.cancelled().await;
        self.notice().unwrap_or_else(|| QuotaNotice {
            kind: QuotaKind::Storage,
            message: "Quota exceeded".to_string(),
        })
    }
}

impl QuotaObserver for QuotaSignal {
    fn on_quota_exceeded(&self, notice: QuotaNotice) {
        let kind = notice.kind;
        if self.raise(notice) {
            warn!(kind = ?kind, "Account quota exceeded, aborting uploads");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn notice(message: &str) -> QuotaNotice {
        QuotaNotice {
            kind: QuotaKind::Bandwidth,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_first_notice_wins() {
        let signal = QuotaSignal::new();
        assert!(!signal.is_raised());

        assert!(signal.raise(notice("first")));
        assert!(!signal.raise(notice("second")));

        assert!(signal.is_raised());
        assert_eq!(signal.notice().unwrap().message, "first");
    }

    #[tokio::test]
    async fn test_raised_wakes_waiter_from_observer() {
        let signal = QuotaSignal::new();
        let observer: Arc<dyn QuotaObserver> = Arc::new(signal.clone());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.raised().await }
        });

        std::thread::spawn(move || observer.on_quota_exceeded(notice("over limit")))
            .join()
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.kind, QuotaKind::Bandwidth);
        assert_eq!(received.message, "over limit");
    }

    #[tokio::test]
    async fn test_raised_is_immediate_after_raise() {
        let signal = QuotaSignal::new();
        signal.raise(notice("done"));
        assert_eq!(signal.raised().await.message, "done");
    }
}
