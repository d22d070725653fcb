//! # Connectivity Service
//!
//! Process-owned cache of the host's connectivity state.
//!
//! The service subscribes to [`NetworkMonitor::subscribe_changes`] when
//! [`start`](ConnectivityService::start) is called and keeps the latest
//! [`NetworkInfo`] it has seen. Upload runs poll that cached value through the
//! service's own [`NetworkMonitor`] implementation, so a gate check never
//! waits on a platform reachability check while a subscription is live.
//!
//! The subscription is torn down by [`shutdown`](ConnectivityService::shutdown).
//! Nothing is released implicitly; hosts call `shutdown` when the process
//! winds down.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{NetworkChangeStream, NetworkInfo, NetworkMonitor};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Subscription {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ConnectivityService {
    monitor: Arc<dyn NetworkMonitor>,
    latest: Arc<RwLock<Option<NetworkInfo>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl ConnectivityService {
    pub fn new(monitor: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            monitor,
            latest: Arc::new(RwLock::new(None)),
            subscription: Mutex::new(None),
        }
    }

    /// Seed the cache and subscribe to change notifications.
    ///
    /// Calling `start` on a running service is a no-op. When the host offers
    /// no change stream the service keeps polling the wrapped monitor.
    pub async fn start(&self) {
        if self.is_running() {
            return;
        }

        let stream = match self.monitor.subscribe_changes().await {
            Ok(stream) => stream,
            Err(e) => {
                // Without notifications a cached reading would never refresh.
                warn!(error = %e, "No connectivity notifications, polling the monitor instead");
                *self.latest.write().await = None;
                return;
            }
        };

        match self.monitor.get_network_info().await {
            Ok(info) => *self.latest.write().await = Some(info),
            Err(e) => warn!(error = %e, "Initial connectivity reading failed"),
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(follow_changes(
            stream,
            Arc::clone(&self.latest),
            token.clone(),
        ));

        let mut slot = match self.subscription.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.replace(Subscription { token, handle }) {
            // Lost a race with a concurrent start.
            previous.token.cancel();
        }
        info!("Connectivity service started");
    }

    /// Cancel the subscription and forget the cached state.
    pub async fn shutdown(&self) {
        let subscription = match self.subscription.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(subscription) = subscription {
            subscription.token.cancel();
            if let Err(e) = subscription.handle.await {
                warn!(error = %e, "Connectivity task ended abnormally");
            }
            info!("Connectivity service stopped");
        }
        *self.latest.write().await = None;
    }

    pub fn is_running(&self) -> bool {
        match self.subscription.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|s| !s.handle.is_finished()),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .is_some_and(|s| !s.handle.is_finished()),
        }
    }

    /// Latest cached reading, if any.
    pub async fn cached(&self) -> Option<NetworkInfo> {
        self.latest.read().await.clone()
    }
}

async fn follow_changes(
    mut stream: Box<dyn NetworkChangeStream>,
    latest: Arc<RwLock<Option<NetworkInfo>>>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = stream.next() => match next {
                Some(info) => {
                    debug!(status = ?info.status, connection = %info.connection_type(), "Connectivity changed");
                    *latest.write().await = Some(info);
                }
                None => {
                    // Stale cache is worse than a direct reading.
                    warn!("Connectivity stream closed");
                    *latest.write().await = None;
                    break;
                }
            },
        }
    }
}

#[async_trait]
impl NetworkMonitor for ConnectivityService {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        if let Some(info) = self.cached().await {
            return Ok(info);
        }
        self.monitor.get_network_info().await
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        self.monitor.subscribe_changes().await
    }
}
