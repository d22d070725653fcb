//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

const DEFAULT_CHECK_ADDR: &str = "8.8.8.8:53";
const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Desktop network monitor implementation
///
/// Reachability is decided by a TCP connect to a well-known endpoint. Desktop
/// links cannot be classified without platform APIs, so a reachable link is
/// reported as `NetworkType::Unknown` and unmetered.
#[derive(Debug, Clone)]
pub struct DesktopNetworkMonitor {
    check_addr: String,
    check_timeout: Duration,
    poll_interval: Duration,
}

impl DesktopNetworkMonitor {
    pub fn new() -> Self {
        Self {
            check_addr: DEFAULT_CHECK_ADDR.to_string(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Check a different endpoint, e.g. the remote service's own host.
    pub fn with_reachability_check(mut self, addr: impl Into<String>, timeout: Duration) -> Self {
        self.check_addr = addr.into();
        self.check_timeout = timeout;
        self
    }

    /// How often the change stream re-checks reachability
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.check_timeout,
            tokio::net::TcpStream::connect(self.check_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;

        let info = match status {
            NetworkStatus::Connected => NetworkInfo::connected(NetworkType::Unknown),
            _ => NetworkInfo::disconnected(),
        };

        debug!(status = ?status, endpoint = %self.check_addr, "Network info updated");
        Ok(info)
    }

    async fn is_wifi(&self) -> bool {
        false
    }

    async fn is_metered(&self) -> bool {
        false
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        Ok(Box::new(DesktopNetworkChangeStream {
            monitor: self.clone(),
            last_status: None,
        }))
    }
}

/// Change stream that re-checks reachability on an interval and yields on status changes
struct DesktopNetworkChangeStream {
    monitor: DesktopNetworkMonitor,
    last_status: Option<NetworkStatus>,
}

#[async_trait]
impl NetworkChangeStream for DesktopNetworkChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            // First poll reports immediately
            if self.last_status.is_some() {
                tokio::time::sleep(self.monitor.poll_interval).await;
            }

            if let Ok(info) = self.monitor.get_network_info().await {
                if self.last_status != Some(info.status) {
                    self.last_status = Some(info.status);
                    return Some(info);
                }
            }
        }
    }
}
