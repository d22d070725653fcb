//! # Network Gate
//!
//! Decides whether the current connection may be used for uploads.
//!
//! The gate is consulted once before a run starts and again before every
//! item. It fails closed: an unrecognized policy, a disconnected or
//! indeterminate link, and a monitor error all deny.

use bridge_traits::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which connections uploads may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionPolicy {
    AnyConnection,
    UnmeteredOnly,
    /// A stored value this build does not understand. Never allows.
    Unrecognized(String),
}

impl ConnectionPolicy {
    pub const ANY: &'static str = "any";
    pub const UNMETERED_ONLY: &'static str = "unmetered_only";

    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            Self::ANY => Self::AnyConnection,
            Self::UNMETERED_ONLY => Self::UnmeteredOnly,
            _ => Self::Unrecognized(value.to_string()),
        }
    }

    pub fn as_setting(&self) -> &str {
        match self {
            Self::AnyConnection => Self::ANY,
            Self::UnmeteredOnly => Self::UNMETERED_ONLY,
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self::UnmeteredOnly
    }
}

impl fmt::Display for ConnectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_setting())
    }
}

/// Stateless policy check against a connection class.
///
/// `Unknown` links count as unmetered; only `Cellular` is metered.
pub fn allowed(policy: &ConnectionPolicy, connection: NetworkType) -> bool {
    match policy {
        ConnectionPolicy::AnyConnection => true,
        ConnectionPolicy::UnmeteredOnly => connection != NetworkType::Cellular,
        ConnectionPolicy::Unrecognized(_) => false,
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(NetworkType),
    Offline,
    Denied {
        policy: ConnectionPolicy,
        connection: NetworkType,
    },
    MonitorUnavailable(String),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed(_))
    }

    /// Evaluate a connectivity snapshot.
    ///
    /// A link flagged metered is treated as cellular whatever its reported type.
    pub fn evaluate(policy: &ConnectionPolicy, info: &NetworkInfo) -> Self {
        if info.status != NetworkStatus::Connected {
            return GateDecision::Offline;
        }

        let connection = if info.is_metered {
            NetworkType::Cellular
        } else {
            info.connection_type()
        };

        if allowed(policy, connection) {
            GateDecision::Allowed(connection)
        } else {
            GateDecision::Denied {
                policy: policy.clone(),
                connection,
            }
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Allowed(connection) => write!(f, "allowed on {}", connection),
            GateDecision::Offline => f.write_str("no network connection"),
            GateDecision::Denied { policy, connection } => {
                write!(f, "policy '{}' does not allow {}", policy, connection)
            }
            GateDecision::MonitorUnavailable(reason) => {
                write!(f, "connectivity unknown: {}", reason)
            }
        }
    }
}

/// Policy bound to the host connectivity source for one run.
#[derive(Clone)]
pub struct NetworkGate {
    monitor: Arc<dyn NetworkMonitor>,
    policy: ConnectionPolicy,
}

impl NetworkGate {
    pub fn new(monitor: Arc<dyn NetworkMonitor>, policy: ConnectionPolicy) -> Self {
        if let ConnectionPolicy::Unrecognized(raw) = &policy {
            warn!(policy = %raw, "Unrecognized connection policy, uploads will not start");
        }
        Self { monitor, policy }
    }

    pub fn policy(&self) -> &ConnectionPolicy {
        &self.policy
    }

    pub async fn check(&self) -> GateDecision {
        let decision = match self.monitor.get_network_info().await {
            Ok(info) => GateDecision::evaluate(&self.policy, &info),
            Err(e) => GateDecision::MonitorUnavailable(e.to_string()),
        };
        debug!(decision = %decision, "Network gate evaluated");
        decision
    }
}
