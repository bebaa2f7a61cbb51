//! System configuration passed explicitly into every session.

use std::time::Duration;

use crate::defaults;

/// Notification bus endpoints. `None` forces the unavailable bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEndpoints {
    /// Relay inbound endpoint; publishers connect here.
    pub publish_addr: String,
    /// Relay outbound endpoint; subscribers connect here.
    pub subscribe_addr: String,
}

impl Default for BusEndpoints {
    fn default() -> Self {
        Self {
            publish_addr: defaults::DEFAULT_BUS_PUBLISH_ADDR.to_string(),
            subscribe_addr: defaults::DEFAULT_BUS_SUBSCRIBE_ADDR.to_string(),
        }
    }
}

/// Canonical resolved configuration used by the launcher.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// State store URL (sqlite:/...)
    pub state_store_url: String,
    /// Bus endpoints, or None when the bus is disabled
    pub bus: Option<BusEndpoints>,
    /// Game (term sheet) name
    pub game: String,
    pub timeouts: Timeouts,
}

/// Timing knobs for the bus and the session listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub bus_connect: Duration,
    pub listener_read: Duration,
    pub listener_join: Duration,
    pub store_busy: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            bus_connect: Duration::from_millis(defaults::BUS_CONNECT_TIMEOUT_MS),
            listener_read: Duration::from_millis(defaults::LISTENER_READ_TIMEOUT_MS),
            listener_join: Duration::from_millis(defaults::LISTENER_JOIN_TIMEOUT_MS),
            store_busy: Duration::from_millis(defaults::STORE_BUSY_TIMEOUT_MS),
        }
    }
}
