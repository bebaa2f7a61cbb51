//! Canonical default values shared by the store, bus and session crates.

pub const DEFAULT_GAME: &str = "valuation";
pub const DEFAULT_STATE_STORE_FILE: &str = "negotiation.sqlite";
pub const DEFAULT_BUS_PUBLISH_ADDR: &str = "tcp://127.0.0.1:6380";
pub const DEFAULT_BUS_SUBSCRIBE_ADDR: &str = "tcp://127.0.0.1:6381";

/// Bus connection is attempted once at startup with this timeout.
pub const BUS_CONNECT_TIMEOUT_MS: u64 = 3_000;
/// Listener read timeout; bounds how long shutdown can go unobserved.
pub const LISTENER_READ_TIMEOUT_MS: u64 = 250;
/// Bounded wait when joining the listener on session exit.
pub const LISTENER_JOIN_TIMEOUT_MS: u64 = 1_000;
/// SQLite busy timeout for writers racing across processes.
pub const STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
