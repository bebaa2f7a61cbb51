//! Dealroom notification bus
//!
//! Best-effort publish/subscribe used to tell the other team that terms
//! changed. Delivery is never relied on for correctness: the term store is
//! the source of truth and every consumer re-reads it.
//!
//! Transports:
//! - ZeroMQ PUB/SUB through the `dealroom relay` forwarder
//! - [`LocalHub`] for in-process use (tests, single-process demos)
//! - unavailable: publishes are dropped, subscriptions stay empty
//!
//! Connection failures degrade to the unavailable transport instead of
//! returning errors, so a session always gets a usable [`NotificationBus`].

pub mod bus;
pub mod error;
pub mod local;
pub mod relay;
pub mod subscription;

pub use bus::NotificationBus;
pub use error::{BusError, Result};
pub use local::LocalHub;
pub use relay::Relay;
pub use subscription::{Subscription, SubscriptionCloser};
