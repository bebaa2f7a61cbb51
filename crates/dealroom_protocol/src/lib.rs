//! Dealroom shared protocol types
//!
//! Vocabulary shared by the term store, the notification bus and the
//! negotiation session:
//!
//! - [`Role`]: proposer (Team 1) or counterparty (Team 2)
//! - [`ApprovalStatus`]: per-term approval owned by the counterparty
//! - [`Topic`] / [`Notification`]: bus channel names and messages
//! - [`SystemConfig`]: resolved configuration passed into each session

pub mod config;
pub mod defaults;
pub mod paths;
pub mod types;

pub use config::{BusEndpoints, SystemConfig, Timeouts};
pub use types::{ApprovalStatus, Notification, ParseError, Role, Topic};
