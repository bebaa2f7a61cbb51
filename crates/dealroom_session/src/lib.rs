//! Dealroom negotiation session
//!
//! One party's control loop over the shared term store:
//!
//! - [`NegotiationSession`]: interactive loop plus one background listener,
//!   sharing only a shutdown token, a refresh flag and the render lock
//! - [`TermSheet`]: the fixed term set of a game and its settlement formula
//! - [`calculate_settlement`]: pure settlement over a fully approved snapshot
//! - [`ActionSource`] / [`Renderer`]: driver and output boundaries
//!
//! The store is the source of truth. Notifications only prompt re-reads, so
//! sessions stay correct when every message is lost.

pub mod cancel;
pub mod driver;
pub mod error;
pub mod listener;
pub mod render;
pub mod session;
pub mod settlement;
pub mod sheet;
pub mod state;

pub use cancel::CancellationToken;
pub use driver::{Action, ActionSource, Prompt};
pub use error::{Result, SessionError};
pub use listener::SessionSignals;
pub use render::{Notice, RenderGate, Renderer, TermsView};
pub use session::{NegotiationSession, SessionContext, SessionOutcome};
pub use settlement::{
    calculate_settlement, format_amount, format_grouped, format_with_unit, ComputationError,
    Settlement, SettlementView,
};
pub use sheet::{SettlementFormula, TermSheet, TermValues};
pub use state::SessionState;
