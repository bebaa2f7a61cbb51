//! Session lifecycle states.

use std::fmt;

use dealroom_protocol::Role;
use serde::Serialize;

/// States of one party's negotiation session.
///
/// ```text
/// CollectingInitial (proposer only) -> Negotiating -> Settled | Abandoned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Proposer is entering initial values for unset terms
    CollectingInitial,
    Negotiating,
    /// Every term approved (fresh store read)
    Settled,
    /// Party left before settlement; shared state is untouched
    Abandoned,
}

impl SessionState {
    pub fn initial(role: Role) -> Self {
        match role {
            Role::Proposer => SessionState::CollectingInitial,
            Role::Counterparty => SessionState::Negotiating,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::CollectingInitial => "COLLECTING_INITIAL",
            SessionState::Negotiating => "NEGOTIATING",
            SessionState::Settled => "SETTLED",
            SessionState::Abandoned => "ABANDONED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Settled | SessionState::Abandoned)
    }

    pub fn valid_transitions(&self) -> &'static [SessionState] {
        match self {
            SessionState::CollectingInitial => {
                &[SessionState::Negotiating, SessionState::Abandoned]
            }
            SessionState::Negotiating => &[SessionState::Settled, SessionState::Abandoned],
            SessionState::Settled | SessionState::Abandoned => &[],
        }
    }

    pub fn can_transition_to(&self, target: SessionState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
