//! Driver boundary: where local actions come from.

use async_trait::async_trait;
use dealroom_db::TermSnapshot;
use dealroom_protocol::{ApprovalStatus, Role};

use crate::error::Result;

/// A local action requested by the party at the keyboard (or a script).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Initial value for a term during collection
    InitializeTerm { name: String, value: f64 },
    EditTerm { name: String, value: f64 },
    SetStatus { name: String, status: ApprovalStatus },
    Refresh,
    Exit,
}

impl Action {
    pub fn initialize(name: impl Into<String>, value: f64) -> Self {
        Action::InitializeTerm {
            name: name.into(),
            value,
        }
    }

    pub fn edit(name: impl Into<String>, value: f64) -> Self {
        Action::EditTerm {
            name: name.into(),
            value,
        }
    }

    pub fn approve(name: impl Into<String>) -> Self {
        Action::SetStatus {
            name: name.into(),
            status: ApprovalStatus::Approved,
        }
    }

    pub fn reject(name: impl Into<String>) -> Self {
        Action::SetStatus {
            name: name.into(),
            status: ApprovalStatus::Pending,
        }
    }
}

/// What the session is asking for.
#[derive(Debug, Clone)]
pub enum Prompt {
    /// Initial value for an unset term (proposer only)
    InitialValue { term: String, unit: String },
    /// Main menu over the current terms
    Menu { role: Role, snapshot: TermSnapshot },
}

/// Supplies the next local action.
///
/// Calls may be dropped mid-flight when the session settles while waiting,
/// so implementations must tolerate cancellation.
#[async_trait]
pub trait ActionSource: Send {
    async fn next_action(&mut self, prompt: &Prompt) -> Result<Action>;
}
