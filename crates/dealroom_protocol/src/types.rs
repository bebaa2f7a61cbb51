//! Roles, approval statuses, topics and notification messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown role: {0} (expected 1, 2, proposer or counterparty)")]
    Role(String),
    #[error("Unknown approval status: {0}")]
    Status(String),
}

// ============================================================================
// Role
// ============================================================================

/// Which side of the negotiation a session plays.
///
/// The proposer (Team 1) owns term values; the counterparty (Team 2) owns
/// approval statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Proposer,
    Counterparty,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposer => "proposer",
            Self::Counterparty => "counterparty",
        }
    }

    /// Display label used in views ("Team 1" / "Team 2").
    pub fn team_label(&self) -> &'static str {
        match self {
            Self::Proposer => "Team 1",
            Self::Counterparty => "Team 2",
        }
    }

    pub fn peer(&self) -> Role {
        match self {
            Self::Proposer => Self::Counterparty,
            Self::Counterparty => Self::Proposer,
        }
    }

    /// Topic this role publishes its updates on.
    pub fn publish_topic(&self, game: &str) -> Topic {
        Topic::updates(game, *self)
    }

    /// Topic this role listens on (the peer's update topic).
    pub fn listen_topic(&self, game: &str) -> Topic {
        Topic::updates(game, self.peer())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.team_label())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(' ', "").as_str() {
            "1" | "team1" | "proposer" => Ok(Self::Proposer),
            "2" | "team2" | "counterparty" => Ok(Self::Counterparty),
            _ => Err(ParseError::Role(s.to_string())),
        }
    }
}

// ============================================================================
// Approval status
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
        }
    }

    /// Parse a stored status. Accepts the legacy `TBD`/`OK` labels.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" | "TBD" => Some(Self::Pending),
            "APPROVED" | "OK" => Some(Self::Approved),
            _ => None,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&s.trim().to_ascii_uppercase()).ok_or_else(|| ParseError::Status(s.to_string()))
    }
}

// ============================================================================
// Topics and notifications
// ============================================================================

/// Named notification channel on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `<game>/team1_updates` or `<game>/team2_updates`.
    pub fn updates(game: &str, publisher: Role) -> Self {
        let suffix = match publisher {
            Role::Proposer => "team1_updates",
            Role::Counterparty => "team2_updates",
        };
        Self(format!("{}/{}", game, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bus message. The payload is an opaque term name or marker; it only
/// signals that something changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub topic: Topic,
    pub payload: String,
}

impl Notification {
    pub fn new(topic: Topic, payload: impl Into<String>) -> Self {
        Self {
            topic,
            payload: payload.into(),
        }
    }
}
