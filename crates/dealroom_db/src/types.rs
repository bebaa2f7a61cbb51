//! Term rows and snapshots.

use chrono::{DateTime, Utc};
use dealroom_protocol::ApprovalStatus;
use serde::{Deserialize, Serialize};

/// Name and display unit of one negotiable term, fixed at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSpec {
    pub name: String,
    pub unit: String,
}

impl TermSpec {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

/// One negotiable quantity as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub name: String,
    /// Proposer-supplied; None until first edit
    pub value: Option<f64>,
    pub unit: String,
    /// Counterparty-supplied
    pub status: ApprovalStatus,
    pub last_modified: DateTime<Utc>,
}

impl Term {
    pub fn is_approved(&self) -> bool {
        self.status.is_approved()
    }
}

/// Single consistent read of every term, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermSnapshot {
    terms: Vec<Term>,
}

impl TermSnapshot {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Approval state as of this snapshot. Display only: settlement gating
    /// must use `TermStore::is_fully_approved`, which reads fresh.
    pub fn all_approved(&self) -> bool {
        self.terms.iter().all(Term::is_approved)
    }

    pub fn approved_count(&self) -> usize {
        self.terms.iter().filter(|t| t.is_approved()).count()
    }
}

impl<'a> IntoIterator for &'a TermSnapshot {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}
