//! Trigger identifiers and boolean combinators over criteria.
//!
//! These types are intentionally serializable so rule definitions can be
//! loaded from configuration.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::criterion::Criterion;
use crate::state::UsageState;

/// Caller-chosen identifier for a registered trigger rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(String);

impl TriggerId {
    /// Wraps a rule name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the rule name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TriggerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TriggerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A boolean combination of criteria, associated with one registered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Matches when at least one criterion matches. An empty set never
    /// matches.
    Any {
        /// Criteria to combine.
        criteria: Vec<Criterion>,
    },

    /// Matches when every criterion matches. An empty set is vacuously
    /// true.
    All {
        /// Criteria to combine.
        criteria: Vec<Criterion>,
    },
}

impl Trigger {
    /// Builds an `Any` combinator.
    #[must_use]
    pub fn any(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Self::Any {
            criteria: criteria.into_iter().collect(),
        }
    }

    /// Builds an `All` combinator.
    #[must_use]
    pub fn all(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Self::All {
            criteria: criteria.into_iter().collect(),
        }
    }

    /// Tests this trigger against the given state at the given instant.
    #[must_use]
    pub fn matches(&self, state: &UsageState, now: DateTime<Utc>) -> bool {
        match self {
            Self::Any { criteria } => criteria.iter().any(|c| c.matches(state, now)),
            Self::All { criteria } => criteria.iter().all(|c| c.matches(state, now)),
        }
    }
}
