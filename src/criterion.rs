//! Criterion predicates over persisted usage state.
//!
//! These types are intentionally serializable so rule definitions can be
//! loaded from configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::state::UsageState;

/// A single measurable condition over persisted counters and time.
///
/// Evaluation is a pure function of (`UsageState`, now); no criterion
/// mutates state or touches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criterion {
    /// Launch count has reached `count`.
    Launch {
        /// Minimum launch count.
        count: u64,
    },

    /// Activation count has reached `count`.
    Activated {
        /// Minimum activation count.
        count: u64,
    },

    /// The named significant event has been reported at least `count`
    /// times. A never-reported identifier matches nothing.
    SignificantEvent {
        /// Event identifier.
        id: String,
        /// Minimum event count.
        count: u64,
    },

    /// Still within `days` of the later of install and last update.
    ///
    /// Note the direction: this matches while the window is open, not once
    /// it has elapsed. Preserved literally from the product definition;
    /// pending clarification of intent.
    DaysSinceInstallOrUpdate {
        /// Window length in days.
        days: i64,
    },
}

impl Criterion {
    /// Launch-count criterion.
    #[must_use]
    pub const fn launch(count: u64) -> Self {
        Self::Launch { count }
    }

    /// Activation-count criterion.
    #[must_use]
    pub const fn activated(count: u64) -> Self {
        Self::Activated { count }
    }

    /// Significant-event criterion.
    #[must_use]
    pub fn significant_event(id: impl Into<String>, count: u64) -> Self {
        Self::SignificantEvent {
            id: id.into(),
            count,
        }
    }

    /// Install/update-window criterion.
    #[must_use]
    pub const fn days_since_install_or_update(days: i64) -> Self {
        Self::DaysSinceInstallOrUpdate { days }
    }

    /// Tests this criterion against the given state at the given instant.
    #[must_use]
    pub fn matches(&self, state: &UsageState, now: DateTime<Utc>) -> bool {
        match self {
            Self::Launch { count } => state.launch_count >= *count,
            Self::Activated { count } => state.activation_count >= *count,
            Self::SignificantEvent { id, count } => state.significant_event_count(id) >= *count,
            Self::DaysSinceInstallOrUpdate { days } => {
                match state.reference_point().checked_add_signed(Duration::days(*days)) {
                    Some(window_end) => window_end >= now,
                    // Window end beyond representable time: always open.
                    None => true,
                }
            }
        }
    }
}
