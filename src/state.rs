//! Persisted usage record.
//!
//! One `UsageState` exists per storage key. Every counted event mutates the
//! record through the engine, which persists it before returning, so the
//! stored copy is never more than one evaluation pass behind memory.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trigger::TriggerId;

/// Accumulated usage signals for one storage key.
///
/// Counters are monotonically non-decreasing except when zeroed by a
/// version-change reset. `history` holds the identifiers of triggers that
/// have already fired, used to suppress re-firing of non-repeating rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageState {
    /// Number of process starts recorded.
    pub launch_count: u64,

    /// Number of foreground activations recorded.
    pub activation_count: u64,

    /// Per-identifier counts of named significant events.
    #[serde(default)]
    pub significant_event_counts: HashMap<String, u64>,

    /// When this record was first created.
    pub installed_at: DateTime<Utc>,

    /// Application version at install or last detected update. Opaque,
    /// compared for equality only.
    pub installed_version: String,

    /// When a version change was last detected. Always >= `installed_at`
    /// when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,

    /// Identifiers of triggers that have already fired.
    #[serde(default)]
    pub history: HashSet<TriggerId>,
}

impl UsageState {
    /// Creates a first-run record: all counters zero, no history.
    #[must_use]
    pub fn fresh(version: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            launch_count: 0,
            activation_count: 0,
            significant_event_counts: HashMap::new(),
            installed_at: now,
            installed_version: version.into(),
            last_updated_at: None,
            history: HashSet::new(),
        }
    }

    /// Records one process start.
    pub fn record_launch(&mut self) {
        self.launch_count += 1;
    }

    /// Records one foreground activation.
    pub fn record_activation(&mut self) {
        self.activation_count += 1;
    }

    /// Records one occurrence of the named significant event.
    pub fn record_significant_event(&mut self, id: impl Into<String>) {
        *self.significant_event_counts.entry(id.into()).or_insert(0) += 1;
    }

    /// Returns the count for a named significant event (0 when never seen).
    #[must_use]
    pub fn significant_event_count(&self, id: &str) -> u64 {
        self.significant_event_counts.get(id).copied().unwrap_or(0)
    }

    /// Applies a detected version change.
    ///
    /// Sets the new version and `last_updated_at = now`. When `reset` is
    /// true, also zeroes every counter and clears the fired-trigger history
    /// so non-repeating rules may fire again. `installed_at` is preserved
    /// either way.
    pub fn apply_version_change(
        &mut self,
        version: impl Into<String>,
        now: DateTime<Utc>,
        reset: bool,
    ) {
        self.installed_version = version.into();
        self.last_updated_at = Some(now);
        if reset {
            self.launch_count = 0;
            self.activation_count = 0;
            self.significant_event_counts.clear();
            self.history.clear();
        }
    }

    /// Returns true if the trigger has already fired at least once.
    #[must_use]
    pub fn has_fired(&self, id: &TriggerId) -> bool {
        self.history.contains(id)
    }

    /// Adds a trigger to the fired history. Returns true if the history
    /// changed (the identifier was not already present).
    pub fn mark_fired(&mut self, id: &TriggerId) -> bool {
        if self.history.contains(id) {
            return false;
        }
        self.history.insert(id.clone())
    }

    /// The reference point for time-window criteria: the later of install
    /// and last update.
    #[must_use]
    pub fn reference_point(&self) -> DateTime<Utc> {
        self.last_updated_at
            .map_or(self.installed_at, |updated| updated.max(self.installed_at))
    }
}
