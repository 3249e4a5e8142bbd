//! # cuepoint - usage-signal trigger engine
//!
//! cuepoint decides *when* to fire a callback (for example, prompting a
//! user for a review) based on accumulated usage signals: launch counts,
//! foreground activations, named significant events, and time since
//! install or update. Counters persist across process restarts; every
//! counted event re-evaluates the registered trigger rules.
//!
//! ## Core Concepts
//!
//! - **Criterion**: a single measurable condition over persisted counters
//!   and time
//! - **Trigger**: an `any`/`all` combination of criteria, tied to one
//!   registered rule
//! - **UsageState**: the persisted record of counters, timestamps, and
//!   fired history
//! - **ResponderEngine**: mutates state, persists it, and dispatches
//!   matching callbacks asynchronously
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cuepoint::{
//!     Criterion, EngineConfig, FileStateStore, ResponderEngine, StaticVersion, Trigger,
//! };
//!
//! let store = Arc::new(FileStateStore::new("/var/lib/myapp/cuepoint")?);
//! let versions = Arc::new(StaticVersion::new(env!("CARGO_PKG_VERSION")));
//! let engine = ResponderEngine::new(store, versions, EngineConfig::default())?;
//!
//! engine.register_trigger(
//!     "review-prompt",
//!     Trigger::all([Criterion::launch(5), Criterion::significant_event("export", 2)]),
//!     false,
//!     |id| println!("time to ask for a review ({id})"),
//! )?;
//!
//! engine.report_significant_event("export")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod criterion;
pub mod engine;
pub mod error;
pub mod state;
pub mod storage;
pub mod trigger;
pub mod version;

// Re-export primary types at crate root for convenience
pub use criterion::Criterion;
pub use engine::{CallbackDispatcher, DispatcherConfig, EngineConfig, ResponderEngine};
pub use error::{CueError, CueResult};
pub use state::UsageState;
pub use storage::{FileStateStore, InMemoryStateStore, StateStore, StorageError};
pub use trigger::{Trigger, TriggerId};
pub use version::{StaticVersion, VersionProvider};

/// Storage key used when [`EngineConfig`] is left at its default.
pub const DEFAULT_STORAGE_KEY: &str = "cuepoint.state";
