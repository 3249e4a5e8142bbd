//! Responder engine: state mutation, version-change detection, and trigger
//! dispatch.
//!
//! The engine owns the persisted [`UsageState`] and the registry of trigger
//! rules. Every counted event mutates state under one lock, persists it,
//! then re-evaluates the registry; matching callbacks are handed to the
//! [`CallbackDispatcher`] rather than invoked inline.

mod dispatch;
mod lifecycle;

pub use dispatch::{CallbackDispatcher, DispatcherConfig};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use crate::error::{CueError, CueResult};
use crate::state::UsageState;
use crate::storage::{StateStore, StorageError};
use crate::trigger::{Trigger, TriggerId};
use crate::version::VersionProvider;
use crate::DEFAULT_STORAGE_KEY;

use lifecycle::ActivationListener;

type TriggerCallback = Arc<dyn Fn(TriggerId) + Send + Sync>;

/// Configuration for a [`ResponderEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Zero all counters and clear fired history when a version change is
    /// detected at construction. Defaults to true.
    pub reset_on_update: bool,

    /// Key under which the usage record is persisted. Must be non-empty.
    pub storage_key: String,

    /// Callback delivery configuration.
    pub dispatch: DispatcherConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reset_on_update: true,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            dispatch: DispatcherConfig::default(),
        }
    }
}

/// A registered trigger rule. Owned exclusively by the engine's registry;
/// re-registering an identifier overwrites, cancellation removes.
struct RegisteredRule {
    trigger: Trigger,
    repeats: bool,
    callback: TriggerCallback,
}

/// State and registry, guarded together by one lock so an evaluation pass
/// always sees the registry and counters it started with.
struct Shared {
    state: UsageState,
    registry: HashMap<TriggerId, RegisteredRule>,
}

pub(crate) struct EngineInner {
    store: Arc<dyn StateStore>,
    storage_key: String,
    dispatcher: Arc<CallbackDispatcher>,
    shared: Mutex<Shared>,
    listener: Mutex<Option<ActivationListener>>,
}

/// Usage-signal trigger engine.
///
/// Cloneable handle over shared internals; clones observe and mutate the
/// same state and registry. Construction counts one launch. All mutation
/// operations serialize on an internal lock, persist the record, then run
/// an evaluation pass over every registered rule.
#[derive(Clone)]
pub struct ResponderEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for ResponderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderEngine").finish_non_exhaustive()
    }
}

impl ResponderEngine {
    /// Creates an engine with its own callback dispatcher.
    ///
    /// Loads the record stored under `config.storage_key` (absent or
    /// unreadable records degrade to a first run), applies version-change
    /// handling against `versions`, counts one launch, and persists.
    ///
    /// # Errors
    /// Returns [`CueError::InvalidConfig`] for an empty storage key and
    /// [`CueError::Storage`] when the construction-time persist fails; a
    /// store that cannot accept the initial record is a configuration
    /// problem, not a transient one.
    pub fn new(
        store: Arc<dyn StateStore>,
        versions: Arc<dyn VersionProvider>,
        config: EngineConfig,
    ) -> CueResult<Self> {
        let dispatcher = Arc::new(CallbackDispatcher::new(config.dispatch.clone()));
        Self::with_dispatcher(store, versions, config, dispatcher)
    }

    /// Creates an engine sharing an existing callback dispatcher.
    ///
    /// # Errors
    /// Same as [`ResponderEngine::new`].
    pub fn with_dispatcher(
        store: Arc<dyn StateStore>,
        versions: Arc<dyn VersionProvider>,
        config: EngineConfig,
        dispatcher: Arc<CallbackDispatcher>,
    ) -> CueResult<Self> {
        if config.storage_key.is_empty() {
            return Err(CueError::invalid_config("storage key must not be empty"));
        }

        let now = Utc::now();
        let current_version = versions.current_version();

        let mut state = match store.get(&config.storage_key) {
            Ok(Some(state)) => state,
            Ok(None) => UsageState::fresh(&current_version, now),
            Err(e) => {
                warn!(error = %e, key = %config.storage_key,
                    "failed to load persisted state: starting fresh");
                UsageState::fresh(&current_version, now)
            }
        };

        if state.installed_version != current_version {
            debug!(
                from = %state.installed_version,
                to = %current_version,
                reset = config.reset_on_update,
                "version change detected"
            );
            state.apply_version_change(&current_version, now, config.reset_on_update);
        }

        state.record_launch();
        store.set(&config.storage_key, &state)?;

        Ok(Self {
            inner: Arc::new(EngineInner {
                store,
                storage_key: config.storage_key,
                dispatcher,
                shared: Mutex::new(Shared {
                    state,
                    registry: HashMap::new(),
                }),
                listener: Mutex::new(None),
            }),
        })
    }

    /// Creates an engine subscribed to an external activation source.
    ///
    /// Each `()` received on `activations` is reported as one foreground
    /// activation. The subscription ends when the engine is dropped or the
    /// source channel closes.
    ///
    /// # Errors
    /// Same as [`ResponderEngine::new`].
    pub fn with_activation_source(
        store: Arc<dyn StateStore>,
        versions: Arc<dyn VersionProvider>,
        config: EngineConfig,
        activations: Receiver<()>,
    ) -> CueResult<Self> {
        let engine = Self::new(store, versions, config)?;
        let listener = ActivationListener::spawn(Arc::downgrade(&engine.inner), activations);
        *engine
            .inner
            .listener
            .lock()
            .map_err(|_| CueError::internal("listener lock poisoned"))? = Some(listener);
        Ok(engine)
    }

    /// Reports one foreground activation.
    ///
    /// # Errors
    /// Returns [`CueError::Storage`] when persisting fails; the in-memory
    /// counter still advances and the evaluation pass still runs.
    pub fn report_activation(&self) -> CueResult<()> {
        self.inner.report_activation()
    }

    /// Reports one occurrence of a named significant event.
    ///
    /// # Errors
    /// Returns [`CueError::Storage`] when persisting fails; the in-memory
    /// counter still advances and the evaluation pass still runs.
    pub fn report_significant_event(&self, id: impl Into<String>) -> CueResult<()> {
        let id = id.into();
        self.inner
            .mutate_and_evaluate(move |state| state.record_significant_event(id))
    }

    /// Registers (or replaces) a trigger rule and immediately runs one
    /// evaluation pass, so already-satisfied conditions fire without
    /// waiting for the next event.
    ///
    /// A rule with `repeats = false` fires at most once; its identifier is
    /// recorded in persisted history. A repeating rule fires on every
    /// passing evaluation, including passes caused by unrelated events.
    ///
    /// # Errors
    /// Returns [`CueError::Storage`] when persisting updated history fails.
    pub fn register_trigger(
        &self,
        id: impl Into<TriggerId>,
        trigger: Trigger,
        repeats: bool,
        callback: impl Fn(TriggerId) + Send + Sync + 'static,
    ) -> CueResult<()> {
        let id = id.into();
        let mut shared = self.inner.lock_shared()?;
        shared.registry.insert(
            id,
            RegisteredRule {
                trigger,
                repeats,
                callback: Arc::new(callback),
            },
        );

        let history_changed = self.inner.evaluate(&mut shared);
        let persist = if history_changed {
            self.inner.persist(&shared.state)
        } else {
            Ok(())
        };
        drop(shared);
        persist?;
        Ok(())
    }

    /// Cancels a registered trigger. Unknown identifiers are a no-op.
    /// Never touches fired history: a cancelled-then-re-registered
    /// non-repeating rule that already fired stays suppressed until a
    /// version reset clears history.
    ///
    /// # Errors
    /// Returns [`CueError::Internal`] only if the engine lock is poisoned.
    pub fn cancel_trigger(&self, id: impl Into<TriggerId>) -> CueResult<()> {
        let id = id.into();
        let mut shared = self.inner.lock_shared()?;
        shared.registry.remove(&id);
        Ok(())
    }

    /// Returns a copy of the current usage state.
    ///
    /// # Errors
    /// Returns [`CueError::Internal`] only if the engine lock is poisoned.
    pub fn snapshot(&self) -> CueResult<UsageState> {
        let shared = self.inner.lock_shared()?;
        Ok(shared.state.clone())
    }

    /// The callback delivery context used by this engine.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<CallbackDispatcher> {
        &self.inner.dispatcher
    }
}

impl EngineInner {
    fn lock_shared(&self) -> CueResult<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|_| CueError::internal("engine state lock poisoned"))
    }

    fn report_activation(&self) -> CueResult<()> {
        self.mutate_and_evaluate(UsageState::record_activation)
    }

    /// The single mutation entry point: mutate under the lock, persist,
    /// evaluate, and persist again iff the pass changed history. Both
    /// persist results are observed; the first error wins.
    fn mutate_and_evaluate(&self, mutate: impl FnOnce(&mut UsageState)) -> CueResult<()> {
        let mut shared = self.lock_shared()?;
        mutate(&mut shared.state);

        let persisted = self.persist(&shared.state);
        let history_changed = self.evaluate(&mut shared);
        let persisted_history = if history_changed {
            self.persist(&shared.state)
        } else {
            Ok(())
        };
        drop(shared);

        persisted.and(persisted_history)?;
        Ok(())
    }

    fn persist(&self, state: &UsageState) -> Result<(), StorageError> {
        let result = self.store.set(&self.storage_key, state);
        if let Err(e) = &result {
            warn!(error = %e, key = %self.storage_key, "failed to persist usage state");
        }
        result
    }

    /// One evaluation pass over every registered rule. Returns whether the
    /// fired history changed.
    ///
    /// Matching is level-triggered: a repeating rule fires on every pass
    /// where its trigger holds, not only on the transition into a passing
    /// state. Callbacks are submitted to the dispatcher, never invoked
    /// inline, so a reentrant callback runs after this lock is released
    /// and serializes like any other caller.
    fn evaluate(&self, shared: &mut Shared) -> bool {
        let Shared { state, registry } = &mut *shared;
        let now = Utc::now();
        let mut history_changed = false;

        for (id, rule) in registry.iter() {
            if !rule.repeats && state.has_fired(id) {
                continue;
            }
            if !rule.trigger.matches(state, now) {
                continue;
            }

            debug!(trigger = %id, repeats = rule.repeats, "trigger fired");
            let callback = Arc::clone(&rule.callback);
            let fired_id = id.clone();
            // Overflow is counted and warned by the dispatcher; the pass
            // carries on.
            let _ = self.dispatcher.submit(move || callback(fired_id));

            if state.mark_fired(id) {
                history_changed = true;
            }
        }

        history_changed
    }
}
