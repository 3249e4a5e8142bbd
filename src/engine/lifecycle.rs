//! Activation-signal subscription.
//!
//! An optional bridge from an external lifecycle signal source (for example
//! an app-foregrounded notification) to the engine's activation path. The
//! subscription is taken once at engine construction and torn down when the
//! engine is dropped.

use std::sync::{Mutex, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::warn;

use super::EngineInner;

/// Forwards external activation signals to the owning engine.
///
/// Holds only a `Weak` engine reference so the subscription never keeps the
/// engine alive. Dropping the listener closes its shutdown channel and the
/// worker thread exits; already-forwarded activations are unaffected.
#[derive(Debug)]
pub(super) struct ActivationListener {
    shutdown_tx: Sender<()>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl ActivationListener {
    /// Subscribes to `activations`, forwarding each signal to `engine`.
    pub(super) fn spawn(engine: Weak<EngineInner>, activations: Receiver<()>) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let join = thread::Builder::new()
            .name("cuepoint-lifecycle".to_string())
            .spawn(move || listener_loop(&engine, &activations, &shutdown_rx))
            .expect("failed to spawn cuepoint lifecycle listener");

        Self {
            shutdown_tx,
            join: Mutex::new(Some(join)),
        }
    }
}

impl Drop for ActivationListener {
    fn drop(&mut self) {
        // Close the shutdown channel so the worker's select wakes up.
        let (dummy_tx, _) = bounded::<()>(1);
        let old_tx = std::mem::replace(&mut self.shutdown_tx, dummy_tx);
        drop(old_tx);

        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                // Detach rather than join: the worker may be mid-forward
                // into the engine that is currently being dropped.
                drop(handle);
            }
        }
    }
}

fn listener_loop(
    engine: &Weak<EngineInner>,
    activations: &Receiver<()>,
    shutdown_rx: &Receiver<()>,
) {
    loop {
        select! {
            recv(activations) -> msg => {
                if msg.is_err() {
                    // Signal source closed.
                    break;
                }
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                if let Err(e) = inner.report_activation() {
                    warn!(error = %e, "activation signal processing failed");
                }
            }
            recv(shutdown_rx) -> _ => {
                break;
            }
        }
    }
}
