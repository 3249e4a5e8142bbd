//! Asynchronous callback delivery.
//!
//! Trigger callbacks are never invoked inline during an evaluation pass:
//! they are enqueued on a bounded channel and drained FIFO by a dedicated
//! worker thread, so a slow or reentrant callback cannot block the engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::error::{CueError, CueResult};

/// Configuration for a [`CallbackDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Max queued callbacks before submissions are dropped. Clamped to >= 1.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// Delivery context for trigger callbacks.
///
/// One dedicated worker thread drains a bounded queue in submission order.
/// [`CallbackDispatcher::submit`] never blocks: when the queue is full or
/// the worker has terminated, the job is dropped and counted.
#[derive(Debug)]
pub struct CallbackDispatcher {
    tx: Sender<Job>,
    capacity: usize,
    dropped_callbacks: AtomicU64,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl CallbackDispatcher {
    /// Spawns the worker thread and returns the dispatcher.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(capacity);

        let join = thread::Builder::new()
            .name("cuepoint-dispatch".to_string())
            .spawn(move || worker_loop(&rx))
            .expect("failed to spawn cuepoint dispatch worker");

        Self {
            tx,
            capacity,
            dropped_callbacks: AtomicU64::new(0),
            join: Mutex::new(Some(join)),
        }
    }

    /// Non-blocking enqueue of one callback.
    ///
    /// # Errors
    /// Returns [`CueError::DispatchQueueFull`] when the queue is at
    /// capacity and [`CueError::DispatchDisconnected`] when the worker has
    /// terminated. In both cases the job is dropped and counted.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> CueResult<()> {
        match self.tx.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped_callbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    capacity = self.capacity,
                    "dispatch queue full: callback dropped"
                );
                Err(CueError::DispatchQueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped_callbacks.fetch_add(1, Ordering::Relaxed);
                warn!("dispatch worker disconnected: callback dropped");
                Err(CueError::DispatchDisconnected)
            }
        }
    }

    /// Number of callbacks dropped due to a full or disconnected queue.
    #[must_use]
    pub fn dropped_callbacks(&self) -> u64 {
        self.dropped_callbacks.load(Ordering::Relaxed)
    }

    /// Configured queue capacity (after clamping).
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for CallbackDispatcher {
    fn drop(&mut self) {
        // Close the channel so the worker can terminate once the queue
        // drains.
        let (dummy_tx, _) = bounded::<Job>(1);
        let old_tx = std::mem::replace(&mut self.tx, dummy_tx);
        drop(old_tx);

        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                // Do not join here.
                //
                // Already-queued callbacks still run to completion, and a
                // callback may hold a clone of the owning engine handle.
                // Joining from that engine's drop would deadlock; detaching
                // is safe because the worker exits once the last sender is
                // dropped and the queue is empty.
                drop(handle);
            }
        }
    }
}

fn worker_loop(rx: &Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        job();
    }
}
