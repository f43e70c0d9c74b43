//! Eviction scheduler: the periodic capacity sweep and the signal wiring.
//!
//! ```text
//!   sweep thread ── tick every sweep_interval ──► EnforceCapacity ─┐
//!   MemoryPressure callback ───────────────────► Prune(fraction) ──┼──► lane
//!   Terminate callback ────────────────────────► Clear ────────────┘
//! ```
//!
//! Every trigger only enqueues onto the serializer lane through a
//! [`LaneHandle`], which is weak: a trigger that fires after its cache is
//! gone does nothing.
//!
//! Teardown unsubscribes both callbacks and cancels the sweep thread. It is
//! idempotent and safe to call from any thread other than the sweep thread
//! itself.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, select};
use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::lane::{Command, LaneHandle};
use crate::signal::{Signal, SignalSource, SubscriptionId};

/// Repeating timer thread that can be cancelled once.
struct SweepTimer {
    cancel: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SweepTimer {
    /// Starts a thread that calls `on_tick` every `interval`.
    ///
    /// The first tick fires one full interval after start. The thread exits
    /// when cancelled or when `on_tick` returns `false`.
    fn start<F>(interval: Duration, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let worker = thread::Builder::new()
            .name("metacache-sweep".into())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                loop {
                    select! {
                        recv(cancel_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if !on_tick() {
                                break;
                            }
                        },
                    }
                }
                tracing::debug!("sweep timer stopped");
            })?;
        Ok(Self {
            cancel: Mutex::new(Some(cancel_tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Stops the timer and waits for its thread. Returns `true` on the first call.
    ///
    /// Concurrent callers block until the thread has been joined.
    fn cancel(&self) -> bool {
        // Dropping the sender disconnects `cancel_rx`, which wakes the select.
        let cancelled = self.cancel.lock().take().is_some();
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                tracing::warn!("sweep timer thread panicked");
            }
        }
        cancelled
    }
}

/// Owns the sweep timer and the signal subscriptions of one cache.
pub(crate) struct EvictionScheduler {
    timer: SweepTimer,
    signals: Arc<dyn SignalSource>,
    /// Live subscriptions; `None` once teardown has completed.
    subscriptions: Mutex<Option<Vec<SubscriptionId>>>,
}

impl EvictionScheduler {
    /// Subscribes to pressure and termination signals and starts the sweep.
    pub(crate) fn start<K, V>(
        lane: LaneHandle<K, V>,
        config: &CacheConfig,
        signals: Arc<dyn SignalSource>,
    ) -> io::Result<Self>
    where
        K: Send + 'static,
        V: Send + 'static,
    {
        let sweep_lane = lane.clone();
        let timer = SweepTimer::start(config.sweep_interval(), move || {
            sweep_lane.submit(Command::EnforceCapacity)
        })?;

        let fraction = config.prune_percentage();
        let pressure_lane = lane.clone();
        let pressure = signals.subscribe(
            Signal::MemoryPressure,
            Arc::new(move || {
                pressure_lane.submit(Command::Prune { fraction });
            }),
        );
        let terminate_lane = lane;
        let terminate = signals.subscribe(
            Signal::Terminate,
            Arc::new(move || {
                terminate_lane.submit(Command::Clear { reply: None });
            }),
        );

        tracing::debug!(
            sweep_interval = ?config.sweep_interval(),
            prune_percentage = fraction,
            "eviction scheduler started"
        );

        Ok(Self {
            timer,
            signals,
            subscriptions: Mutex::new(Some(vec![pressure, terminate])),
        })
    }

    /// Unsubscribes every signal and cancels the sweep timer.
    ///
    /// Only the first call does any work. The lock is held for the whole
    /// teardown, so a concurrent caller returns only once it has finished.
    pub(crate) fn teardown(&self) {
        let mut subscriptions = self.subscriptions.lock();
        let Some(ids) = subscriptions.take() else {
            return;
        };
        for id in ids {
            if !self.signals.unsubscribe(id) {
                tracing::warn!(subscription = id.as_u64(), "signal subscription already gone");
            }
        }
        self.timer.cancel();
        tracing::debug!("eviction scheduler torn down");
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.subscriptions.lock().is_none()
    }
}

impl Drop for EvictionScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for EvictionScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictionScheduler")
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}
