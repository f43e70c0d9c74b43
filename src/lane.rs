//! Serializer lane: the single worker that owns a cache's storage.
//!
//! ## Architecture
//!
//! ```text
//!   caller threads        sweep timer        signal callbacks
//!        │ get/set/clear       │ tick              │ pressure / terminate
//!        ▼                     ▼                   ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │  LaneShared: RwLock<Option<Sender<Command>>>                 │
//!   │    submit() = read lock + send      close() = write lock     │
//!   └──────────────────────────────┬───────────────────────────────┘
//!                                  │ unbounded FIFO channel
//!                                  ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │  worker thread: for command in receiver { apply(command) }   │
//!   │  owns LruStore<K, V> exclusively                             │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every producer pushes onto one channel, so execution order equals
//! submission order across all threads. Reads and `clear` carry a one-shot
//! reply channel and block on it; writes and scheduler commands do not.
//!
//! Closing the lane swaps the sender out under the write lock. Any
//! submission that already holds the read lock completes first; any later
//! one sees `None` and is dropped. The worker drains what was queued, sees
//! the channel disconnect, and exits.

use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::error::InvariantError;
use crate::metrics::CacheStats;
use crate::policy::lru::LruStore;

type Reply<T> = Sender<T>;

/// A unit of work executed on the lane.
pub(crate) enum Command<K, V> {
    Get { key: K, reply: Reply<Option<V>> },
    Peek { key: K, reply: Reply<Option<V>> },
    Contains { key: K, reply: Reply<bool> },
    Set { key: K, value: V },
    /// `reply` is `None` when the clear comes from a termination signal.
    Clear { reply: Option<Reply<()>> },
    EnforceCapacity,
    Prune { fraction: f64 },
    Len { reply: Reply<usize> },
    Keys { reply: Reply<Vec<K>> },
    Stats { reply: Reply<CacheStats> },
    CheckInvariants { reply: Reply<Result<(), InvariantError>> },
}

impl<K, V> Command<K, V> {
    fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Peek { .. } => "peek",
            Command::Contains { .. } => "contains",
            Command::Set { .. } => "set",
            Command::Clear { .. } => "clear",
            Command::EnforceCapacity => "enforce_capacity",
            Command::Prune { .. } => "prune",
            Command::Len { .. } => "len",
            Command::Keys { .. } => "keys",
            Command::Stats { .. } => "stats",
            Command::CheckInvariants { .. } => "check_invariants",
        }
    }
}

/// Submission side of the lane, shared by the owner and weak handles.
pub(crate) struct LaneShared<K, V> {
    sender: RwLock<Option<Sender<Command<K, V>>>>,
}

impl<K, V> LaneShared<K, V> {
    /// Enqueues `command`; returns `false` once the lane is closed.
    fn submit(&self, command: Command<K, V>) -> bool {
        let sender = self.sender.read();
        match sender.as_ref() {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

/// Owning handle to a running lane.
pub(crate) struct Lane<K, V> {
    shared: Arc<LaneShared<K, V>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Lane<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Spawns the worker thread that owns `store`.
    pub(crate) fn spawn(store: LruStore<K, V>) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name("metacache-lane".into())
            .spawn(move || run(store, rx))?;
        Ok(Self {
            shared: Arc::new(LaneShared {
                sender: RwLock::new(Some(tx)),
            }),
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl<K, V> Lane<K, V> {
    /// Non-owning handle for callbacks and the sweep timer.
    pub(crate) fn handle(&self) -> LaneHandle<K, V> {
        LaneHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Fire-and-forget submission.
    pub(crate) fn submit(&self, command: Command<K, V>) -> bool {
        self.shared.submit(command)
    }

    /// Submits a command built around a reply channel and waits for the answer.
    ///
    /// Returns `None` if the lane is closed, or if it shut down before
    /// answering.
    pub(crate) fn request<R>(&self, build: impl FnOnce(Reply<R>) -> Command<K, V>) -> Option<R> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if !self.shared.submit(build(tx)) {
            return None;
        }
        rx.recv().ok()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stops accepting commands. Already-queued commands still run.
    ///
    /// Returns `true` on the first call only.
    pub(crate) fn close(&self) -> bool {
        let closed = self.shared.close();
        if closed {
            tracing::debug!("serializer lane closed");
        }
        closed
    }

    /// Closes the lane, lets queued commands finish, and joins the worker.
    ///
    /// Idempotent. A concurrent caller blocks until the worker has exited.
    pub(crate) fn close_and_join(&self) {
        self.close();
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                tracing::warn!("serializer lane worker panicked");
            }
        }
    }
}

impl<K, V> Drop for Lane<K, V> {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

/// Weak handle that never keeps a lane alive.
///
/// Submitting through a handle whose lane was dropped or closed is a silent
/// no-op.
pub(crate) struct LaneHandle<K, V> {
    shared: Weak<LaneShared<K, V>>,
}

impl<K, V> LaneHandle<K, V> {
    pub(crate) fn submit(&self, command: Command<K, V>) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.submit(command),
            None => false,
        }
    }
}

impl<K, V> Clone for LaneHandle<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

fn run<K, V>(mut store: LruStore<K, V>, commands: Receiver<Command<K, V>>)
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    tracing::debug!(capacity = store.capacity(), "serializer lane started");
    for command in commands.iter() {
        tracing::trace!(command = command.name(), "applying");
        apply(&mut store, command);
    }
    tracing::debug!(remaining = store.len(), "serializer lane drained");
}

fn apply<K, V>(store: &mut LruStore<K, V>, command: Command<K, V>)
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    // A dropped reply receiver just means the caller stopped waiting.
    match command {
        Command::Get { key, reply } => {
            let _ = reply.send(store.get(&key).cloned());
        },
        Command::Peek { key, reply } => {
            let _ = reply.send(store.peek(&key).cloned());
        },
        Command::Contains { key, reply } => {
            let _ = reply.send(store.contains(&key));
        },
        Command::Set { key, value } => {
            store.set(key, value);
        },
        Command::Clear { reply } => {
            let dropped = store.len();
            store.clear();
            tracing::debug!(dropped, "cache cleared");
            if let Some(reply) = reply {
                let _ = reply.send(());
            }
        },
        Command::EnforceCapacity => {
            let evicted = store.enforce_capacity();
            tracing::debug!(evicted, len = store.len(), "capacity sweep");
        },
        Command::Prune { fraction } => {
            let before = store.len();
            let evicted = store.prune(fraction);
            tracing::debug!(before, evicted, fraction, "pressure prune");
        },
        Command::Len { reply } => {
            let _ = reply.send(store.len());
        },
        Command::Keys { reply } => {
            let _ = reply.send(store.keys_mru());
        },
        Command::Stats { reply } => {
            let _ = reply.send(store.stats());
        },
        Command::CheckInvariants { reply } => {
            let _ = reply.send(store.check_invariants());
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(capacity: usize) -> Lane<u32, String> {
        Lane::spawn(LruStore::new(capacity)).unwrap()
    }

    #[test]
    fn request_observes_prior_fire_and_forget_writes() {
        let lane = lane(4);
        lane.submit(Command::Set {
            key: 1,
            value: "one".to_string(),
        });
        let got = lane.request(|reply| Command::Get { key: 1, reply });
        assert_eq!(got, Some(Some("one".to_string())));
        lane.close_and_join();
    }

    #[test]
    fn commands_apply_in_submission_order() {
        let lane = lane(4);
        for i in 0..4 {
            lane.submit(Command::Set {
                key: i,
                value: i.to_string(),
            });
        }
        lane.submit(Command::Prune { fraction: 0.5 });
        lane.submit(Command::Set {
            key: 9,
            value: "nine".into(),
        });
        let keys = lane.request(|reply| Command::Keys { reply });
        assert_eq!(keys, Some(vec![9, 3, 2]));
        lane.close_and_join();
    }

    #[test]
    fn closed_lane_rejects_submissions() {
        let lane = lane(4);
        lane.close_and_join();
        assert!(lane.is_closed());
        assert!(!lane.submit(Command::EnforceCapacity));
        assert_eq!(lane.request(|reply| Command::Len { reply }), None);
        lane.close_and_join();
    }

    #[test]
    fn queued_commands_finish_before_worker_exits() {
        let lane = lane(1_000);
        let (tx, rx) = crossbeam_channel::bounded(1);
        for i in 0..500 {
            lane.submit(Command::Set {
                key: i,
                value: String::new(),
            });
        }
        lane.submit(Command::Len { reply: tx });
        lane.close_and_join();
        assert_eq!(rx.recv().ok(), Some(500));
    }

    #[test]
    fn weak_handle_is_noop_after_drop() {
        let lane = lane(4);
        let handle = lane.handle();
        assert!(handle.submit(Command::EnforceCapacity));
        lane.close_and_join();
        assert!(!handle.submit(Command::EnforceCapacity));
        drop(lane);
        assert!(!handle.clone().submit(Command::EnforceCapacity));
    }
}
