//! Host-driven signal subscriptions.
//!
//! The cache reacts to two external events: low memory and process
//! termination. How those events are detected is the host's business; the
//! cache only needs a [`SignalSource`] it can subscribe callbacks to and later
//! unsubscribe from. Callbacks may run on any thread and must return quickly:
//! the cache's callbacks only enqueue a command onto its serializer lane.
//!
//! [`SignalHub`] is the in-process implementation. A host bridges its own
//! notification mechanism (OS memory warnings, a `SIGTERM` handler, a test
//! harness) by calling [`SignalHub::emit`].
//!
//! ```
//! use metacache::signal::{Signal, SignalHub, SignalSource};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let hub = SignalHub::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//! let id = hub.subscribe(
//!     Signal::MemoryPressure,
//!     Arc::new(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }),
//! );
//!
//! assert_eq!(hub.emit(Signal::MemoryPressure), 1);
//! assert!(hub.unsubscribe(id));
//! assert_eq!(hub.emit(Signal::MemoryPressure), 0);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// External events a cache subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The host is low on memory; the cache prunes a fraction of its entries.
    MemoryPressure,
    /// The process is terminating; the cache clears itself.
    Terminate,
}

/// Callback registered for a [`Signal`].
pub type SignalCallback = Arc<dyn Fn() + Send + Sync>;

/// Token returned by [`SignalSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Anything that can deliver [`Signal`]s to registered callbacks.
pub trait SignalSource: Send + Sync {
    /// Registers `callback` to run every time `signal` is delivered.
    fn subscribe(&self, signal: Signal, callback: SignalCallback) -> SubscriptionId;

    /// Removes a subscription; returns `false` if `id` was not registered.
    ///
    /// Once this returns, the callback is not invoked by any later delivery.
    /// A delivery already in progress on another thread may still be running
    /// it.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

struct Subscription {
    id: SubscriptionId,
    signal: Signal,
    callback: SignalCallback,
}

/// In-process [`SignalSource`] that runs callbacks on the emitting thread.
pub struct SignalHub {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl SignalHub {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The process-wide hub used by [`MetadataCache::shared`](crate::cache::MetadataCache::shared).
    pub fn global() -> Arc<SignalHub> {
        static GLOBAL: OnceLock<Arc<SignalHub>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SignalHub::new())))
    }

    /// Delivers `signal` to every current subscriber, in subscription order.
    ///
    /// Callbacks run after the registry lock is released, so a callback may
    /// itself subscribe or unsubscribe. Returns the number of callbacks run.
    pub fn emit(&self, signal: Signal) -> usize {
        let callbacks: Vec<SignalCallback> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|sub| sub.signal == signal)
            .map(|sub| Arc::clone(&sub.callback))
            .collect();
        tracing::trace!(?signal, subscribers = callbacks.len(), "emitting signal");
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Number of callbacks currently registered for `signal`.
    pub fn subscriber_count(&self, signal: Signal) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|sub| sub.signal == signal)
            .count()
    }
}

impl SignalSource for SignalHub {
    fn subscribe(&self, signal: Signal, callback: SignalCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().push(Subscription {
            id,
            signal,
            callback,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        subscriptions.len() != before
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHub")
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> SignalCallback {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn emit_only_reaches_matching_signal() {
        let hub = SignalHub::new();
        let pressure = Arc::new(AtomicUsize::new(0));
        let terminate = Arc::new(AtomicUsize::new(0));
        hub.subscribe(Signal::MemoryPressure, counting_callback(&pressure));
        hub.subscribe(Signal::Terminate, counting_callback(&terminate));

        assert_eq!(hub.emit(Signal::MemoryPressure), 1);
        assert_eq!(hub.emit(Signal::MemoryPressure), 1);
        assert_eq!(pressure.load(Ordering::SeqCst), 2);
        assert_eq!(terminate.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_is_single_shot() {
        let hub = SignalHub::new();
        let id = hub.subscribe(Signal::Terminate, Arc::new(|| {}));
        assert_eq!(hub.subscriber_count(Signal::Terminate), 1);
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.subscriber_count(Signal::Terminate), 0);
    }

    #[test]
    fn subscription_ids_are_unique() {
        let hub = SignalHub::new();
        let a = hub.subscribe(Signal::Terminate, Arc::new(|| {}));
        let b = hub.subscribe(Signal::Terminate, Arc::new(|| {}));
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let hub = Arc::new(SignalHub::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let hub_ref = Arc::clone(&hub);
        let slot_ref = Arc::clone(&slot);
        let id = hub.subscribe(
            Signal::MemoryPressure,
            Arc::new(move || {
                if let Some(id) = slot_ref.lock().take() {
                    hub_ref.unsubscribe(id);
                }
            }),
        );
        *slot.lock() = Some(id);

        assert_eq!(hub.emit(Signal::MemoryPressure), 1);
        assert_eq!(hub.emit(Signal::MemoryPressure), 0);
    }

    #[test]
    fn global_hub_is_shared() {
        let a = SignalHub::global();
        let b = SignalHub::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
