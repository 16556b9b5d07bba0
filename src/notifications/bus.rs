// SPDX-License-Identifier: MPL-2.0
//! Snapshot fan-out to renderers.
//!
//! Listeners are called synchronously, in registration order, with the
//! ordered list of active notifications after every change. The listener
//! list is copied before each fan-out, so listeners may subscribe or
//! unsubscribe (themselves or others) while being called.
//!
//! Every snapshot carries a revision. A listener is never handed a snapshot
//! older than one it has already received, so when a listener changes the
//! notifications during fan-out, the listeners after it end on the newer
//! state instead of the one being delivered when the change happened.

use super::notification::Notification;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback receiving the current ordered snapshot.
pub type Listener<C> = Arc<dyn Fn(&[Notification<C>]) + Send + Sync>;

/// Registry of snapshot listeners.
pub struct SubscriptionBus<C> {
    inner: Arc<BusInner<C>>,
}

struct Entry<C> {
    id: u64,
    listener: Listener<C>,
    /// Revision of the newest snapshot handed to this listener.
    delivered: Arc<AtomicU64>,
}

struct BusInner<C> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Entry<C>>>,
}

impl<C> BusInner<C> {
    fn listeners(&self) -> MutexGuard<'_, Vec<Entry<C>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a listener by id; implemented by the bus so that subscriptions
/// do not need to carry the content type.
trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64);
}

impl<C: 'static> Unsubscribe for BusInner<C> {
    fn remove(&self, id: u64) {
        self.listeners().retain(|entry| entry.id != id);
    }
}

impl<C> Default for SubscriptionBus<C> {
    fn default() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl<C: 'static> SubscriptionBus<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. It stays registered until
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Notification<C>]) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().push(Entry {
            id,
            listener: Arc::new(listener),
            delivered: Arc::new(AtomicU64::new(0)),
        });
        let registry: Arc<dyn Unsubscribe> = self.inner.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    /// Calls every listener registered at the time of the call, skipping
    /// those that already received `revision` or a newer one.
    ///
    /// Revisions must grow with every change; `0` is never delivered.
    ///
    /// # Panics
    ///
    /// Resumes the first listener panic once every other listener has been
    /// called.
    pub fn publish(&self, revision: u64, snapshot: &[Notification<C>]) {
        let targets: Vec<(Listener<C>, Arc<AtomicU64>)> = self
            .inner
            .listeners()
            .iter()
            .map(|entry| (Arc::clone(&entry.listener), Arc::clone(&entry.delivered)))
            .collect();

        let mut first_panic: Option<Box<dyn Any + Send + 'static>> = None;
        for (listener, delivered) in targets {
            if delivered.fetch_max(revision, Ordering::AcqRel) >= revision {
                tracing::trace!(revision, "listener already saw a newer snapshot");
                continue;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(snapshot))) {
                tracing::warn!(revision, "snapshot listener panicked");
                first_panic.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    /// Stops delivering snapshots to the listener.
    ///
    /// Idempotent, and safe to call after the bus has been dropped.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recording_listener(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl Fn(&[Notification<String>]) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_| log.lock().unwrap().push(name)
    }

    #[test]
    fn publish_reaches_listeners_in_registration_order() {
        let bus = SubscriptionBus::<String>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = bus.subscribe(recording_listener(&log, "a"));
        let _b = bus.subscribe(recording_listener(&log, "b"));

        bus.publish(1, &[]);

        assert_eq!(*log.lock().unwrap(), ["a", "b"]);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = SubscriptionBus::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let subscription = bus.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(1, &[]);
        subscription.unsubscribe();
        subscription.unsubscribe();
        bus.publish(2, &[]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn unsubscribing_during_fan_out_does_not_skip_others() {
        let bus = SubscriptionBus::<String>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let own_slot = Arc::clone(&slot);
        let first_log = Arc::clone(&log);
        let first = bus.subscribe(move |_| {
            first_log.lock().unwrap().push("first");
            if let Some(subscription) = own_slot.lock().unwrap().take() {
                subscription.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(first);
        let _second = bus.subscribe(recording_listener(&log, "second"));

        bus.publish(1, &[]);
        bus.publish(2, &[]);

        assert_eq!(*log.lock().unwrap(), ["first", "second", "second"]);
    }

    #[test]
    fn unsubscribe_after_bus_dropped_is_harmless() {
        let bus = SubscriptionBus::<String>::new();
        let subscription = bus.subscribe(|_| {});
        drop(bus);
        subscription.unsubscribe();
    }

    #[test]
    fn older_revision_is_not_delivered_after_newer_one() {
        let bus = SubscriptionBus::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let _subscription = bus.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(3, &[]);
        bus.publish(2, &[]);
        bus.publish(3, &[]);
        bus.publish(4, &[]);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_publish_wins_over_outer_fan_out() {
        let bus = Arc::new(SubscriptionBus::<String>::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let nested_bus = Arc::clone(&bus);
        let _first = bus.subscribe(move |_| {
            // Republish once, as a listener changing the notifications would.
            nested_bus.publish(2, &[]);
        });
        let second_log = Arc::clone(&log);
        let _second = bus.subscribe(move |snapshot| {
            second_log.lock().unwrap().push(snapshot.len());
        });

        let outer = crate::notifications::NotificationConfig::info("outer".to_string())
            .resolve(&crate::config::ManagerConfig::default())
            .unwrap_or_else(|_| panic!("valid config"));
        let record = crate::notifications::store::Record::activate(
            crate::notifications::NotificationId::next(),
            outer,
        );
        bus.publish(1, &[record.notification]);

        // Only the nested, newer snapshot reaches the second listener.
        assert_eq!(*log.lock().unwrap(), [0]);
    }

    #[test]
    fn panicking_listener_does_not_starve_others() {
        let bus = SubscriptionBus::<String>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _panicking = bus.subscribe(|_| panic!("renderer failed"));
        let _second = bus.subscribe(recording_listener(&log, "second"));

        let result = panic::catch_unwind(AssertUnwindSafe(|| bus.publish(1, &[])));

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), ["second"]);
    }
}
