// SPDX-License-Identifier: MPL-2.0
//! Notification lifecycle management.
//!
//! The [`NotificationManager`] opens, deduplicates, auto-dismisses and closes
//! notifications. It owns the store, wires timers through the
//! [`TimerScheduler`] and publishes snapshots on the [`SubscriptionBus`].
//!
//! Every user callback (hooks and listeners) runs with no internal lock held,
//! so any manager operation may be called from inside one of them. Snapshots
//! are stamped under the store lock, so a listener always ends on the newest
//! state even when a nested operation publishes during its fan-out.

use super::bus::{Subscription, SubscriptionBus};
use super::notification::{
    Hook, Notification, NotificationConfig, NotificationId, Resolved,
};
use super::scheduler::TimerScheduler;
use super::store::{Record, Store};
use crate::config::ManagerConfig;
use crate::error::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, MutexGuard, PoisonError, Weak};

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Manages the active notifications.
///
/// Cheap to clone; clones share the same store. Outstanding timers hold only
/// a weak reference, so dropping the last clone cancels them.
pub struct NotificationManager<C = String> {
    shared: Arc<Shared<C>>,
}

struct Shared<C> {
    config: ManagerConfig,
    store: std::sync::Mutex<Store<C>>,
    scheduler: TimerScheduler,
    bus: SubscriptionBus<C>,
}

impl<C> Drop for Shared<C> {
    fn drop(&mut self) {
        let store = self.store.get_mut().unwrap_or_else(PoisonError::into_inner);
        for mut record in store.drain() {
            if let Some(timer) = record.timer.take() {
                self.scheduler.cancel(timer);
            }
        }
    }
}

impl<C> Clone for NotificationManager<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C> NotificationManager<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Creates a manager whose timers run on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or if called outside a tokio
    /// runtime.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::with_scheduler(config, TimerScheduler::current()?)
    }

    /// Creates a manager using an existing scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn with_scheduler(config: ManagerConfig, scheduler: TimerScheduler) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                store: std::sync::Mutex::new(Store::default()),
                scheduler,
                bus: SubscriptionBus::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    fn store(&self) -> MutexGuard<'_, Store<C>> {
        self.shared
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a notification and returns its id.
    ///
    /// If the config carries a key held by an active notification, that
    /// notification is updated in place (same id, same position, countdown
    /// restarted) and its id is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) when the
    /// content is missing or the duration is negative.
    pub fn open(&self, config: NotificationConfig<C>) -> Result<NotificationId> {
        let resolved = config.resolve(&self.shared.config)?;

        let mut store = self.store();
        let existing = resolved.key.as_ref().and_then(|key| store.find_by_key(key));
        if let Some(existing) = existing {
            tracing::debug!(id = %existing, "replacing notification with matching key");
            self.replace_locked(store, existing, resolved);
            return Ok(existing);
        }

        let id = NotificationId::next();
        let mut record = Record::activate(id, resolved);
        self.arm_timer(&mut record);
        store.insert(record);
        tracing::debug!(%id, "notification opened");

        let overflow = self
            .shared
            .config
            .limits
            .max_count
            .map(|max| store.overflow(max))
            .unwrap_or_default();
        let (revision, snapshot) = store.frame();
        drop(store);

        let listener_panic = self.publish(revision, &snapshot);
        for oldest in overflow {
            tracing::debug!(id = %oldest, "closing oldest notification over max_count");
            self.close(oldest);
        }
        if let Some(payload) = listener_panic {
            panic::resume_unwind(payload);
        }
        Ok(id)
    }

    /// Replaces the content of an active notification in place.
    ///
    /// The notification keeps its id, key and position; its countdown
    /// restarts with the new duration. Returns `Ok(false)` without doing
    /// anything if `id` is not active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) when the
    /// content is missing or the duration is negative.
    pub fn update(&self, id: NotificationId, config: NotificationConfig<C>) -> Result<bool> {
        let resolved = config.resolve(&self.shared.config)?;

        let store = self.store();
        if !store.get(id).is_some_and(Record::is_active) {
            return Ok(false);
        }
        tracing::debug!(%id, "updating notification");
        self.replace_locked(store, id, resolved);
        Ok(true)
    }

    /// Closes an active notification.
    ///
    /// Does nothing if `id` is unknown, closing or already removed, which
    /// makes a user click racing the auto-dismiss timer harmless.
    ///
    /// # Panics
    ///
    /// Resumes a panic raised by a hook or a snapshot listener once the
    /// notification has been removed and both hooks have run.
    pub fn close(&self, id: NotificationId) {
        self.close_if(id, |_| true);
    }

    /// Closes one notification, or every active notification when `id` is `None`.
    ///
    /// # Panics
    ///
    /// Resumes the first hook panic once every notification has been closed.
    pub fn destroy(&self, id: Option<NotificationId>) {
        if let Some(id) = id {
            self.close(id);
            return;
        }

        let ids = self.store().active_ids();
        tracing::debug!(count = ids.len(), "destroying all notifications");
        let mut first_panic: Option<PanicPayload> = None;
        for id in ids {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.close(id))) {
                first_panic.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    /// Closes every notification, then drops whatever hooks reopened and
    /// cancels its timers.
    ///
    /// Only this manager's timers are cancelled; a scheduler shared with
    /// other managers keeps running theirs. Call on application shutdown.
    pub fn shutdown(&self) {
        self.destroy(None);
        let drained: Vec<Record<C>> = self.store().drain().collect();
        for record in drained {
            if let Some(timer) = record.timer {
                self.shared.scheduler.cancel(timer);
            }
        }
    }

    // =========================================================================
    // Kind shortcuts
    // =========================================================================

    pub fn info(&self, content: impl Into<C>) -> Result<NotificationId> {
        self.open(NotificationConfig::info(content))
    }

    pub fn success(&self, content: impl Into<C>) -> Result<NotificationId> {
        self.open(NotificationConfig::success(content))
    }

    pub fn warning(&self, content: impl Into<C>) -> Result<NotificationId> {
        self.open(NotificationConfig::warning(content))
    }

    pub fn error(&self, content: impl Into<C>) -> Result<NotificationId> {
        self.open(NotificationConfig::error(content))
    }

    /// Opens a persistent notification with a spinner icon.
    pub fn loading(&self, content: impl Into<C>) -> Result<NotificationId> {
        self.open(NotificationConfig::loading(content))
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Registers a listener called with the ordered active notifications
    /// after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Notification<C>]) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(listener)
    }

    /// Returns the active notifications in display order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification<C>> {
        self.store().snapshot()
    }

    /// Returns an active notification by id.
    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<Notification<C>> {
        self.store()
            .get(id)
            .filter(|record| record.is_active())
            .map(|record| record.notification.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store().active_len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of auto-dismiss timers still waiting to fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.shared.scheduler.pending_count()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Schedules the auto-dismiss timer of `record` for its current duration.
    fn arm_timer(&self, record: &mut Record<C>) {
        record.generation += 1;
        let id = record.notification.id;
        let generation = record.generation;
        let weak: Weak<Shared<C>> = Arc::downgrade(&self.shared);

        record.timer = self
            .shared
            .scheduler
            .schedule(record.notification.duration, move || {
                if let Some(shared) = weak.upgrade() {
                    tracing::trace!(%id, "auto-dismiss timer fired");
                    NotificationManager { shared }.close_if(id, |r| r.generation == generation);
                }
            });
    }

    /// Applies `resolved` to the active record `id`, then releases the lock
    /// and publishes.
    fn replace_locked(&self, mut store: MutexGuard<'_, Store<C>>, id: NotificationId, resolved: Resolved<C>) {
        let previous = match store.get_mut(id) {
            Some(record) => {
                let previous = record.replace(resolved);
                self.arm_timer(record);
                previous
            }
            None => return,
        };
        let (revision, snapshot) = store.frame();
        drop(store);

        if let Some(timer) = previous {
            self.shared.scheduler.cancel(timer);
        }
        self.shared.bus.publish(revision, &snapshot);
    }

    /// Publishes a frame, catching a listener panic so the caller can finish
    /// its own work first.
    fn publish(&self, revision: u64, snapshot: &[Notification<C>]) -> Option<PanicPayload> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.shared.bus.publish(revision, snapshot);
        }))
        .err()
    }

    /// Closes `id` if it is active and `accept` agrees.
    fn close_if(&self, id: NotificationId, accept: impl FnOnce(&Record<C>) -> bool) {
        let closing = {
            let mut store = self.store();
            let accepted = store
                .get(id)
                .is_some_and(|record| record.is_active() && accept(record));
            if accepted {
                store.begin_close(id)
            } else {
                None
            }
        };
        let Some(closing) = closing else {
            tracing::trace!(%id, "close ignored, notification not active");
            return;
        };

        if let Some(timer) = closing.timer {
            self.shared.scheduler.cancel(timer);
        }

        let on_close_panic = run_hook(closing.on_close, id, "on_close");

        let (revision, snapshot) = {
            let mut store = self.store();
            store.remove(id);
            store.frame()
        };
        tracing::debug!(%id, "notification closed");
        let listener_panic = self.publish(revision, &snapshot);

        let after_close_panic = run_hook(closing.after_close, id, "after_close");

        if let Some(payload) = on_close_panic.or(listener_panic).or(after_close_panic) {
            panic::resume_unwind(payload);
        }
    }
}

/// Runs a hook, catching a panic so the caller can finish teardown first.
fn run_hook(hook: Option<Hook>, id: NotificationId, name: &'static str) -> Option<PanicPayload> {
    let hook = hook?;
    match panic::catch_unwind(AssertUnwindSafe(move || hook(id))) {
        Ok(()) => None,
        Err(payload) => {
            tracing::warn!(%id, hook = name, "notification hook panicked");
            Some(payload)
        }
    }
}
