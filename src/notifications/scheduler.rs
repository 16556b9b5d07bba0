// SPDX-License-Identifier: MPL-2.0
//! Delayed callbacks on top of tokio timers.
//!
//! Each scheduled callback runs in its own task that sleeps for the requested
//! delay. Canceling a timer both aborts the task and removes it from the
//! pending table, and a task only runs its callback after winning the removal
//! itself, so a canceled callback never runs even if its sleep already elapsed.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a scheduled callback.
///
/// Handles cannot be built outside this crate and remember which scheduler
/// issued them; a scheduler ignores handles it did not issue.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    scheduler: u64,
    timer: u64,
}

/// Schedules and cancels delayed callbacks on a tokio runtime.
///
/// Cheap to clone; clones share the same pending table.
#[derive(Clone, Debug)]
pub struct TimerScheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Debug)]
struct SchedulerInner {
    id: u64,
    runtime: Handle,
    next_timer: AtomicU64,
    pending: Mutex<HashMap<u64, AbortHandle>>,
}

impl SchedulerInner {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in pending.drain() {
            task.abort();
        }
    }
}

impl TimerScheduler {
    /// Creates a scheduler that spawns its timers on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
                runtime,
                next_timer: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a scheduler bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| Error::NoRuntime)
    }

    /// Runs `callback` once `delay` has elapsed.
    ///
    /// A zero delay never creates a timer and returns `None`; the callback is
    /// dropped without running.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> Option<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if delay.is_zero() {
            return None;
        }

        let timer = self.inner.next_timer.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);

        // Hold the table while spawning so the task cannot look itself up
        // before it has been registered.
        let mut pending = self.inner.pending();
        let task = self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let still_pending = inner.pending().remove(&timer).is_some();
            drop(inner);
            if still_pending {
                tracing::trace!(timer, "timer fired");
                callback();
            }
        });
        pending.insert(timer, task.abort_handle());
        tracing::trace!(timer, delay_ms = delay.as_millis() as u64, "timer scheduled");

        Some(TimerHandle {
            scheduler: self.inner.id,
            timer,
        })
    }

    /// Cancels a pending timer.
    ///
    /// Idempotent: canceling a timer that already fired or was already
    /// canceled does nothing.
    pub fn cancel(&self, handle: TimerHandle) {
        if handle.scheduler != self.inner.id {
            tracing::warn!(
                timer = handle.timer,
                issuer = handle.scheduler,
                scheduler = self.inner.id,
                "ignoring timer handle issued by another scheduler"
            );
            return;
        }
        if let Some(task) = self.inner.pending().remove(&handle.timer) {
            task.abort();
            tracing::trace!(timer = handle.timer, "timer canceled");
        }
    }

    /// Cancels every pending timer of this scheduler.
    pub fn cancel_all(&self) {
        let drained: Vec<AbortHandle> = self.inner.pending().drain().map(|(_, task)| task).collect();
        for task in drained {
            task.abort();
        }
    }

    /// Returns the number of timers that have neither fired nor been canceled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn current_fails_outside_runtime() {
        assert_eq!(TimerScheduler::current().unwrap_err(), Error::NoRuntime);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_never_creates_a_timer() {
        let scheduler = TimerScheduler::current().expect("runtime");
        let (count, callback) = counter();

        assert!(scheduler.schedule(Duration::ZERO, callback).is_none());
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_runs_after_delay() {
        let scheduler = TimerScheduler::current().expect("runtime");
        let (count, callback) = counter();

        let handle = scheduler.schedule(Duration::from_millis(100), callback);
        assert!(handle.is_some());
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(51)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_callback_never_runs() {
        let scheduler = TimerScheduler::current().expect("runtime");
        let (count, callback) = counter();

        let handle = scheduler
            .schedule(Duration::from_millis(100), callback)
            .expect("timer");
        scheduler.cancel(handle);
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_a_no_op() {
        let scheduler = TimerScheduler::current().expect("runtime");
        let (count, callback) = counter();

        let handle = scheduler
            .schedule(Duration::from_millis(10), callback)
            .expect("timer");
        tokio::time::sleep(Duration::from_millis(20)).await;
        scheduler.cancel(handle);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_handle_is_ignored() {
        let first = TimerScheduler::current().expect("runtime");
        let second = TimerScheduler::current().expect("runtime");
        let (count, callback) = counter();

        let handle = first
            .schedule(Duration::from_millis(10), callback)
            .expect("timer");
        second.cancel(handle);
        assert_eq!(first.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_pending_timers() {
        let scheduler = TimerScheduler::current().expect("runtime");
        let (count, _) = counter();
        for delay in [10, 20, 30] {
            let count = Arc::clone(&count);
            let _ = scheduler.schedule(Duration::from_millis(delay), move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(scheduler.pending_count(), 3);

        scheduler.cancel_all();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
