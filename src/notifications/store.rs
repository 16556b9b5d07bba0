// SPDX-License-Identifier: MPL-2.0
//! Ordered storage of notification records.
//!
//! Insertion order is display order. The key index only ever points at
//! active records: a record gives up its key as soon as it starts closing.

use super::notification::{
    Hook, Notification, NotificationId, NotificationKey, Resolved, Status,
};
use super::scheduler::TimerHandle;
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

/// A stored notification together with the state only the manager may touch.
pub(crate) struct Record<C> {
    pub(crate) notification: Notification<C>,
    /// Set only while active with a non-zero duration.
    pub(crate) timer: Option<TimerHandle>,
    /// Bumped on every (re)arm so that a late timer can tell it is stale.
    pub(crate) generation: u64,
    pub(crate) on_close: Option<Hook>,
    pub(crate) after_close: Option<Hook>,
}

impl<C> Record<C> {
    /// Builds an active record from a validated config.
    pub(crate) fn activate(id: NotificationId, resolved: Resolved<C>) -> Self {
        Self {
            notification: Notification {
                id,
                key: resolved.key,
                kind: resolved.kind,
                variant: resolved.variant,
                content: resolved.content,
                icon: resolved.icon,
                duration: resolved.duration,
                status: Status::Active,
                created_at: chrono::Utc::now(),
                activated_at: Instant::now(),
            },
            timer: None,
            generation: 0,
            on_close: resolved.on_close,
            after_close: resolved.after_close,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.notification.status == Status::Active
    }

    /// Replaces everything but the id, key and creation time, restarting the
    /// countdown. Returns the previous timer so the caller can cancel it.
    pub(crate) fn replace(&mut self, resolved: Resolved<C>) -> Option<TimerHandle> {
        let notification = &mut self.notification;
        notification.kind = resolved.kind;
        notification.variant = resolved.variant;
        notification.content = resolved.content;
        notification.icon = resolved.icon;
        notification.duration = resolved.duration;
        notification.activated_at = Instant::now();
        self.on_close = resolved.on_close;
        self.after_close = resolved.after_close;
        self.timer.take()
    }
}

/// What the manager needs to finish closing a record outside the store lock.
pub(crate) struct Closing {
    pub(crate) timer: Option<TimerHandle>,
    pub(crate) on_close: Option<Hook>,
    pub(crate) after_close: Option<Hook>,
}

/// Ordered collection of notification records.
pub(crate) struct Store<C> {
    records: VecDeque<Record<C>>,
    keys: HashMap<NotificationKey, NotificationId>,
    /// Stamp of the last published frame.
    revision: u64,
}

impl<C> Default for Store<C> {
    fn default() -> Self {
        Self {
            records: VecDeque::new(),
            keys: HashMap::new(),
            revision: 0,
        }
    }
}

impl<C> Store<C> {
    fn position(&self, id: NotificationId) -> Option<usize> {
        self.records.iter().position(|r| r.notification.id == id)
    }

    /// Appends a record at the end of display order.
    pub(crate) fn insert(&mut self, record: Record<C>) {
        if let Some(key) = &record.notification.key {
            let previous = self.keys.insert(key.clone(), record.notification.id);
            debug_assert!(previous.is_none(), "duplicate active key {key}");
        }
        self.records.push_back(record);
    }

    pub(crate) fn get(&self, id: NotificationId) -> Option<&Record<C>> {
        self.records.iter().find(|r| r.notification.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: NotificationId) -> Option<&mut Record<C>> {
        self.records.iter_mut().find(|r| r.notification.id == id)
    }

    /// Returns the active record holding `key`, if any.
    pub(crate) fn find_by_key(&self, key: &NotificationKey) -> Option<NotificationId> {
        self.keys.get(key).copied()
    }

    /// Moves an active record to `Closing`, releasing its key and handing
    /// back its timer and hooks. Returns `None` if the record is not active.
    pub(crate) fn begin_close(&mut self, id: NotificationId) -> Option<Closing> {
        let record = self.records.iter_mut().find(|r| r.notification.id == id)?;
        if !record.is_active() {
            return None;
        }
        record.notification.status = Status::Closing;
        if let Some(key) = &record.notification.key {
            if self.keys.get(key) == Some(&id) {
                self.keys.remove(key);
            }
        }
        Some(Closing {
            timer: record.timer.take(),
            on_close: record.on_close.take(),
            after_close: record.after_close.take(),
        })
    }

    /// Deletes a record from the store.
    pub(crate) fn remove(&mut self, id: NotificationId) -> Option<Record<C>> {
        let index = self.position(id)?;
        let mut record = self.records.remove(index)?;
        if let Some(key) = &record.notification.key {
            if self.keys.get(key) == Some(&id) {
                self.keys.remove(key);
            }
        }
        record.notification.status = Status::Removed;
        Some(record)
    }

    /// Removes every record, leaving the store empty.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Record<C>> + '_ {
        self.keys.clear();
        self.records.drain(..)
    }

    /// Ids of active records in display order.
    pub(crate) fn active_ids(&self) -> Vec<NotificationId> {
        self.records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.notification.id)
            .collect()
    }

    /// Ids of the oldest active records beyond `max`, oldest first.
    pub(crate) fn overflow(&self, max: usize) -> Vec<NotificationId> {
        let active = self.active_ids();
        let excess = active.len().saturating_sub(max);
        active.into_iter().take(excess).collect()
    }

    pub(crate) fn active_len(&self) -> usize {
        self.records.iter().filter(|r| r.is_active()).count()
    }
}

impl<C: Clone> Store<C> {
    /// Ordered copy of the active notifications.
    pub(crate) fn snapshot(&self) -> Vec<Notification<C>> {
        self.records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.notification.clone())
            .collect()
    }

    /// Snapshot to publish, stamped with a revision newer than any frame
    /// taken before it.
    pub(crate) fn frame(&mut self) -> (u64, Vec<Notification<C>>) {
        self.revision += 1;
        (self.revision, self.snapshot())
    }
}
