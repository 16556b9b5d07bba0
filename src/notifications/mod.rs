// SPDX-License-Identifier: MPL-2.0
//! Toast notification lifecycle.
//!
//! This module keeps track of transient, non-blocking notifications: it
//! opens them, coalesces repeated ones by key, dismisses them when their
//! timer runs out and tells renderers what to draw.
//!
//! # Components
//!
//! - [`notification`] - Identifiers, kinds, the `NotificationConfig` builder and
//!   the read-only `Notification` view
//! - [`scheduler`] - `TimerScheduler` for cancelable delayed callbacks
//! - `store` - Ordered storage of the active records
//! - [`manager`] - `NotificationManager` implementing open/close/destroy/update
//! - [`bus`] - `SubscriptionBus` fanning snapshots out to renderers
//!
//! # Usage
//!
//! ```no_run
//! use toast_manager::config::ManagerConfig;
//! use toast_manager::notifications::{NotificationConfig, NotificationManager};
//! use std::time::Duration;
//!
//! # async fn run() -> toast_manager::Result<()> {
//! let manager: NotificationManager<String> = NotificationManager::new(ManagerConfig::default())?;
//!
//! // Repaint whenever the set of toasts changes
//! let subscription = manager.subscribe(|toasts| {
//!     for toast in toasts {
//!         println!("{}: {}", toast.id(), toast.content());
//!     }
//! });
//!
//! // Repeated saves update a single toast instead of stacking
//! let id = manager.open(
//!     NotificationConfig::success("Saved")
//!         .with_key("save-status")
//!         .with_duration(Duration::from_secs(2)),
//! )?;
//!
//! // The renderer's close button routes back here
//! manager.close(id);
//! subscription.unsubscribe();
//! # Ok(())
//! # }
//! ```
//!
//! # Lifecycle
//!
//! `Pending -> Active -> Closing -> Removed`. Closing cancels the timer, runs
//! `on_close`, removes the record, publishes a snapshot and finally runs
//! `after_close`.

pub mod bus;
pub mod manager;
pub mod notification;
pub mod scheduler;
mod store;

pub use bus::{Listener, Subscription, SubscriptionBus};
pub use manager::NotificationManager;
pub use notification::{
    Hook, Icon, Kind, Notification, NotificationConfig, NotificationId, NotificationKey, Status,
    Variant,
};
pub use scheduler::{TimerHandle, TimerScheduler};
