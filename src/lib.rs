// SPDX-License-Identifier: MPL-2.0
//! `toast_manager` keeps track of transient toast notifications.
//!
//! It opens notifications, coalesces repeated ones by key, dismisses them on
//! a timer and publishes ordered snapshots to whatever renders them. Painting
//! is left to the caller.

#![doc(html_root_url = "https://docs.rs/toast_manager/0.1.0")]

pub mod config;
pub mod error;
pub mod notifications;

pub use error::{Error, Result};
