// SPDX-License-Identifier: MPL-2.0
//! Core notification data structures.
//!
//! This module defines the identifiers, the presentation enums, the
//! [`NotificationConfig`] builder callers hand to the manager, and the
//! read-only [`Notification`] view that renderers receive in snapshots.

use crate::config::{defaults, ManagerConfig};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Unique identifier for a notification.
///
/// Identifiers come from a process-wide counter and are never reused, so a
/// stale id held by a renderer can never resolve to an unrelated notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Allocates the next unique notification ID.
    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Caller-supplied deduplication token.
///
/// Opening a notification whose key matches an active one updates that
/// notification in place instead of stacking a second toast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey(String);

impl NotificationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NotificationKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for NotificationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic category. Only the renderer cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Kind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Presentation density hint, passed through to the renderer untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    Default,
    Compact,
}

/// Opaque icon token resolved by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Icon(String);

impl Icon {
    /// Name of the icon preset by [`NotificationConfig::loading`].
    pub const SPINNER: &'static str = "spinner";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The busy indicator used by loading notifications.
    #[must_use]
    pub fn spinner() -> Self {
        Self::new(Self::SPINNER)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a notification.
///
/// `Pending` only exists while a config is being validated; records enter the
/// store already `Active`. `Removed` is observed solely by `after_close`
/// hooks, after the record has left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Active,
    Closing,
    Removed,
}

/// Teardown callback, invoked at most once with the id of the closed notification.
pub type Hook = Box<dyn FnOnce(NotificationId) + Send + 'static>;

// =============================================================================
// NotificationConfig
// =============================================================================

/// Everything a caller can specify when opening a notification.
///
/// Unset fields fall back to the manager's [`ManagerConfig`] defaults.
///
/// ```
/// use toast_manager::notifications::{Kind, NotificationConfig};
/// use std::time::Duration;
///
/// let config = NotificationConfig::<String>::success("Saved")
///     .with_key("save-status")
///     .with_duration(Duration::from_secs(2));
/// assert_eq!(config.kind(), Kind::Success);
/// ```
pub struct NotificationConfig<C> {
    content: Option<C>,
    kind: Kind,
    variant: Option<Variant>,
    icon: Option<Icon>,
    duration_ms: Option<i64>,
    key: Option<NotificationKey>,
    on_close: Option<Hook>,
    after_close: Option<Hook>,
}

impl<C> Default for NotificationConfig<C> {
    fn default() -> Self {
        Self {
            content: None,
            kind: Kind::default(),
            variant: None,
            icon: None,
            duration_ms: None,
            key: None,
            on_close: None,
            after_close: None,
        }
    }
}

impl<C> NotificationConfig<C> {
    /// Creates a config with the given kind and content.
    pub fn new(kind: Kind, content: impl Into<C>) -> Self {
        Self {
            content: Some(content.into()),
            kind,
            ..Self::default()
        }
    }

    pub fn info(content: impl Into<C>) -> Self {
        Self::new(Kind::Info, content)
    }

    pub fn success(content: impl Into<C>) -> Self {
        Self::new(Kind::Success, content)
    }

    pub fn warning(content: impl Into<C>) -> Self {
        Self::new(Kind::Warning, content)
    }

    pub fn error(content: impl Into<C>) -> Self {
        Self::new(Kind::Error, content)
    }

    /// Creates a loading notification: persistent, with a spinner icon.
    pub fn loading(content: impl Into<C>) -> Self {
        Self::new(Kind::Info, content)
            .persistent()
            .with_icon(Icon::spinner())
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<C>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Sets the deduplication key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<NotificationKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the auto-dismiss delay. `Duration::ZERO` keeps the notification
    /// until it is closed explicitly.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        self
    }

    /// Sets the auto-dismiss delay in raw milliseconds.
    ///
    /// Negative values are rejected when the notification is opened.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Keeps the notification until it is closed explicitly.
    #[must_use]
    pub fn persistent(self) -> Self {
        self.with_duration_ms(defaults::PERSISTENT_DURATION_MS)
    }

    /// Registers a hook that runs before the notification leaves the store.
    #[must_use]
    pub fn on_close(mut self, hook: impl FnOnce(NotificationId) + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Registers a hook that runs after the notification has left the store.
    #[must_use]
    pub fn after_close(mut self, hook: impl FnOnce(NotificationId) + Send + 'static) -> Self {
        self.after_close = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn key(&self) -> Option<&NotificationKey> {
        self.key.as_ref()
    }

    /// Validates the config and fills unset fields from the manager defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the content is missing or the
    /// duration is negative.
    pub(crate) fn resolve(self, defaults: &ManagerConfig) -> Result<Resolved<C>> {
        let content = self
            .content
            .ok_or_else(|| Error::invalid_config("notification content is required"))?;

        let duration = match self.duration_ms {
            Some(ms) if ms < 0 => {
                return Err(Error::invalid_config(format!(
                    "duration_ms must not be negative (got {ms})"
                )));
            }
            Some(ms) => Duration::from_millis(ms.unsigned_abs()),
            None => defaults.default_duration(),
        };

        Ok(Resolved {
            content,
            kind: self.kind,
            variant: self.variant.unwrap_or(defaults.defaults.variant),
            icon: self.icon,
            duration,
            key: self.key,
            on_close: self.on_close,
            after_close: self.after_close,
        })
    }
}

impl<C: fmt::Debug> fmt::Debug for NotificationConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("content", &self.content)
            .field("kind", &self.kind)
            .field("variant", &self.variant)
            .field("icon", &self.icon)
            .field("duration_ms", &self.duration_ms)
            .field("key", &self.key)
            .field("on_close", &self.on_close.is_some())
            .field("after_close", &self.after_close.is_some())
            .finish()
    }
}

/// A validated config with every default applied.
pub(crate) struct Resolved<C> {
    pub(crate) content: C,
    pub(crate) kind: Kind,
    pub(crate) variant: Variant,
    pub(crate) icon: Option<Icon>,
    pub(crate) duration: Duration,
    pub(crate) key: Option<NotificationKey>,
    pub(crate) on_close: Option<Hook>,
    pub(crate) after_close: Option<Hook>,
}

// =============================================================================
// Notification (read-only view)
// =============================================================================

/// A notification as seen by renderers and subscribers.
#[derive(Debug, Clone)]
pub struct Notification<C> {
    pub(crate) id: NotificationId,
    pub(crate) key: Option<NotificationKey>,
    pub(crate) kind: Kind,
    pub(crate) variant: Variant,
    pub(crate) content: C,
    pub(crate) icon: Option<Icon>,
    pub(crate) duration: Duration,
    pub(crate) status: Status,
    pub(crate) created_at: DateTime<Utc>,
    /// Start of the current countdown; reset on in-place replacement.
    pub(crate) activated_at: Instant,
}

impl<C> Notification<C> {
    #[must_use]
    pub fn id(&self) -> NotificationId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> Option<&NotificationKey> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub fn content(&self) -> &C {
        &self.content
    }

    #[must_use]
    pub fn icon(&self) -> Option<&Icon> {
        self.icon.as_ref()
    }

    /// Returns the auto-dismiss delay, `Duration::ZERO` for persistent notifications.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns when this notification was first opened (wall clock).
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.duration.is_zero()
    }

    /// Returns the time left before auto-dismiss, or `None` if persistent.
    ///
    /// Useful for renderers drawing a countdown bar.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        if self.is_persistent() {
            return None;
        }
        Some(self.duration.saturating_sub(self.activated_at.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_ids_are_unique() {
        let first = NotificationId::next();
        let second = NotificationId::next();
        assert_ne!(first, second);
        assert!(second.value() > first.value());
    }

    #[test]
    fn notification_id_displays_with_prefix() {
        let id = NotificationId(7);
        assert_eq!(id.to_string(), "n7");
    }

    #[test]
    fn notification_constructors_set_correct_kind() {
        assert_eq!(NotificationConfig::<String>::info("").kind(), Kind::Info);
        assert_eq!(
            NotificationConfig::<String>::success("").kind(),
            Kind::Success
        );
        assert_eq!(
            NotificationConfig::<String>::warning("").kind(),
            Kind::Warning
        );
        assert_eq!(NotificationConfig::<String>::error("").kind(), Kind::Error);
    }

    #[test]
    fn resolve_applies_manager_defaults() {
        let defaults = ManagerConfig::default();
        let resolved = NotificationConfig::<String>::success("saved")
            .resolve(&defaults)
            .expect("valid config");

        assert_eq!(resolved.duration, defaults.default_duration());
        assert_eq!(resolved.variant, Variant::Default);
        assert!(resolved.key.is_none());
    }

    #[test]
    fn resolve_rejects_missing_content() {
        let err = NotificationConfig::<String>::default()
            .resolve(&ManagerConfig::default())
            .err()
            .expect("missing content must fail");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn resolve_rejects_negative_duration() {
        let err = NotificationConfig::<String>::info("x")
            .with_duration_ms(-1)
            .resolve(&ManagerConfig::default())
            .err()
            .expect("negative duration must fail");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn loading_is_persistent_with_spinner() {
        let resolved = NotificationConfig::<String>::loading("Uploading")
            .resolve(&ManagerConfig::default())
            .expect("valid config");

        assert!(resolved.duration.is_zero());
        assert_eq!(resolved.icon, Some(Icon::spinner()));
    }

    #[test]
    fn explicit_variant_overrides_default() {
        let resolved = NotificationConfig::<String>::info("x")
            .with_variant(Variant::Compact)
            .resolve(&ManagerConfig::default())
            .expect("valid config");
        assert_eq!(resolved.variant, Variant::Compact);
    }

    #[test]
    fn builder_pattern_sets_key_and_duration() {
        let resolved = NotificationConfig::<String>::error("boom")
            .with_key("upload")
            .with_duration(Duration::from_millis(1500))
            .resolve(&ManagerConfig::default())
            .expect("valid config");

        assert_eq!(resolved.key, Some(NotificationKey::from("upload")));
        assert_eq!(resolved.duration, Duration::from_millis(1500));
        assert_eq!(resolved.kind, Kind::Error);
    }

    #[test]
    fn persistent_overrides_earlier_duration() {
        let resolved = NotificationConfig::<String>::info("x")
            .with_duration(Duration::from_secs(3))
            .persistent()
            .resolve(&ManagerConfig::default())
            .expect("valid config");

        assert!(resolved.duration.is_zero());
    }

    #[test]
    fn default_variant_applies_to_any_config_without_one() {
        let mut config = ManagerConfig::default();
        config.defaults.variant = Variant::Compact;

        let resolved = NotificationConfig::<String>::default()
            .with_content("plain")
            .resolve(&config)
            .expect("valid config");

        assert_eq!(resolved.variant, Variant::Compact);
    }
}
