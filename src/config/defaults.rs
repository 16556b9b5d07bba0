// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for the notification manager.
//!
//! This module serves as the single source of truth for default values
//! used across the crate. Constants are organized by category.
//!
//! # Categories
//!
//! - **Duration**: Auto-dismiss delays
//! - **Limits**: Bounds on simultaneously active notifications

// ==========================================================================
// Duration Defaults
// ==========================================================================

/// Default auto-dismiss delay for a notification (in milliseconds).
pub const DEFAULT_DURATION_MS: u64 = 4500;

/// Duration value meaning "persist until closed".
pub const PERSISTENT_DURATION_MS: i64 = 0;

// ==========================================================================
// Limit Defaults
// ==========================================================================

/// Minimum accepted value for `limits.max_count`.
pub const MIN_MAX_COUNT: usize = 1;

/// Maximum accepted value for `limits.max_count`.
pub const MAX_MAX_COUNT: usize = 256;
