// SPDX-License-Identifier: MPL-2.0
//! Error types shared by the notification manager and its configuration layer.
//!
//! Lifecycle races (closing an id that is already gone, a timer firing after a
//! user click) are not errors and never surface here. Only programmer errors
//! and I/O around the configuration file do.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A notification or manager configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The timer scheduler was created outside of a tokio runtime.
    #[error("No tokio runtime available to drive notification timers")]
    NoRuntime,

    #[error("I/O Error: {0}")]
    Io(String),

    /// The configuration file could not be parsed.
    #[error("Config Error: {0}")]
    ConfigParse(String),

    /// The configuration could not be serialized back to TOML.
    #[error("Config Error: {0}")]
    ConfigSerialize(String),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidConfig`].
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig(reason.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::ConfigSerialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
