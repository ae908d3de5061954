//! Watch Management Error Hierarchy
//!
//! Errors are grouped by where they originate: watch bookkeeping, the
//! transport/session layer underneath, and configuration loading.

use std::time::Duration;

use config::ConfigError;

use crate::WatchKind;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registration and removal failures detected by the watch subsystem
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Network/session failures reported by the transport layer
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// No local or server registration matched the removal target.
    ///
    /// Suppressed when the removal was issued with `quietly()`.
    #[error("No {kind} watcher registered on {path}")]
    NoWatcher { path: String, kind: WatchKind },

    /// Malformed path or unsupported kind combination
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection to the server dropped while the request was in flight
    #[error("Connection lost")]
    ConnectionLoss,

    /// The session backing the request is gone
    #[error("Session expired")]
    SessionExpired,

    /// Request did not complete within the transport's timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The client has been closed
    #[error("Client is closed")]
    Closed,

    /// Any other server-reported failure
    #[error("Server error {code}: {message}")]
    ServerError { code: i32, message: String },
}

impl Error {
    pub(crate) fn no_watcher(
        path: impl Into<String>,
        kind: WatchKind,
    ) -> Self {
        Error::Watch(WatchError::NoWatcher {
            path: path.into(),
            kind,
        })
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::Watch(WatchError::InvalidArgument(message.into()))
    }

    /// True for the "no such watcher" outcome, the only error quiet mode suppresses
    pub fn is_no_watcher(&self) -> bool {
        matches!(self, Error::Watch(WatchError::NoWatcher { .. }))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::Watch(WatchError::InvalidArgument(_)))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
