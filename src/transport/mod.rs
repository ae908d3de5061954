//! Seam to the transport/session layer
//!
//! Connection handling, authentication, heartbeats and wire encoding live
//! behind [`WatchTransport`]. The watch subsystem only ever submits the two
//! requests defined here and reacts to [`SessionEvent`]s.

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::Result;
use crate::WatchKind;

/// Read operation that arms a watch as a side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchOperation {
    /// Existence check; arms a data watch even if the node is absent
    Exists,
    GetData,
    GetChildren,
}

impl WatchOperation {
    /// Kind of watch the operation arms
    pub fn kind(self) -> WatchKind {
        match self {
            WatchOperation::Exists | WatchOperation::GetData => WatchKind::Data,
            WatchOperation::GetChildren => WatchKind::Children,
        }
    }

    /// Operation used to re-arm a watch of `kind` on a new session
    pub(crate) fn rearm(kind: WatchKind) -> Self {
        match kind {
            WatchKind::Children => WatchOperation::GetChildren,
            WatchKind::Data | WatchKind::Any => WatchOperation::Exists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchRequest {
    /// Perform `operation` on `path` and leave a watch behind
    Register {
        path: String,
        operation: WatchOperation,
    },
    /// Drop the server-side watch of `kind` on `path`
    ///
    /// The server removes by kind only; subscriber identity is a client-side concept.
    Remove { path: String, kind: WatchKind },
}

impl WatchRequest {
    pub fn path(&self) -> &str {
        match self {
            WatchRequest::Register { path, .. } | WatchRequest::Remove { path, .. } => path,
        }
    }

    pub fn kind(&self) -> WatchKind {
        match self {
            WatchRequest::Register { operation, .. } => operation.kind(),
            WatchRequest::Remove { kind, .. } => *kind,
        }
    }
}

/// Server answer for a [`WatchRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchResponse {
    Exists(bool),
    Data(Bytes),
    Children(Vec<String>),
    Removed,
}

/// Session lifecycle as reported by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// Connection dropped; the session may still be alive on the server
    Disconnected,
    /// Connection re-established on the same session; server watches are intact
    Reconnected,
    /// The old session is gone together with every server-side watch
    Expired,
}

/// Request submission into the transport layer
///
/// Implementations own timeouts and retries for individual requests. A
/// server-side "no such watch" answer to [`WatchRequest::Remove`] must be
/// reported as [`WatchError::NoWatcher`](crate::WatchError::NoWatcher).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchTransport: Send + Sync + 'static {
    async fn submit(
        &self,
        request: WatchRequest,
    ) -> Result<WatchResponse>;
}
