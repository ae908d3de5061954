//! Events delivered to subscribers and client listeners

use serde::Deserialize;
use serde::Serialize;

use super::WatchKind;
use crate::Error;
use crate::TransportError;
use crate::WatchError;

/// Type of a watched event, mirroring the server notification types plus
/// the two synthetic removal confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Connection state change, carries no path
    None,
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
    /// A data watch was removed
    DataWatchRemoved,
    /// A child watch was removed
    ChildWatchRemoved,
}

impl EventType {
    /// Kinds of watches fired (and consumed) by a server notification
    pub fn triggered_kinds(self) -> &'static [WatchKind] {
        match self {
            EventType::NodeCreated | EventType::NodeDataChanged => &[WatchKind::Data],
            EventType::NodeChildrenChanged => &[WatchKind::Children],
            EventType::NodeDeleted => &[WatchKind::Data, WatchKind::Children],
            EventType::None | EventType::DataWatchRemoved | EventType::ChildWatchRemoved => &[],
        }
    }

    pub fn is_watch_removed(self) -> bool {
        matches!(self, EventType::DataWatchRemoved | EventType::ChildWatchRemoved)
    }
}

/// Connection state attached to every watched event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeeperState {
    SyncConnected,
    Disconnected,
    Expired,
}

/// Notification handed to watchers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub event_type: EventType,
    pub state: KeeperState,
    /// `None` for connection state events
    pub path: Option<String>,
}

impl WatchedEvent {
    /// Server notification for a node change on a live session
    pub fn new(
        event_type: EventType,
        path: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            state: KeeperState::SyncConnected,
            path: Some(path.into()),
        }
    }

    /// Connection state change
    pub fn state_change(state: KeeperState) -> Self {
        Self {
            event_type: EventType::None,
            state,
            path: None,
        }
    }

    pub(crate) fn watch_removed(
        path: &str,
        kind: WatchKind,
        state: KeeperState,
    ) -> Self {
        Self {
            event_type: kind.removed_event_type().unwrap_or(EventType::DataWatchRemoved),
            state,
            path: Some(path.to_string()),
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// Category of a [`ClientEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// A watch notification routed through the default listener
    Watched,
    /// Completion of a background watch removal
    RemoveWatches,
}

/// Outcome code carried by completion events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    NoWatcher,
    InvalidArgument,
    ConnectionLoss,
    SessionExpired,
    OperationTimeout,
    Closed,
    SystemError,
}

impl From<&Error> for ResultCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::Watch(WatchError::NoWatcher { .. }) => ResultCode::NoWatcher,
            Error::Watch(WatchError::InvalidArgument(_)) => ResultCode::InvalidArgument,
            Error::Transport(TransportError::ConnectionLoss) => ResultCode::ConnectionLoss,
            Error::Transport(TransportError::SessionExpired) => ResultCode::SessionExpired,
            Error::Transport(TransportError::Timeout(_)) => ResultCode::OperationTimeout,
            Error::Transport(TransportError::Closed) => ResultCode::Closed,
            Error::Transport(TransportError::ServerError { .. }) | Error::Config(_) | Error::Fatal(_) => {
                ResultCode::SystemError
            }
        }
    }
}

impl<T> From<&crate::Result<T>> for ResultCode {
    fn from(result: &crate::Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(e) => e.into(),
        }
    }
}

/// Event delivered to client listeners and background callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEvent {
    pub category: EventCategory,
    pub path: Option<String>,
    pub watch_kind: Option<WatchKind>,
    /// Present for [`EventCategory::Watched`]
    pub watched_event: Option<WatchedEvent>,
    /// True when the event confirms a removal the client asked for
    pub removal_confirmed: bool,
    pub result_code: ResultCode,
}

impl ClientEvent {
    pub(crate) fn watched(
        event: WatchedEvent,
        watch_kind: Option<WatchKind>,
    ) -> Self {
        let removal_confirmed =
            event.event_type.is_watch_removed() && event.state == KeeperState::SyncConnected;
        Self {
            category: EventCategory::Watched,
            path: event.path.clone(),
            watch_kind,
            watched_event: Some(event),
            removal_confirmed,
            result_code: ResultCode::Ok,
        }
    }

    pub(crate) fn remove_watches(
        path: &str,
        watch_kind: WatchKind,
        result_code: ResultCode,
        removal_confirmed: bool,
    ) -> Self {
        Self {
            category: EventCategory::RemoveWatches,
            path: Some(path.to_string()),
            watch_kind: Some(watch_kind),
            watched_event: None,
            removal_confirmed,
            result_code,
        }
    }

    /// Event type of the wrapped watched event, if any
    pub fn event_type(&self) -> Option<EventType> {
        self.watched_event.as_ref().map(|e| e.event_type)
    }
}
