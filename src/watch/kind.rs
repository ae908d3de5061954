use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::EventType;

/// Which change notification a watch is armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchKind {
    /// Data watch, armed by `exists` and `get_data`
    Data,
    /// Child watch, armed by `get_children`
    Children,
    /// Selector matching either kind. Only valid when removing watches.
    Any,
}

impl WatchKind {
    /// Concrete kinds covered by this selector
    pub fn concrete_kinds(self) -> &'static [WatchKind] {
        match self {
            WatchKind::Data => &[WatchKind::Data],
            WatchKind::Children => &[WatchKind::Children],
            WatchKind::Any => &[WatchKind::Data, WatchKind::Children],
        }
    }

    pub fn is_concrete(self) -> bool {
        self != WatchKind::Any
    }

    /// Event type synthesized when a watch of this kind is removed
    pub fn removed_event_type(self) -> Option<EventType> {
        match self {
            WatchKind::Data => Some(EventType::DataWatchRemoved),
            WatchKind::Children => Some(EventType::ChildWatchRemoved),
            WatchKind::Any => None,
        }
    }

    pub(crate) fn as_label(self) -> &'static str {
        match self {
            WatchKind::Data => "data",
            WatchKind::Children => "children",
            WatchKind::Any => "any",
        }
    }
}

impl fmt::Display for WatchKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
