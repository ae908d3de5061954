//! Client-side watch registry
//!
//! Source of truth for "do we believe a watch is registered locally".
//! A single mutex guards the whole map so that a fire-once removal and an
//! explicit removal for the same entry can never both observe it.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use super::EventType;
use super::Subscriber;
use super::WatchKind;
use crate::Error;
use crate::Result;

/// One live registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub path: String,
    pub kind: WatchKind,
    pub subscriber: Subscriber,
}

/// Which subscribers a removal selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalTarget {
    /// Exactly this subscriber
    Subscriber(Subscriber),
    /// Every subscriber of the selected kind(s)
    AllOfKind,
}

impl RemovalTarget {
    fn selects(
        &self,
        subscriber: &Subscriber,
    ) -> bool {
        match self {
            RemovalTarget::Subscriber(target) => target == subscriber,
            RemovalTarget::AllOfKind => true,
        }
    }
}

type KindMap = HashMap<WatchKind, Vec<Subscriber>>;

#[derive(Debug, Default)]
pub struct WatchRegistry {
    watches: Mutex<HashMap<String, KindMap>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a registration. Only concrete kinds can be registered.
    ///
    /// Returns `false` when the exact triple was already present.
    pub fn register(
        &self,
        path: &str,
        kind: WatchKind,
        subscriber: Subscriber,
    ) -> Result<bool> {
        if !kind.is_concrete() {
            return Err(Error::invalid_argument(format!(
                "cannot register a watch of kind {kind} on {path}"
            )));
        }

        let mut watches = self.watches.lock();
        let subscribers = watches.entry(path.to_string()).or_default().entry(kind).or_default();
        if subscribers.contains(&subscriber) {
            trace!(path, %kind, ?subscriber, "Watch already registered");
            return Ok(false);
        }
        trace!(path, %kind, ?subscriber, "Watch registered");
        subscribers.push(subscriber);
        Ok(true)
    }

    /// Remove every entry at `path` whose kind is selected by `kind` and whose
    /// subscriber is selected by `target`. An empty result means nothing matched.
    pub fn unregister(
        &self,
        path: &str,
        kind: WatchKind,
        target: &RemovalTarget,
    ) -> Vec<WatchEntry> {
        let mut watches = self.watches.lock();
        let Some(kinds) = watches.get_mut(path) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        for &concrete in kind.concrete_kinds() {
            if let Some(subscribers) = kinds.get_mut(&concrete) {
                subscribers.retain(|s| {
                    if target.selects(s) {
                        removed.push(WatchEntry {
                            path: path.to_string(),
                            kind: concrete,
                            subscriber: s.clone(),
                        });
                        false
                    } else {
                        true
                    }
                });
                if subscribers.is_empty() {
                    kinds.remove(&concrete);
                }
            }
        }
        if kinds.is_empty() {
            watches.remove(path);
        }

        trace!(path, %kind, removal_target = ?target, removed = removed.len(), "Watches unregistered");
        removed
    }

    /// Atomically remove and return the entries fired by a server notification
    pub fn take_triggered(
        &self,
        path: &str,
        event_type: EventType,
    ) -> Vec<WatchEntry> {
        let mut watches = self.watches.lock();
        let Some(kinds) = watches.get_mut(path) else {
            return Vec::new();
        };

        let mut fired = Vec::new();
        for &kind in event_type.triggered_kinds() {
            if let Some(subscribers) = kinds.remove(&kind) {
                fired.extend(subscribers.into_iter().map(|subscriber| WatchEntry {
                    path: path.to_string(),
                    kind,
                    subscriber,
                }));
            }
        }
        if kinds.is_empty() {
            watches.remove(path);
        }
        fired
    }

    /// Whether `subscriber` holds a watch at `path` of a kind selected by `kind`
    pub fn contains(
        &self,
        path: &str,
        kind: WatchKind,
        subscriber: &Subscriber,
    ) -> bool {
        let watches = self.watches.lock();
        watches.get(path).is_some_and(|kinds| {
            kind.concrete_kinds()
                .iter()
                .any(|k| kinds.get(k).is_some_and(|subs| subs.contains(subscriber)))
        })
    }

    /// Concrete kinds, selected by `kind`, for which `target` holds at least one watch at `path`
    pub fn registered_kinds(
        &self,
        path: &str,
        kind: WatchKind,
        target: &RemovalTarget,
    ) -> Vec<WatchKind> {
        let watches = self.watches.lock();
        let Some(kinds) = watches.get(path) else {
            return Vec::new();
        };
        kind.concrete_kinds()
            .iter()
            .copied()
            .filter(|k| kinds.get(k).is_some_and(|subs| subs.iter().any(|s| target.selects(s))))
            .collect()
    }

    /// Concrete kinds, selected by `kind`, under which `subscriber` is registered
    /// at `path`. Each kind is paired with whether `subscriber` is its only subscriber.
    pub fn subscriber_kinds(
        &self,
        path: &str,
        kind: WatchKind,
        subscriber: &Subscriber,
    ) -> Vec<(WatchKind, bool)> {
        let watches = self.watches.lock();
        let Some(kinds) = watches.get(path) else {
            return Vec::new();
        };
        kind.concrete_kinds()
            .iter()
            .filter_map(|k| {
                let subs = kinds.get(k)?;
                subs.contains(subscriber).then(|| (*k, subs.len() == 1))
            })
            .collect()
    }

    /// Read-only view of the registry, optionally limited to one path
    pub fn snapshot(
        &self,
        path: Option<&str>,
    ) -> Vec<WatchEntry> {
        let watches = self.watches.lock();
        let mut entries: Vec<WatchEntry> = watches
            .iter()
            .filter(|(p, _)| path.map_or(true, |wanted| wanted == p.as_str()))
            .flat_map(|(p, kinds)| {
                kinds.iter().flat_map(move |(kind, subs)| {
                    subs.iter().map(move |s| WatchEntry {
                        path: p.clone(),
                        kind: *kind,
                        subscriber: s.clone(),
                    })
                })
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
        entries
    }

    /// Remove and return every entry
    pub fn drain(&self) -> Vec<WatchEntry> {
        let drained = std::mem::take(&mut *self.watches.lock());
        let mut entries: Vec<WatchEntry> = drained
            .into_iter()
            .flat_map(|(path, kinds)| {
                kinds.into_iter().flat_map(move |(kind, subs)| {
                    let path = path.clone();
                    subs.into_iter().map(move |subscriber| WatchEntry {
                        path: path.clone(),
                        kind,
                        subscriber,
                    })
                })
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
        entries
    }

    /// Number of entries registered at `path`
    ///
    /// This is primarily for testing and monitoring purposes.
    pub fn watch_count(
        &self,
        path: &str,
    ) -> usize {
        self.watches
            .lock()
            .get(path)
            .map(|kinds| kinds.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Number of distinct watched paths
    pub fn watched_path_count(&self) -> usize {
        self.watches.lock().len()
    }
}
