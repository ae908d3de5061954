use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use super::WatchedEvent;
use crate::Result;

/// Callback invoked for every event delivered to a watch it was registered with
pub trait Watcher: Send + Sync + 'static {
    fn process(
        &self,
        event: &WatchedEvent,
    );
}

impl<F> Watcher for F
where
    F: Fn(&WatchedEvent) + Send + Sync + 'static,
{
    fn process(
        &self,
        event: &WatchedEvent,
    ) {
        self(event)
    }
}

/// Watcher whose processing can fail. Failures are logged by the dispatcher.
pub trait FallibleWatcher: Send + Sync + 'static {
    fn process(
        &self,
        event: &WatchedEvent,
    ) -> Result<()>;
}

/// The party a watch notification is delivered to
///
/// Identity is the identity of the callback object: two subscribers are equal
/// when they wrap the same `Arc`. Clone a subscriber to keep a handle usable
/// for later removal.
#[derive(Clone)]
pub enum Subscriber {
    /// Process-wide default listener; its events go to every registered
    /// [`ClientListener`](crate::ClientListener)
    Default,
    /// Explicit watcher bound to a registration call
    Watcher(Arc<dyn Watcher>),
    /// Explicit watcher with fallible processing
    Fallible(Arc<dyn FallibleWatcher>),
}

impl Subscriber {
    /// Wrap a closure as an explicit watcher
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&WatchedEvent) + Send + Sync + 'static,
    {
        Subscriber::Watcher(Arc::new(f))
    }

    pub fn fallible(watcher: impl FallibleWatcher) -> Self {
        Subscriber::Fallible(Arc::new(watcher))
    }

    /// Address of the wrapped callback; 0 for the default listener
    pub(crate) fn id(&self) -> usize {
        match self {
            Subscriber::Default => 0,
            Subscriber::Watcher(w) => Arc::as_ptr(w) as *const () as usize,
            Subscriber::Fallible(w) => Arc::as_ptr(w) as *const () as usize,
        }
    }
}

impl From<Arc<dyn Watcher>> for Subscriber {
    fn from(watcher: Arc<dyn Watcher>) -> Self {
        Subscriber::Watcher(watcher)
    }
}

impl From<Arc<dyn FallibleWatcher>> for Subscriber {
    fn from(watcher: Arc<dyn FallibleWatcher>) -> Self {
        Subscriber::Fallible(watcher)
    }
}

impl PartialEq for Subscriber {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Subscriber::Default, Subscriber::Default) => true,
            (Subscriber::Watcher(_), Subscriber::Watcher(_)) | (Subscriber::Fallible(_), Subscriber::Fallible(_)) => {
                self.id() == other.id()
            }
            _ => false,
        }
    }
}

impl Eq for Subscriber {}

impl Hash for Subscriber {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        std::mem::discriminant(self).hash(state);
        self.id().hash(state);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Subscriber::Default => f.write_str("Default"),
            Subscriber::Watcher(_) => write!(f, "Watcher({:#x})", self.id()),
            Subscriber::Fallible(_) => write!(f, "Fallible({:#x})", self.id()),
        }
    }
}
