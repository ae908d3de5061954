use std::sync::Arc;

use arc_swap::ArcSwap;

use super::dispatcher::run_guarded;
use super::ClientEvent;

/// Process-wide listener receiving every event routed to the default subscriber
pub trait ClientListener: Send + Sync + 'static {
    fn event_received(
        &self,
        event: &ClientEvent,
    );
}

impl<F> ClientListener for F
where
    F: Fn(&ClientEvent) + Send + Sync + 'static,
{
    fn event_received(
        &self,
        event: &ClientEvent,
    ) {
        self(event)
    }
}

/// Result sink for a background removal
pub trait BackgroundCallback: Send + Sync + 'static {
    fn process_result(
        &self,
        event: &ClientEvent,
    );
}

impl<F> BackgroundCallback for F
where
    F: Fn(&ClientEvent) + Send + Sync + 'static,
{
    fn process_result(
        &self,
        event: &ClientEvent,
    ) {
        self(event)
    }
}

/// Copy-on-write list of client listeners
///
/// Readers on the dispatch path take a lock-free snapshot; add/remove swap in a new list.
#[derive(Clone, Default)]
pub struct ListenerContainer {
    listeners: Arc<ArcSwap<Vec<Arc<dyn ClientListener>>>>,
}

impl ListenerContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        listener: Arc<dyn ClientListener>,
    ) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(listener.clone());
            next
        });
    }

    /// Remove a previously added listener. Returns `false` if it was not present.
    pub fn remove(
        &self,
        listener: &Arc<dyn ClientListener>,
    ) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let previous = self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|l| Arc::as_ptr(l) as *const () != target)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|l| Arc::as_ptr(l) as *const () == target)
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn for_each(
        &self,
        event: &ClientEvent,
    ) {
        for listener in self.listeners.load().iter() {
            run_guarded("listener", || listener.event_received(event));
        }
    }
}
