//! Event dispatcher
//!
//! ```text
//! transport notification ──► process_notification()
//!                               │ take_triggered() under registry lock (fire-once)
//!                               ▼
//! removal confirmations ──► delivery queue (tokio mpsc, FIFO)
//! completion callbacks  ──►     │
//!                               ▼
//!                         DispatchWorker::run()
//!                               │
//!               ┌───────────────┼─────────────────┐
//!               ▼               ▼                 ▼
//!        Watcher::process  ClientListener   BackgroundCallback
//! ```
//!
//! Registry mutation happens at ingress, before the delivery is queued, so a
//! removal running concurrently always sees the post-fire registry. One worker
//! drains the queue, which gives per-subscriber ordering for free.

use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::BackgroundCallback;
use super::ClientEvent;
use super::KeeperState;
use super::ListenerContainer;
use super::Subscriber;
use super::WatchEntry;
use super::WatchKind;
use super::WatchRegistry;
use super::WatchedEvent;
use crate::metrics::WATCHES_TRIGGERED;

pub(crate) enum Delivery {
    /// Event for one subscriber
    Watched {
        subscriber: Subscriber,
        kind: Option<WatchKind>,
        event: WatchedEvent,
    },
    /// Connection state change, listeners only
    State(WatchedEvent),
    /// Result of a background operation
    Completion {
        callback: Arc<dyn BackgroundCallback>,
        event: ClientEvent,
    },
}

/// Front half of the dispatcher: resolves events against the registry and queues deliveries
#[derive(Clone)]
pub(crate) struct EventDispatcher {
    registry: Arc<WatchRegistry>,
    sender: mpsc::Sender<Delivery>,
}

impl EventDispatcher {
    /// Create the dispatcher together with the worker that drains its queue
    pub(crate) fn new(
        registry: Arc<WatchRegistry>,
        listeners: ListenerContainer,
        queue_size: usize,
    ) -> (Self, DispatchWorker) {
        let (sender, receiver) = mpsc::channel(queue_size);
        (Self { registry, sender }, DispatchWorker { receiver, listeners })
    }

    /// Handle a notification coming from the transport layer
    ///
    /// Matched entries are removed from the registry before this returns.
    pub(crate) async fn process_notification(
        &self,
        event: WatchedEvent,
    ) {
        let Some(path) = event.path.clone() else {
            self.enqueue(Delivery::State(event)).await;
            return;
        };

        let fired = self.registry.take_triggered(&path, event.event_type);
        if fired.is_empty() {
            trace!(path = %path, event_type = ?event.event_type, "Notification matched no watch");
            return;
        }

        let event_label = format!("{:?}", event.event_type);
        WATCHES_TRIGGERED
            .with_label_values(&[event_label.as_str()])
            .inc_by(fired.len() as u64);
        trace!(path = %path, event_type = ?event.event_type, watchers = fired.len(), "Watches fired");

        for entry in fired {
            self.enqueue(Delivery::Watched {
                subscriber: entry.subscriber,
                kind: Some(entry.kind),
                event: event.clone(),
            })
            .await;
        }
    }

    /// Queue a removal confirmation for each removed entry
    pub(crate) async fn confirm_removed(
        &self,
        removed: &[WatchEntry],
    ) {
        self.notify_removed(removed, KeeperState::SyncConnected).await;
    }

    /// Queue a watch-removed notification for entries dropped because the session expired
    pub(crate) async fn notify_expired(
        &self,
        dropped: &[WatchEntry],
    ) {
        self.notify_removed(dropped, KeeperState::Expired).await;
    }

    pub(crate) async fn state_changed(
        &self,
        state: KeeperState,
    ) {
        self.enqueue(Delivery::State(WatchedEvent::state_change(state))).await;
    }

    pub(crate) async fn complete(
        &self,
        callback: Arc<dyn BackgroundCallback>,
        event: ClientEvent,
    ) {
        self.enqueue(Delivery::Completion { callback, event }).await;
    }

    async fn notify_removed(
        &self,
        entries: &[WatchEntry],
        state: KeeperState,
    ) {
        for entry in entries {
            self.enqueue(Delivery::Watched {
                subscriber: entry.subscriber.clone(),
                kind: Some(entry.kind),
                event: WatchedEvent::watch_removed(&entry.path, entry.kind, state),
            })
            .await;
        }
    }

    async fn enqueue(
        &self,
        delivery: Delivery,
    ) {
        if self.sender.send(delivery).await.is_err() {
            warn!("Dispatch worker stopped, delivery dropped");
        }
    }
}

/// Back half of the dispatcher: the single delivery worker
pub(crate) struct DispatchWorker {
    receiver: mpsc::Receiver<Delivery>,
    listeners: ListenerContainer,
}

impl DispatchWorker {
    pub(crate) async fn run(
        mut self,
        shutdown: CancellationToken,
    ) {
        debug!("Watch dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Watch dispatcher received shutdown signal");
                    break;
                }
                delivery = self.receiver.recv() => {
                    match delivery {
                        Some(delivery) => self.deliver(delivery),
                        None => {
                            warn!("Watch delivery channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }
        debug!("Watch dispatcher stopped");
    }

    fn deliver(
        &self,
        delivery: Delivery,
    ) {
        match delivery {
            Delivery::Watched {
                subscriber,
                kind,
                event,
            } => match subscriber {
                Subscriber::Default => {
                    self.listeners.for_each(&ClientEvent::watched(event, kind));
                }
                Subscriber::Watcher(watcher) => run_guarded("watcher", || watcher.process(&event)),
                Subscriber::Fallible(watcher) => run_guarded("watcher", || {
                    if let Err(e) = watcher.process(&event) {
                        error!(path = ?event.path, event_type = ?event.event_type, "Watcher failed: {:?}", e);
                    }
                }),
            },
            Delivery::State(event) => {
                self.listeners.for_each(&ClientEvent::watched(event, None));
            }
            Delivery::Completion { callback, event } => {
                run_guarded("background callback", || callback.process_result(&event));
            }
        }
    }
}

/// Run user code on the delivery worker; a panic is logged and contained
pub(super) fn run_guarded(
    callee: &'static str,
    f: impl FnOnce(),
) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        error!(callee, "Panic during event delivery: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
