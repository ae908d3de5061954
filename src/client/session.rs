//! Session bridge
//!
//! Keeps the registry consistent with what the server still knows after
//! connection and session lifecycle changes.
//!
//! - `Disconnected`: nothing is dropped. Server watches survive while the
//!   session is alive, so local entries stay and listeners get a state event.
//! - `Reconnected`: same session, server watches intact. Listeners are told.
//! - `Expired`: every server-side watch is gone. Local entries are either
//!   re-armed on the new session or dropped, per [`RecoveryPolicy`].

use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::metrics::SESSION_RECOVERIES;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::watch::EventDispatcher;
use crate::KeeperState;
use crate::RecoveryPolicy;
use crate::RemovalTarget;
use crate::SessionConfig;
use crate::SessionEvent;
use crate::WatchKind;
use crate::WatchOperation;
use crate::WatchRegistry;
use crate::WatchRequest;
use crate::WatchTransport;

pub(crate) struct SessionBridge {
    registry: Arc<WatchRegistry>,
    dispatcher: EventDispatcher,
    transport: Arc<dyn WatchTransport>,
    config: SessionConfig,
    connected: AtomicBool,
}

impl SessionBridge {
    pub(crate) fn new(
        registry: Arc<WatchRegistry>,
        dispatcher: EventDispatcher,
        transport: Arc<dyn WatchTransport>,
        config: SessionConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            transport,
            config,
            connected: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) async fn handle(
        &self,
        event: SessionEvent,
    ) {
        match event {
            SessionEvent::Disconnected => {
                self.connected.store(false, Ordering::Release);
                warn!(
                    watched_paths = self.registry.watched_path_count(),
                    "Connection lost, keeping local watches"
                );
                self.dispatcher.state_changed(KeeperState::Disconnected).await;
            }
            SessionEvent::Reconnected => {
                self.connected.store(true, Ordering::Release);
                info!("Reconnected on the same session");
                self.dispatcher.state_changed(KeeperState::SyncConnected).await;
            }
            SessionEvent::Expired => {
                warn!(policy = self.config.recovery.as_label(), "Session expired");
                self.dispatcher.state_changed(KeeperState::Expired).await;
                self.recover().await;
                self.connected.store(true, Ordering::Release);
                self.dispatcher.state_changed(KeeperState::SyncConnected).await;
            }
        }
    }

    async fn recover(&self) {
        SESSION_RECOVERIES
            .with_label_values(&[self.config.recovery.as_label()])
            .inc();

        match self.config.recovery {
            RecoveryPolicy::DropAll => {
                let dropped = self.registry.drain();
                info!(dropped = dropped.len(), "Dropped all watches after session expiry");
                self.dispatcher.notify_expired(&dropped).await;
            }
            RecoveryPolicy::ResubmitAll => self.resubmit_all().await,
        }
    }

    /// Re-arm every `(path, kind)` on the new session. Entries whose re-arm
    /// keeps failing are dropped and their subscribers told.
    async fn resubmit_all(&self) {
        let targets: BTreeSet<(String, WatchKind)> = self
            .registry
            .snapshot(None)
            .into_iter()
            .map(|entry| (entry.path, entry.kind))
            .collect();
        if targets.is_empty() {
            debug!("No watches to resubmit");
            return;
        }

        let policy = self.config.resubmit;
        let outcomes = join_all(targets.iter().map(|(path, kind)| {
            let transport = &self.transport;
            task_with_timeout_and_exponential_backoff(
                move || {
                    transport.submit(WatchRequest::Register {
                        path: path.clone(),
                        operation: WatchOperation::rearm(*kind),
                    })
                },
                policy,
            )
        }))
        .await;

        let mut restored = 0usize;
        for ((path, kind), outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(_) => restored += 1,
                Err(e) => {
                    warn!(path = %path, %kind, "Could not re-arm watch, dropping it: {:?}", e);
                    let dropped = self.registry.unregister(path, *kind, &RemovalTarget::AllOfKind);
                    self.dispatcher.notify_expired(&dropped).await;
                }
            }
        }
        info!(restored, total = targets.len(), "Watches resubmitted after session expiry");
    }
}
