//! Removal coordinator
//!
//! State machine per request:
//!
//! ```text
//! Requested ──► ServerAccepted ──────────► RegistryUpdated + ConfirmationFired
//!     │     └─► ServerRejectedNoWatcher ─► (quiet) RegistryUpdated + ConfirmationFired
//!     │                                └─► Failed(NoWatcher)
//!     │     └─► TransportFailed ─────────► Failed
//!     └─► (local) RegistryUpdated + ConfirmationFired
//! ```
//!
//! The server only knows watches by `(path, kind)`. Removing one subscriber
//! therefore contacts the server only when that subscriber is the last one of
//! its kind on the path; otherwise the server-side watch is still needed and
//! the removal is settled against the registry alone.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::metrics::WATCH_REMOVALS;
use crate::utils::validate_path;
use crate::watch::EventDispatcher;
use crate::BackgroundCallback;
use crate::ClientEvent;
use crate::Error;
use crate::RemovalTarget;
use crate::Result;
use crate::ResultCode;
use crate::WatchEntry;
use crate::WatchKind;
use crate::WatchOperation;
use crate::WatchRegistry;
use crate::WatchRequest;
use crate::WatchTransport;

/// A removal as selected through the fluent builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemovalRequest {
    pub(crate) path: String,
    pub(crate) kind: WatchKind,
    pub(crate) target: RemovalTarget,
    /// Settle against the registry only, never contact the server
    pub(crate) local: bool,
    /// Treat "no such watcher" as success
    pub(crate) quiet: bool,
}

impl RemovalRequest {
    fn mode_label(&self) -> &'static str {
        if self.local {
            "local"
        } else {
            "server"
        }
    }
}

/// Which kinds need a server round-trip and which are settled locally
#[derive(Debug, Default, PartialEq, Eq)]
struct RemovalPlan {
    server_kinds: Vec<WatchKind>,
    local_kinds: Vec<WatchKind>,
    /// Nothing was registered locally for an `Any` removal: ask the server about
    /// both kinds and report `NoWatcher` only if neither existed
    probe: bool,
}

#[derive(Clone)]
pub(crate) struct RemovalCoordinator {
    registry: Arc<WatchRegistry>,
    dispatcher: EventDispatcher,
    transport: Arc<dyn WatchTransport>,
}

impl RemovalCoordinator {
    pub(crate) fn new(
        registry: Arc<WatchRegistry>,
        dispatcher: EventDispatcher,
        transport: Arc<dyn WatchTransport>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            transport,
        }
    }

    /// Checks done synchronously before any I/O
    pub(crate) fn validate(
        &self,
        request: &RemovalRequest,
    ) -> Result<()> {
        validate_path(&request.path)
    }

    /// Run one removal to completion and return the entries it removed
    ///
    /// Confirmation events for the removed entries are queued before this returns.
    pub(crate) async fn execute(
        &self,
        request: &RemovalRequest,
    ) -> Result<Vec<WatchEntry>> {
        self.validate(request)?;
        trace!(path = %request.path, kind = %request.kind, removal_target = ?request.target, local = request.local, quiet = request.quiet, "Removal requested");

        let result = if request.local {
            self.remove_locally(request).await
        } else {
            self.remove_with_server(request).await
        };

        let outcome = match &result {
            Ok(removed) if removed.is_empty() => "noop",
            Ok(_) => "ok",
            Err(e) if e.is_no_watcher() => "no_watcher",
            Err(_) => "failed",
        };
        WATCH_REMOVALS.with_label_values(&[request.mode_label(), outcome]).inc();
        result
    }

    async fn remove_locally(
        &self,
        request: &RemovalRequest,
    ) -> Result<Vec<WatchEntry>> {
        let removed = self.registry.unregister(&request.path, request.kind, &request.target);
        if removed.is_empty() {
            return self.nothing_removed(request);
        }
        debug!(path = %request.path, kind = %request.kind, removed = removed.len(), "Watches removed locally");
        self.dispatcher.confirm_removed(&removed).await;
        Ok(removed)
    }

    async fn remove_with_server(
        &self,
        request: &RemovalRequest,
    ) -> Result<Vec<WatchEntry>> {
        let plan = self.plan(request);
        if plan.server_kinds.is_empty() && plan.local_kinds.is_empty() {
            // Only reachable for a single subscriber that holds no watch here
            return self.nothing_removed(request);
        }

        let path = &request.path;
        let responses = join_all(plan.server_kinds.iter().map(|&kind| {
            self.transport.submit(WatchRequest::Remove {
                path: path.clone(),
                kind,
            })
        }))
        .await;

        let mut removed = Vec::new();
        let mut failure: Option<Error> = None;
        let mut cleared = Vec::new();

        for (kind, response) in plan.server_kinds.iter().copied().zip(responses) {
            match response {
                Ok(_) => {
                    cleared.push(kind);
                    removed.extend(self.registry.unregister(path, kind, &request.target));
                }
                Err(e) if e.is_no_watcher() => {
                    if request.quiet {
                        // Local view may be stale; clean it anyway
                        removed.extend(self.registry.unregister(path, kind, &request.target));
                    } else if !plan.probe && failure.is_none() {
                        debug!(path = %path, %kind, "Server reports no watcher");
                        failure = Some(e);
                    }
                }
                Err(e) => {
                    warn!(path = %path, %kind, "Watch removal failed: {:?}", e);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        for kind in plan.local_kinds {
            removed.extend(self.registry.unregister(path, kind, &request.target));
        }

        if failure.is_none() && !request.quiet {
            // A natural fire consumed the subscriber's entry while the request was in flight
            let lost_race = matches!(request.target, RemovalTarget::Subscriber(_)) && removed.is_empty();
            let probe_missed = plan.probe && cleared.is_empty();
            if lost_race || probe_missed {
                failure = Some(Error::no_watcher(path.as_str(), request.kind));
            }
        }

        // Constituent requests have all resolved; confirm whatever is gone.
        self.dispatcher.confirm_removed(&removed).await;

        for kind in cleared {
            self.rearm_if_resubscribed(path, kind).await;
        }

        match failure {
            Some(e) => Err(e),
            None => {
                debug!(path = %path, kind = %request.kind, removed = removed.len(), "Watches removed");
                Ok(removed)
            }
        }
    }

    /// A subscriber registered for `(path, kind)` while the server removal was
    /// in flight still needs the server watch that removal just cleared.
    async fn rearm_if_resubscribed(
        &self,
        path: &str,
        kind: WatchKind,
    ) {
        if self
            .registry
            .registered_kinds(path, kind, &RemovalTarget::AllOfKind)
            .is_empty()
        {
            return;
        }
        warn!(path = %path, %kind, "Watch registered during server removal, re-arming");
        let request = WatchRequest::Register {
            path: path.to_string(),
            operation: WatchOperation::rearm(kind),
        };
        if let Err(e) = self.transport.submit(request).await {
            warn!(path = %path, %kind, "Re-arm after removal failed: {:?}", e);
        }
    }

    fn plan(
        &self,
        request: &RemovalRequest,
    ) -> RemovalPlan {
        match &request.target {
            RemovalTarget::Subscriber(subscriber) => {
                let mut plan = RemovalPlan::default();
                for (kind, sole) in self.registry.subscriber_kinds(&request.path, request.kind, subscriber) {
                    if sole {
                        plan.server_kinds.push(kind);
                    } else {
                        plan.local_kinds.push(kind);
                    }
                }
                plan
            }
            RemovalTarget::AllOfKind if request.kind.is_concrete() => RemovalPlan {
                server_kinds: vec![request.kind],
                ..Default::default()
            },
            RemovalTarget::AllOfKind => {
                let registered = self.registry.registered_kinds(&request.path, request.kind, &request.target);
                if registered.is_empty() {
                    RemovalPlan {
                        server_kinds: request.kind.concrete_kinds().to_vec(),
                        probe: true,
                        ..Default::default()
                    }
                } else {
                    RemovalPlan {
                        server_kinds: registered,
                        ..Default::default()
                    }
                }
            }
        }
    }

    fn nothing_removed(
        &self,
        request: &RemovalRequest,
    ) -> Result<Vec<WatchEntry>> {
        if request.quiet {
            debug!(path = %request.path, kind = %request.kind, "No watcher to remove, ignored quietly");
            Ok(Vec::new())
        } else {
            Err(Error::no_watcher(request.path.as_str(), request.kind))
        }
    }
}

/// A removal handed to the background worker
pub(crate) struct BackgroundRemoval {
    pub(crate) request: RemovalRequest,
    pub(crate) callback: Option<Arc<dyn BackgroundCallback>>,
}

/// Executes background removals one at a time, in submission order
pub(crate) struct BackgroundWorker {
    receiver: mpsc::Receiver<BackgroundRemoval>,
    coordinator: RemovalCoordinator,
    dispatcher: EventDispatcher,
}

impl BackgroundWorker {
    pub(crate) fn new(
        receiver: mpsc::Receiver<BackgroundRemoval>,
        coordinator: RemovalCoordinator,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            receiver,
            coordinator,
            dispatcher,
        }
    }

    pub(crate) async fn run(
        mut self,
        shutdown: CancellationToken,
    ) {
        debug!("Background removal worker started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                removal = self.receiver.recv() => {
                    let Some(removal) = removal else {
                        break;
                    };
                    let path = removal.request.path.clone();
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => {
                            debug!(path = %path, "Client closed, outstanding removal discarded");
                            break;
                        }
                        _ = self.process(removal) => {}
                    }
                }
            }
        }
        debug!("Background removal worker stopped");
    }

    async fn process(
        &self,
        removal: BackgroundRemoval,
    ) {
        let BackgroundRemoval { request, callback } = removal;
        let result = self.coordinator.execute(&request).await;

        match callback {
            Some(callback) => {
                let confirmed = matches!(&result, Ok(removed) if !removed.is_empty());
                let event = ClientEvent::remove_watches(&request.path, request.kind, ResultCode::from(&result), confirmed);
                self.dispatcher.complete(callback, event).await;
            }
            None => {
                if let Err(e) = result {
                    error!(path = %request.path, kind = %request.kind, "Background watch removal failed: {:?}", e);
                }
            }
        }
    }
}
