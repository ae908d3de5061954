use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use super::BackgroundWorker;
use super::ClientInner;
use super::RemovalCoordinator;
use super::SessionBridge;
use super::WatchClient;
use crate::watch::EventDispatcher;
use crate::ListenerContainer;
use crate::RecoveryPolicy;
use crate::Result;
use crate::SessionEvent;
use crate::WatchClientConfig;
use crate::WatchRegistry;
use crate::WatchTransport;

pub struct WatchClientBuilder {
    transport: Arc<dyn WatchTransport>,
    config: WatchClientConfig,
    session_events: Option<broadcast::Receiver<SessionEvent>>,
}

impl WatchClientBuilder {
    /// Create a new builder with default config on top of `transport`
    pub fn new(transport: Arc<dyn WatchTransport>) -> Self {
        Self {
            transport,
            config: WatchClientConfig::default(),
            session_events: None,
        }
    }

    /// Session-expiry recovery policy (default: resubmit all)
    pub fn recovery_policy(
        mut self,
        policy: RecoveryPolicy,
    ) -> Self {
        self.config.session.recovery = policy;
        self
    }

    /// Capacity of the delivery queue (default: 1024)
    pub fn event_queue_size(
        mut self,
        size: usize,
    ) -> Self {
        self.config.dispatch.event_queue_size = size;
        self
    }

    /// Completely replaces the configuration
    ///
    /// # Warning: Configuration Override
    /// This discards settings made through
    /// [`recovery_policy`](WatchClientBuilder::recovery_policy) or
    /// [`event_queue_size`](WatchClientBuilder::event_queue_size) before it.
    pub fn set_config(
        mut self,
        config: WatchClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Subscribe the client to a session event feed
    ///
    /// Without one, session changes must be pushed through
    /// [`WatchClient::on_session_event`].
    pub fn session_events(
        mut self,
        receiver: broadcast::Receiver<SessionEvent>,
    ) -> Self {
        self.session_events = Some(receiver);
        self
    }

    /// Validate the configuration and start the client's workers
    pub async fn build(self) -> Result<WatchClient> {
        let config = self.config.validate()?;
        let shutdown = CancellationToken::new();

        let registry = Arc::new(WatchRegistry::new());
        let listeners = ListenerContainer::new();
        let (dispatcher, dispatch_worker) =
            EventDispatcher::new(registry.clone(), listeners.clone(), config.dispatch.event_queue_size);
        let coordinator = RemovalCoordinator::new(registry.clone(), dispatcher.clone(), self.transport.clone());
        let session = Arc::new(SessionBridge::new(
            registry.clone(),
            dispatcher.clone(),
            self.transport.clone(),
            config.session.clone(),
        ));

        let (background_tx, background_rx) = mpsc::channel(config.dispatch.background_queue_size);
        let background_worker = BackgroundWorker::new(background_rx, coordinator.clone(), dispatcher.clone());

        tokio::spawn(dispatch_worker.run(shutdown.clone()));
        tokio::spawn(background_worker.run(shutdown.clone()));
        if let Some(receiver) = self.session_events {
            tokio::spawn(listen_session_events(receiver, session.clone(), shutdown.clone()));
        }

        Ok(WatchClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                registry,
                listeners,
                dispatcher,
                coordinator,
                session,
                background_tx,
                config,
                shutdown,
            }),
        })
    }
}

async fn listen_session_events(
    mut receiver: broadcast::Receiver<SessionEvent>,
    session: Arc<SessionBridge>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = receiver.recv() => match event {
                Ok(event) => session.handle(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event feed lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("Session event feed closed");
                    break;
                }
            }
        }
    }
}
