//! Watch client
//!
//! Provides the public surface of the watch subsystem:
//! - [`WatchClient`] - Entry point for arming, removing and observing watches
//! - [`WatchClientBuilder`] - Configurable construction, spawns the workers
//! - [`WatchRegistrationBuilder`] - Watch-arming reads
//! - [`WatchesBuilder`] - Fluent watch removal
//!
//! # Basic Usage
//! ```ignore
//! use coord_watch::{ClientEvent, Subscriber, WatchClient, WatchKind, WatchedEvent};
//!
//! let client = WatchClient::builder(transport).build().await?;
//! client.listenable().add(Arc::new(|event: &ClientEvent| println!("{event:?}")));
//!
//! let watcher = Subscriber::from_fn(|event: &WatchedEvent| println!("{event:?}"));
//! client.check_exists().using_watcher(watcher.clone()).for_path("/app/leader").await?;
//!
//! client.watches().remove(watcher).of_kind(WatchKind::Data).for_path("/app/leader").await?;
//! client.close();
//! ```

mod builder;
mod registration;
mod removal;
mod remove_builder;
mod session;

pub use builder::*;
pub use registration::*;
pub(crate) use removal::*;
pub use remove_builder::*;
pub(crate) use session::*;


use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::watch::EventDispatcher;
use crate::Error;
use crate::ListenerContainer;
use crate::Result;
use crate::SessionEvent;
use crate::TransportError;
use crate::WatchClientConfig;
use crate::WatchEntry;
use crate::WatchOperation;
use crate::WatchRegistry;
use crate::WatchTransport;
use crate::WatchedEvent;

/// Main entry point of the watch subsystem
///
/// Cheap to clone; clones share registry, workers and listeners.
/// Created through [`builder()`](WatchClient::builder).
#[derive(Clone)]
pub struct WatchClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) transport: Arc<dyn WatchTransport>,
    pub(crate) registry: Arc<WatchRegistry>,
    pub(crate) listeners: ListenerContainer,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) coordinator: RemovalCoordinator,
    pub(crate) session: Arc<SessionBridge>,
    pub(crate) background_tx: mpsc::Sender<BackgroundRemoval>,
    pub(crate) config: WatchClientConfig,
    pub(crate) shutdown: CancellationToken,
}

impl WatchClient {
    pub fn builder(transport: Arc<dyn WatchTransport>) -> WatchClientBuilder {
        WatchClientBuilder::new(transport)
    }

    /// Existence check that arms a data watch, even on an absent node
    pub fn check_exists(&self) -> WatchRegistrationBuilder<'_> {
        WatchRegistrationBuilder::new(self, WatchOperation::Exists)
    }

    /// Data read that arms a data watch
    pub fn get_data(&self) -> WatchRegistrationBuilder<'_> {
        WatchRegistrationBuilder::new(self, WatchOperation::GetData)
    }

    /// Children listing that arms a children watch
    pub fn get_children(&self) -> WatchRegistrationBuilder<'_> {
        WatchRegistrationBuilder::new(self, WatchOperation::GetChildren)
    }

    /// Fluent watch removal
    pub fn watches(&self) -> WatchesBuilder<'_> {
        WatchesBuilder::new(self)
    }

    /// Listeners receiving every event routed to the default subscriber,
    /// plus connection state changes
    pub fn listenable(&self) -> &ListenerContainer {
        &self.inner.listeners
    }

    /// Current registrations, optionally limited to one path
    pub fn snapshot(
        &self,
        path: Option<&str>,
    ) -> Vec<WatchEntry> {
        self.inner.registry.snapshot(path)
    }

    /// Feed a server notification into the client
    ///
    /// Triggered watches are consumed before this returns; delivery happens
    /// on the dispatch worker.
    pub async fn process_notification(
        &self,
        event: WatchedEvent,
    ) {
        if self.is_closed() {
            return;
        }
        self.inner.dispatcher.process_notification(event).await;
    }

    /// Feed a session lifecycle change into the client
    pub async fn on_session_event(
        &self,
        event: SessionEvent,
    ) {
        if self.is_closed() {
            return;
        }
        self.inner.session.handle(event).await;
    }

    /// Whether the session layer last reported a live connection
    pub fn is_connected(&self) -> bool {
        self.inner.session.is_connected()
    }

    pub fn config(&self) -> &WatchClientConfig {
        &self.inner.config
    }

    /// Stop the workers. Queued deliveries and outstanding background
    /// removals are discarded; later calls fail with [`TransportError::Closed`].
    pub fn close(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!(
                watched_paths = self.inner.registry.watched_path_count(),
                "Closing watch client"
            );
            self.inner.shutdown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Transport(TransportError::Closed));
        }
        Ok(())
    }

    pub(crate) async fn submit_background(
        &self,
        removal: BackgroundRemoval,
    ) -> Result<()> {
        self.inner
            .background_tx
            .send(removal)
            .await
            .map_err(|_| Error::Transport(TransportError::Closed))
    }
}
