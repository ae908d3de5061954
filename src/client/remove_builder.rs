//! Fluent removal API
//!
//! ```ignore
//! client.watches()
//!     .remove(subscriber)
//!     .of_kind(WatchKind::Data)
//!     .quietly()
//!     .in_background()
//!     .for_path("/app/config")
//!     .await?;
//! ```
//!
//! Every modifier only changes the request descriptor; nothing happens
//! until [`RemoveWatchesBuilder::for_path`] is awaited.

use std::sync::Arc;

use super::BackgroundRemoval;
use super::RemovalRequest;
use super::WatchClient;
use crate::BackgroundCallback;
use crate::RemovalTarget;
use crate::Result;
use crate::Subscriber;
use crate::WatchKind;

/// Entry point returned by [`WatchClient::watches`]
pub struct WatchesBuilder<'a> {
    client: &'a WatchClient,
}

impl<'a> WatchesBuilder<'a> {
    pub(crate) fn new(client: &'a WatchClient) -> Self {
        Self { client }
    }

    /// Remove one subscriber's watches
    pub fn remove(
        self,
        subscriber: impl Into<Subscriber>,
    ) -> RemoveWatchesType<'a> {
        RemoveWatchesType {
            client: self.client,
            target: RemovalTarget::Subscriber(subscriber.into()),
        }
    }

    /// Remove every subscriber's watches
    pub fn remove_all(self) -> RemoveWatchesType<'a> {
        RemoveWatchesType {
            client: self.client,
            target: RemovalTarget::AllOfKind,
        }
    }
}

pub struct RemoveWatchesType<'a> {
    client: &'a WatchClient,
    target: RemovalTarget,
}

impl<'a> RemoveWatchesType<'a> {
    pub fn of_kind(
        self,
        kind: WatchKind,
    ) -> RemoveWatchesBuilder<'a> {
        RemoveWatchesBuilder {
            client: self.client,
            target: self.target,
            kind,
            local: false,
            quiet: false,
            background: None,
        }
    }

    /// Shorthand for `of_kind(WatchKind::Any)`
    pub fn of_any_kind(self) -> RemoveWatchesBuilder<'a> {
        self.of_kind(WatchKind::Any)
    }
}

enum Background {
    Detached,
    WithCallback(Arc<dyn BackgroundCallback>),
}

pub struct RemoveWatchesBuilder<'a> {
    client: &'a WatchClient,
    target: RemovalTarget,
    kind: WatchKind,
    local: bool,
    quiet: bool,
    background: Option<Background>,
}

impl RemoveWatchesBuilder<'_> {
    /// Only update the local registry; works while disconnected
    pub fn locally(mut self) -> Self {
        self.local = true;
        self
    }

    /// Succeed when there was nothing to remove
    pub fn quietly(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Return immediately; the outcome is only logged
    pub fn in_background(mut self) -> Self {
        self.background = Some(Background::Detached);
        self
    }

    /// Return immediately; `callback` receives a
    /// [`RemoveWatches`](crate::EventCategory::RemoveWatches) event with the outcome
    pub fn in_background_with(
        mut self,
        callback: impl BackgroundCallback,
    ) -> Self {
        self.background = Some(Background::WithCallback(Arc::new(callback)));
        self
    }

    /// Execute the removal on `path`
    ///
    /// In foreground mode the result reflects the removal outcome and every
    /// confirmation is queued before this returns. In background mode only
    /// argument and closed-client errors are reported here.
    pub async fn for_path(
        self,
        path: &str,
    ) -> Result<()> {
        self.client.ensure_open()?;
        let request = RemovalRequest {
            path: path.to_string(),
            kind: self.kind,
            target: self.target,
            local: self.local,
            quiet: self.quiet,
        };
        let coordinator = &self.client.inner.coordinator;

        match self.background {
            None => coordinator.execute(&request).await.map(|_| ()),
            Some(background) => {
                coordinator.validate(&request)?;
                let callback = match background {
                    Background::Detached => None,
                    Background::WithCallback(callback) => Some(callback),
                };
                self.client
                    .submit_background(BackgroundRemoval { request, callback })
                    .await
            }
        }
    }
}
