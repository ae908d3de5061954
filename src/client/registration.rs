use tracing::debug;

use super::WatchClient;
use crate::metrics::WATCHES_REGISTERED;
use crate::utils::validate_path;
use crate::FallibleWatcher;
use crate::Result;
use crate::Subscriber;
use crate::WatchOperation;
use crate::WatchRequest;
use crate::WatchResponse;

/// First step of a watch-arming read: choose who gets notified
///
/// Obtained from [`WatchClient::check_exists`], [`WatchClient::get_data`] or
/// [`WatchClient::get_children`].
pub struct WatchRegistrationBuilder<'a> {
    client: &'a WatchClient,
    operation: WatchOperation,
}

impl<'a> WatchRegistrationBuilder<'a> {
    pub(crate) fn new(
        client: &'a WatchClient,
        operation: WatchOperation,
    ) -> Self {
        Self { client, operation }
    }

    /// Notify through the client's listeners
    pub fn watched(self) -> ArmedRegistration<'a> {
        self.using_watcher(Subscriber::Default)
    }

    /// Notify `subscriber` directly
    pub fn using_watcher(
        self,
        subscriber: impl Into<Subscriber>,
    ) -> ArmedRegistration<'a> {
        ArmedRegistration {
            client: self.client,
            operation: self.operation,
            subscriber: subscriber.into(),
        }
    }

    /// Notify a watcher whose errors are logged by the dispatcher
    ///
    /// The watcher can only be removed by kind; wrap it with
    /// [`Subscriber::fallible`] and pass it to [`using_watcher`](Self::using_watcher)
    /// to keep a handle for removal by subscriber.
    pub fn using_fallible_watcher(
        self,
        watcher: impl FallibleWatcher,
    ) -> ArmedRegistration<'a> {
        self.using_watcher(Subscriber::fallible(watcher))
    }
}

pub struct ArmedRegistration<'a> {
    client: &'a WatchClient,
    operation: WatchOperation,
    subscriber: Subscriber,
}

impl ArmedRegistration<'_> {
    /// Perform the read on `path`; the watch is recorded only if the server accepts it
    pub async fn for_path(
        self,
        path: &str,
    ) -> Result<WatchResponse> {
        let inner = &self.client.inner;
        self.client.ensure_open()?;
        validate_path(path)?;

        let response = inner
            .transport
            .submit(WatchRequest::Register {
                path: path.to_string(),
                operation: self.operation,
            })
            .await?;

        let kind = self.operation.kind();
        if inner.registry.register(path, kind, self.subscriber)? {
            WATCHES_REGISTERED.with_label_values(&[kind.as_label()]).inc();
        } else {
            debug!(path, %kind, "Watch already armed for this subscriber");
        }
        Ok(response)
    }
}
