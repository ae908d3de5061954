use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use crate::BackgroundCallback;
use crate::ClientEvent;
use crate::ClientListener;
use crate::Subscriber;
use crate::WatchedEvent;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Explicit watcher forwarding every event into a channel
pub(crate) fn recording_subscriber() -> (Subscriber, UnboundedReceiver<WatchedEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscriber = Subscriber::from_fn(move |event: &WatchedEvent| {
        let _ = tx.send(event.clone());
    });
    (subscriber, rx)
}

pub(crate) fn recording_listener() -> (Arc<dyn ClientListener>, UnboundedReceiver<ClientEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener: Arc<dyn ClientListener> = Arc::new(move |event: &ClientEvent| {
        let _ = tx.send(event.clone());
    });
    (listener, rx)
}

pub(crate) fn recording_callback() -> (impl BackgroundCallback, UnboundedReceiver<ClientEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = move |event: &ClientEvent| {
        let _ = tx.send(event.clone());
    };
    (callback, rx)
}

/// Next item, failing the test if none arrives in time
pub(crate) async fn recv_event<T>(rx: &mut UnboundedReceiver<T>) -> T {
    match timeout(RECV_TIMEOUT, rx.recv()).await {
        Ok(Some(item)) => item,
        Ok(None) => panic!("channel closed while waiting for an event"),
        Err(_) => panic!("no event received within {:?}", RECV_TIMEOUT),
    }
}

/// Assert nothing arrives for a short while
pub(crate) async fn assert_no_event<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>) {
    if let Ok(Some(item)) = timeout(Duration::from_millis(50), rx.recv()).await {
        panic!("unexpected event: {:?}", item);
    }
}
