//! In-memory coordination server for end-to-end watch tests
//!
//! Keeps a node tree and the server-side watch set keyed by `(path, kind)`,
//! the way a real server does: it has no notion of client subscribers.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use coord_watch::ClientEvent;
use coord_watch::Error;
use coord_watch::EventType;
use coord_watch::Result;
use coord_watch::Subscriber;
use coord_watch::TransportError;
use coord_watch::WatchClient;
use coord_watch::WatchError;
use coord_watch::WatchKind;
use coord_watch::WatchOperation;
use coord_watch::WatchRequest;
use coord_watch::WatchResponse;
use coord_watch::WatchTransport;
use coord_watch::WatchedEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

const NO_NODE: i32 = -101;

#[derive(Default)]
struct ServerState {
    nodes: BTreeMap<String, Bytes>,
    watches: HashSet<(String, WatchKind)>,
    connected: bool,
    requests: Vec<WatchRequest>,
}

pub struct FakeServer {
    state: Mutex<ServerState>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ServerState {
                connected: true,
                ..Default::default()
            }),
        })
    }

    pub fn create(
        &self,
        path: &str,
        data: &'static [u8],
    ) {
        self.state.lock().nodes.insert(path.to_string(), Bytes::from_static(data));
    }

    /// Change node data; fires and forgets the data watch like a real server
    pub fn set_data(
        &self,
        path: &str,
        data: &'static [u8],
    ) -> WatchedEvent {
        let mut state = self.state.lock();
        state.nodes.insert(path.to_string(), Bytes::from_static(data));
        state.watches.remove(&(path.to_string(), WatchKind::Data));
        WatchedEvent::new(EventType::NodeDataChanged, path)
    }

    pub fn stop(&self) {
        self.state.lock().connected = false;
    }

    pub fn start(&self) {
        self.state.lock().connected = true;
    }

    /// Session loss: the server forgets every watch
    pub fn expire_session(&self) {
        self.state.lock().watches.clear();
    }

    pub fn has_watch(
        &self,
        path: &str,
        kind: WatchKind,
    ) -> bool {
        self.state.lock().watches.contains(&(path.to_string(), kind))
    }

    pub fn watch_count(&self) -> usize {
        self.state.lock().watches.len()
    }

    pub fn requests(&self) -> Vec<WatchRequest> {
        self.state.lock().requests.clone()
    }

    pub fn removal_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, WatchRequest::Remove { .. }))
            .count()
    }

    fn children_of(
        state: &ServerState,
        path: &str,
    ) -> Vec<String> {
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        state
            .nodes
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl WatchTransport for FakeServer {
    async fn submit(
        &self,
        request: WatchRequest,
    ) -> Result<WatchResponse> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::Transport(TransportError::ConnectionLoss));
        }
        state.requests.push(request.clone());

        match request {
            WatchRequest::Register { path, operation } => {
                let exists = state.nodes.contains_key(&path);
                let response = match operation {
                    WatchOperation::Exists => WatchResponse::Exists(exists),
                    _ if !exists => {
                        return Err(Error::Transport(TransportError::ServerError {
                            code: NO_NODE,
                            message: format!("no node {path}"),
                        }))
                    }
                    WatchOperation::GetData => WatchResponse::Data(state.nodes[&path].clone()),
                    WatchOperation::GetChildren => WatchResponse::Children(Self::children_of(&state, &path)),
                };
                state.watches.insert((path, operation.kind()));
                Ok(response)
            }
            WatchRequest::Remove { path, kind } => {
                let mut removed = false;
                for &concrete in kind.concrete_kinds() {
                    removed |= state.watches.remove(&(path.clone(), concrete));
                }
                if removed {
                    Ok(WatchResponse::Removed)
                } else {
                    Err(Error::Watch(WatchError::NoWatcher { path, kind }))
                }
            }
        }
    }
}

pub async fn client_for(server: &Arc<FakeServer>) -> WatchClient {
    WatchClient::builder(server.clone()).build().await.unwrap()
}

pub fn recording_watcher() -> (Subscriber, UnboundedReceiver<WatchedEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = Subscriber::from_fn(move |event: &WatchedEvent| {
        let _ = tx.send(event.clone());
    });
    (watcher, rx)
}

pub fn recording_sink() -> (
    impl Fn(&ClientEvent) + Send + Sync + 'static,
    UnboundedReceiver<ClientEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = move |event: &ClientEvent| {
        let _ = tx.send(event.clone());
    };
    (sink, rx)
}

pub async fn next_event<T>(rx: &mut UnboundedReceiver<T>) -> T {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("event not delivered in time")
        .expect("event channel closed")
}

pub async fn assert_quiet<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>) {
    if let Ok(Some(event)) = timeout(Duration::from_millis(50), rx.recv()).await {
        panic!("unexpected event: {event:?}");
    }
}
