//! Watch bookkeeping and delivery
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────┐   register / unregister    ┌──────────────────┐
//! │ WatchClient  │ ─────────────────────────► │  WatchRegistry   │
//! │  (removal,   │                            │ path→kind→subs   │
//! │   session)   │                            │ (single mutex)   │
//! └──────┬───────┘                            └────────▲─────────┘
//!        │ confirmations                               │ take_triggered()
//!        ▼                                             │
//! ┌──────────────────┐    notifications    ┌───────────┴────────┐
//! │  Delivery queue  │ ◄────────────────── │  EventDispatcher   │ ◄── transport
//! └──────┬───────────┘                     └────────────────────┘
//!        ▼
//! ┌──────────────────┐
//! │  DispatchWorker  │ ──► Watcher / ClientListener / BackgroundCallback
//! └──────────────────┘
//! ```
//!
//! # Fire-once semantics
//!
//! The server forgets a watch once it fires. The dispatcher mirrors that by
//! removing the triggered entries from the registry before the event is
//! queued for delivery.
//!
//! # Subscribers
//!
//! - [`Subscriber::Default`] routes to every [`ClientListener`]
//! - [`Subscriber::Watcher`] / [`Subscriber::Fallible`] wrap an explicit callback

mod dispatcher;
mod event;
mod kind;
mod listener;
mod registry;
mod subscriber;

#[cfg(test)]
mod registry_test;

pub(crate) use dispatcher::*;
pub use event::*;
pub use kind::*;
pub use listener::*;
pub use registry::*;
pub use subscriber::*;
