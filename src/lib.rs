//! # coord-watch
//!
//! Client-side watch management for a coordination service.
//!
//! The crate keeps track of which local subscriber is attached to which path
//! and watch kind, delivers server notifications to the right subscriber and
//! removes watches safely while notifications, removal round-trips and
//! session loss race each other.
//!
//! - [`WatchClient`] - Entry point combining registry, dispatcher and removal
//! - [`WatchRegistry`] - Client-side `(path, kind) -> subscribers` map
//! - [`WatchTransport`] - Seam to the session/transport layer
//! - [`WatchClientConfig`] - Hierarchical configuration
//!
//! ```ignore
//! let client = WatchClient::builder(transport).build().await?;
//!
//! let watcher = Subscriber::from_fn(|event: &WatchedEvent| println!("{:?}", event));
//! client.check_exists().using_watcher(watcher.clone()).for_path("/app/leader").await?;
//!
//! client
//!     .watches()
//!     .remove(watcher)
//!     .of_kind(WatchKind::Data)
//!     .quietly()
//!     .for_path("/app/leader")
//!     .await?;
//! ```

mod client;
mod config;
mod errors;
pub mod metrics;
mod transport;
pub mod utils;
mod watch;

pub use crate::config::*;
pub use client::*;
pub use errors::*;
pub use transport::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
