use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Queue sizing for the delivery and background-removal workers
///
/// # Configuration Example
///
/// ```toml
/// [dispatch]
/// event_queue_size = 1024
/// background_queue_size = 256
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Capacity of the delivery queue feeding the dispatch worker
    ///
    /// Producers wait when the queue is full; events are never dropped.
    ///
    /// **Default**: 1024
    #[serde(default = "default_event_queue_size")]
    pub event_queue_size: usize,

    /// Capacity of the queue of pending background removals
    ///
    /// **Default**: 256
    #[serde(default = "default_background_queue_size")]
    pub background_queue_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            event_queue_size: default_event_queue_size(),
            background_queue_size: default_background_queue_size(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatch.event_queue_size must be greater than 0".into(),
            )));
        }

        if self.event_queue_size > 100_000 {
            warn!(
                "dispatch.event_queue_size ({}) is very large and may consume significant memory",
                self.event_queue_size
            );
        }

        if self.background_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatch.background_queue_size must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

const fn default_event_queue_size() -> usize {
    1024
}

const fn default_background_queue_size() -> usize {
    256
}
