use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::Result;

/// What the session bridge does with local watches once the server session is lost
///
/// # Configuration Example
///
/// ```toml
/// [session]
/// recovery = "drop_all"
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Re-arm every registered watch on the new session
    #[default]
    ResubmitAll,
    /// Clear the registry and tell every subscriber its watch is gone
    DropAll,
}

impl RecoveryPolicy {
    pub(crate) fn as_label(self) -> &'static str {
        match self {
            RecoveryPolicy::ResubmitAll => "resubmit_all",
            RecoveryPolicy::DropAll => "drop_all",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// Session-expiry recovery policy
    ///
    /// **Default**: `resubmit_all`
    #[serde(default)]
    pub recovery: RecoveryPolicy,

    /// Retry policy for re-registering a single watch after expiry
    #[serde(default)]
    pub resubmit: BackoffPolicy,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.resubmit.validate("session.resubmit")
    }
}
