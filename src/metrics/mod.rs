//! Prometheus counters for the watch subsystem
//!
//! Counters are always updated. Exposing them is left to the embedding
//! application via [`register_custom_metrics`].

use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref WATCHES_REGISTERED: IntCounterVec = IntCounterVec::new(
        Opts::new("watches_registered_total", "Watches armed after a server-accepted operation"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref WATCHES_TRIGGERED: IntCounterVec = IntCounterVec::new(
        Opts::new("watches_triggered_total", "Watch entries consumed by a server notification"),
        &["event_type"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_REMOVALS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_removals_total", "Watch removal requests by mode and outcome"),
        &["mode", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref SESSION_RECOVERIES: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_session_recoveries_total", "Session-expiry recoveries by policy"),
        &["policy"]
    )
    .expect("metric can not be created");
}

/// Register every watch metric with `registry`
pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(WATCHES_REGISTERED.clone()))?;
    registry.register(Box::new(WATCHES_TRIGGERED.clone()))?;
    registry.register(Box::new(WATCH_REMOVALS.clone()))?;
    registry.register(Box::new(SESSION_RECOVERIES.clone()))?;
    Ok(())
}

#[cfg(test)]
mod metrics_test;
