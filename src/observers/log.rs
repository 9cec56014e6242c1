//! # LogWriter: events as `tracing` records
//!
//! Maps each [`Event`] to one structured `tracing` record. Routine cycle
//! events go to `debug`, soft failures to `warn`, aborted cycles to `error`.
//!
//! ## Example output (fmt layer)
//! ```text
//! DEBUG sensorcast: cycle completed entries=3 recipients=2 elapsed_ms=4
//!  WARN sensorcast: sensor read failed, recorded as absent sensor="TEMP_002" reason="store_timeout"
//!  WARN sensorcast: delivery failed subscriber="ws-17" reason="transport closed"
//! ERROR sensorcast: broadcast cycle failed reason="store unreachable: refused"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Event writer observer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let sensor = e.sensor.as_deref().unwrap_or("");
        let subscriber = e.subscriber.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::SchedulerStarted => {
                tracing::info!(target: "sensorcast", interval_ms = ?e.elapsed_ms, "broadcast scheduler started");
            }
            EventKind::SchedulerStopped => {
                tracing::info!(target: "sensorcast", "broadcast scheduler stopped");
            }
            EventKind::CycleStarted => {
                tracing::trace!(target: "sensorcast", seq = e.seq, "cycle started");
            }
            EventKind::CycleCompleted => {
                tracing::debug!(
                    target: "sensorcast",
                    entries = ?e.entries,
                    recipients = ?e.recipients,
                    elapsed_ms = ?e.elapsed_ms,
                    "cycle completed"
                );
            }
            EventKind::CycleSkipped => {
                tracing::debug!(target: "sensorcast", reason, "cycle skipped");
            }
            EventKind::CycleFailed => {
                tracing::error!(target: "sensorcast", reason, "broadcast cycle failed");
            }
            EventKind::ReadFailed => {
                tracing::warn!(target: "sensorcast", sensor, reason, "sensor read failed, recorded as absent");
            }
            EventKind::DeliveryFailed => {
                tracing::warn!(target: "sensorcast", subscriber, reason, "delivery failed");
            }
            EventKind::DeliveryPanicked => {
                tracing::error!(target: "sensorcast", subscriber, reason, "delivery panicked");
            }
            EventKind::DeliveryOverflow => {
                tracing::warn!(target: "sensorcast", subscriber, reason, "message dropped for subscriber");
            }
            EventKind::SubscriberRegistered => {
                tracing::debug!(target: "sensorcast", subscriber, "subscriber registered");
            }
            EventKind::SubscriberReplaced => {
                tracing::info!(target: "sensorcast", subscriber, "subscriber re-registered, old handle revoked");
            }
            EventKind::SubscriberUnregistered => {
                tracing::debug!(target: "sensorcast", subscriber, "subscriber unregistered");
            }
            EventKind::AlertRaised => {
                tracing::warn!(target: "sensorcast", sensor, state = reason, "threshold alert raised");
            }
            EventKind::AlertCleared => {
                tracing::info!(target: "sensorcast", sensor, "threshold alert cleared");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
