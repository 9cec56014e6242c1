//! # Runtime events emitted by the fan-out core.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Scheduler events**: start/stop and per-cycle outcome
//! - **Assembly events**: soft read failures
//! - **Delivery events**: per-subscriber failures, panics and overflow
//! - **Registry and alert events**: subscriber lifecycle, threshold transitions
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use sensorcast::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReadFailed)
//!     .with_sensor("TEMP_001")
//!     .with_reason("store_timeout");
//!
//! assert_eq!(ev.kind, EventKind::ReadFailed);
//! assert_eq!(ev.sensor.as_deref(), Some("TEMP_001"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Scheduler events ===
    /// Scheduler started its timer.
    ///
    /// Sets: `elapsed_ms` (tick interval).
    SchedulerStarted,

    /// Scheduler stopped; no new cycle will start.
    SchedulerStopped,

    /// A broadcast cycle began.
    CycleStarted,

    /// A broadcast cycle dispatched its snapshot.
    ///
    /// Sets: `entries` (snapshot rows), `recipients`, `elapsed_ms`.
    CycleCompleted,

    /// A tick arrived while a cycle was still running (or nobody was subscribed).
    ///
    /// Sets: `reason` ("running" or "idle").
    CycleSkipped,

    /// The sensor list could not be obtained; the cycle ended without dispatch.
    ///
    /// Sets: `reason`.
    CycleFailed,

    // === Assembly events ===
    /// One sensor's latest reading could not be fetched; recorded as absent.
    ///
    /// Sets: `sensor`, `reason`.
    ReadFailed,

    // === Delivery events ===
    /// A subscriber's delivery returned an error, or its worker was aborted
    /// at the shutdown drain deadline (`reason = "drain timeout"`).
    ///
    /// Sets: `subscriber`, `reason`.
    DeliveryFailed,

    /// A subscriber's delivery panicked.
    ///
    /// Sets: `subscriber`, `reason` (panic message).
    DeliveryPanicked,

    /// A message was dropped for one subscriber (queue full or worker gone).
    ///
    /// Sets: `subscriber`, `reason` ("full" or "closed").
    DeliveryOverflow,

    // === Registry events ===
    /// A subscriber registered.
    SubscriberRegistered,

    /// A subscriber re-registered; its previous handle is revoked.
    SubscriberReplaced,

    /// A subscriber was removed.
    SubscriberUnregistered,

    // === Alert events ===
    /// A sensor left its safe range.
    ///
    /// Sets: `sensor`, `reason` ("below" or "above").
    AlertRaised,

    /// A sensor returned to its safe range.
    ///
    /// Sets: `sensor`.
    AlertCleared,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Human-readable reason (errors, skip cause, etc.).
    pub reason: Option<Arc<str>>,
    /// Sensor id, if applicable.
    pub sensor: Option<Arc<str>>,
    /// Subscriber id, if applicable.
    pub subscriber: Option<Arc<str>>,
    /// Number of snapshot entries.
    pub entries: Option<u32>,
    /// Number of subscribers a message was queued for.
    pub recipients: Option<u32>,
    /// Duration in milliseconds (cycle time or interval).
    pub elapsed_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            reason: None,
            sensor: None,
            subscriber: None,
            entries: None,
            recipients: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a sensor id.
    #[inline]
    pub fn with_sensor(mut self, sensor: impl Into<Arc<str>>) -> Self {
        self.sensor = Some(sensor.into());
        self
    }

    /// Attaches a subscriber id.
    #[inline]
    pub fn with_subscriber(mut self, subscriber: impl Into<Arc<str>>) -> Self {
        self.subscriber = Some(subscriber.into());
        self
    }

    /// Attaches a snapshot size.
    #[inline]
    pub fn with_entries(mut self, n: usize) -> Self {
        self.entries = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a recipient count.
    #[inline]
    pub fn with_recipients(mut self, n: usize) -> Self {
        self.recipients = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a delivery overflow event.
    #[inline]
    pub fn delivery_overflow(subscriber: Arc<str>, reason: &'static str) -> Self {
        Event::new(EventKind::DeliveryOverflow)
            .with_subscriber(subscriber)
            .with_reason(reason)
    }

    /// Creates a delivery panic event.
    #[inline]
    pub fn delivery_panicked(subscriber: Arc<str>, info: String) -> Self {
        Event::new(EventKind::DeliveryPanicked)
            .with_subscriber(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_delivery_problem(&self) -> bool {
        matches!(
            self.kind,
            EventKind::DeliveryFailed | EventKind::DeliveryPanicked | EventKind::DeliveryOverflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::CycleStarted);
        let b = Event::new(EventKind::CycleCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn elapsed_saturates() {
        let ev = Event::new(EventKind::CycleCompleted).with_elapsed(Duration::from_secs(u64::MAX));
        assert_eq!(ev.elapsed_ms, Some(u32::MAX));
    }
}
