//! # FanoutDispatcher: one message, every matching subscriber.
//!
//! ```text
//! dispatch(msg)
//!     │   registry.snapshot()   (copy, lock released)
//!     ├──► sub A wants(msg.sensor_id)? ─► try_enqueue ─► [queue A] ─► worker A
//!     ├──► sub B wants(...)?           ─► Full   → DeliveryOverflow("full")
//!     └──► sub C wants(...)?           ─► Closed → DeliveryOverflow("closed")
//! ```
//!
//! ## Rules
//! - Snapshots reach `"*"` subscribers only.
//! - Sensor updates and sensor alerts reach `"*"` and that sensor's subscribers.
//! - Never blocks on a subscriber; never retries. The next cycle resends state.
//! - Per-subscriber FIFO comes from the subscriber's single queue and worker.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use crate::events::{Bus, Event};
use crate::messages::{AlertMessage, Message, SensorUpdateMessage, SnapshotMessage};
use crate::sensors::{AlertState, Reading, SensorDescriptor, Snapshot};
use crate::subscriptions::SubscriptionRegistry;

/// Delivers messages to the subscriptions matching their topic.
pub struct FanoutDispatcher {
    registry: Arc<SubscriptionRegistry>,
    bus: Bus,
}

impl FanoutDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>, bus: Bus) -> Self {
        Self { registry, bus }
    }

    /// Pushes a full snapshot to `"*"` subscribers.
    ///
    /// Returns the number of subscribers it was queued for.
    pub fn dispatch_snapshot(&self, snapshot: &Snapshot) -> usize {
        self.dispatch(SnapshotMessage::from(snapshot).into())
    }

    /// Pushes one fresh reading to `"*"` and `descriptor.sensor_id` subscribers.
    pub fn dispatch_sensor_update(
        &self,
        descriptor: &SensorDescriptor,
        reading: &Reading,
        alert: AlertState,
    ) -> usize {
        self.dispatch(SensorUpdateMessage::new(descriptor, reading, alert).into())
    }

    /// Pushes an alert to `"*"` subscribers, plus the sensor's subscribers if scoped.
    pub fn dispatch_alert(&self, alert: AlertMessage) -> usize {
        self.dispatch(alert.into())
    }

    /// Queues `message` for every subscription whose topics match it.
    pub fn dispatch(&self, message: Message) -> usize {
        let message = Arc::new(message);
        let sensor = message.sensor_id();
        let mut queued = 0;

        for sub in self.registry.snapshot() {
            if !sub.wants(sensor) {
                continue;
            }
            match sub.try_enqueue(Arc::clone(&message)) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(_)) => self
                    .bus
                    .publish(Event::delivery_overflow(sub.subscriber_id, "full")),
                Err(TrySendError::Closed(_)) => self
                    .bus
                    .publish(Event::delivery_overflow(sub.subscriber_id, "closed")),
            }
        }
        queued
    }
}
