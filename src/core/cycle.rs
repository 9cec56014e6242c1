//! # BroadcastCycle: one assemble-and-dispatch pass.
//!
//! ```text
//! [skip_when_idle && no subscribers] ─► CycleSkipped("idle")
//! CycleStarted
//!   list_sensors ──Err──► CycleFailed, return Err(StoreUnavailable)
//!   catalog.replace, alerts.retain
//!   assemble ─► dispatch_snapshot ─► alerts.observe ─► dispatch_alert (per transition)
//! CycleCompleted(entries, recipients, elapsed)
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Instant;

use super::{
    alerts::AlertTracker, assembler::SnapshotAssembler, catalog::SensorCatalog,
    dispatcher::FanoutDispatcher,
};
use crate::error::FanoutError;
use crate::events::{Bus, Event, EventKind};
use crate::sensors::SensorDescriptor;
use crate::subscriptions::SubscriptionRegistry;

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The snapshot was dispatched.
    Completed {
        /// Rows in the snapshot.
        entries: usize,
        /// Subscribers the snapshot was queued for.
        recipients: usize,
    },
    /// Nobody was subscribed and `skip_when_idle` is set.
    Idle,
    /// Another cycle was still running.
    Busy,
}

pub(crate) struct BroadcastCycle {
    assembler: SnapshotAssembler,
    dispatcher: Arc<FanoutDispatcher>,
    alerts: Arc<AlertTracker>,
    catalog: Arc<SensorCatalog>,
    registry: Arc<SubscriptionRegistry>,
    skip_when_idle: bool,
    bus: Bus,
}

impl BroadcastCycle {
    pub(crate) fn new(
        assembler: SnapshotAssembler,
        dispatcher: Arc<FanoutDispatcher>,
        alerts: Arc<AlertTracker>,
        catalog: Arc<SensorCatalog>,
        registry: Arc<SubscriptionRegistry>,
        skip_when_idle: bool,
        bus: Bus,
    ) -> Self {
        Self {
            assembler,
            dispatcher,
            alerts,
            catalog,
            registry,
            skip_when_idle,
            bus,
        }
    }

    pub(crate) async fn run(&self) -> Result<CycleOutcome, FanoutError> {
        if self.skip_when_idle && self.registry.is_empty() {
            self.bus
                .publish(Event::new(EventKind::CycleSkipped).with_reason("idle"));
            return Ok(CycleOutcome::Idle);
        }

        let started = Instant::now();
        self.bus.publish(Event::new(EventKind::CycleStarted));

        let descriptors = match self.assembler.list_sensors().await {
            Ok(list) => list,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::CycleFailed)
                        .with_reason(e.to_string())
                        .with_elapsed(started.elapsed()),
                );
                return Err(e.into());
            }
        };
        self.remember(&descriptors);

        let snapshot = self.assembler.assemble(&descriptors).await;
        let recipients = self.dispatcher.dispatch_snapshot(&snapshot);
        for entry in &snapshot.entries {
            if let Some(alert) =
                self.alerts
                    .observe(&entry.descriptor, entry.reading.as_ref(), entry.alert)
            {
                self.dispatcher.dispatch_alert(alert);
            }
        }

        self.bus.publish(
            Event::new(EventKind::CycleCompleted)
                .with_entries(snapshot.len())
                .with_recipients(recipients)
                .with_elapsed(started.elapsed()),
        );
        Ok(CycleOutcome::Completed {
            entries: snapshot.len(),
            recipients,
        })
    }

    /// Reloads the descriptor cache from the store, outside of a cycle.
    pub(crate) async fn refresh_catalog(&self) -> Result<(), FanoutError> {
        let descriptors = self.assembler.list_sensors().await?;
        self.remember(&descriptors);
        Ok(())
    }

    fn remember(&self, descriptors: &[SensorDescriptor]) {
        self.catalog.replace(descriptors);
        let active: HashSet<&str> = descriptors
            .iter()
            .filter(|d| d.is_active)
            .map(|d| d.sensor_id.as_str())
            .collect();
        self.alerts.retain(&active);
    }
}
