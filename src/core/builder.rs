use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    alerts::AlertTracker, assembler::SnapshotAssembler, catalog::SensorCatalog,
    cycle::BroadcastCycle, dispatcher::FanoutDispatcher, fanout::Fanout,
    scheduler::BroadcastScheduler,
};
use crate::{
    config::Config,
    events::Bus,
    observers::{Observe, ObserverSet},
    store::ReadingStore,
    subscriptions::SubscriptionRegistry,
};

/// Builder for a [`Fanout`] with optional observers.
pub struct FanoutBuilder {
    cfg: Config,
    store: Arc<dyn ReadingStore>,
    observers: Vec<Arc<dyn Observe>>,
}

impl FanoutBuilder {
    /// Creates a builder reading from `store`.
    pub fn new(cfg: Config, store: Arc<dyn ReadingStore>) -> Self {
        Self {
            cfg,
            store,
            observers: Vec::new(),
        }
    }

    /// Sets runtime event observers.
    ///
    /// Observers receive events (cycles, read/delivery failures, alerts)
    /// through dedicated workers with bounded queues.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Wires every component and returns the façade.
    ///
    /// Must be called within a tokio runtime (spawns the observer workers).
    /// The scheduler is idle until [`Fanout::start`].
    pub fn build(self) -> Arc<Fanout> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();
        let observers = ObserverSet::new(self.observers);
        let listener = Fanout::observer_listener(&bus, observers, runtime_token.clone());

        let registry = Arc::new(
            SubscriptionRegistry::new(bus.clone(), self.cfg.delivery_queue_capacity)
                .with_drain_timeout(self.cfg.drain_limit()),
        );
        let dispatcher = Arc::new(FanoutDispatcher::new(registry.clone(), bus.clone()));
        let alerts = Arc::new(AlertTracker::new(bus.clone()));
        let catalog = Arc::new(SensorCatalog::default());

        let cycle = Arc::new(BroadcastCycle::new(
            SnapshotAssembler::new(self.store, &self.cfg, bus.clone()),
            dispatcher.clone(),
            alerts.clone(),
            catalog.clone(),
            registry.clone(),
            self.cfg.skip_when_idle,
            bus.clone(),
        ));
        let scheduler = BroadcastScheduler::new(cycle.clone(), bus.clone());

        Arc::new(Fanout::new_internal(
            self.cfg,
            bus,
            registry,
            dispatcher,
            alerts,
            catalog,
            cycle,
            scheduler,
            runtime_token,
            listener,
        ))
    }
}
