//! # Fanout: the host-facing façade.
//!
//! The [`Fanout`] owns the event bus, the subscription registry, the broadcast
//! scheduler and the observer set. A host service maps its transport onto it:
//!
//! ```text
//! transport connect     ──► on_connect(id, deliver)   ──► SubscriptionHandle
//! transport "join"      ──► on_join_topic(handle, "*" | sensor_id)
//! transport "leave"     ──► on_leave_topic(handle, topic)
//! transport disconnect  ──► on_disconnect(handle)
//! producer wrote reading ──► notify_new_reading(sensor_id, reading)
//!                              ├─ catalog lookup (store on miss)
//!                              ├─ SensorUpdateMessage ─► "*" + sensor topic
//!                              └─ AlertTracker ─► AlertMessage on transition
//!
//! start(interval) ──► BroadcastScheduler ──tick──► BroadcastCycle
//!                                                   ├─ SnapshotAssembler ─► ReadingStore
//!                                                   └─ FanoutDispatcher  ─► per-subscriber queues
//!
//! Bus ──► observer listener ──► ObserverSet ──► LogWriter, CycleStats, ...
//! ```
//!
//! ## Shutdown
//! [`shutdown`](Fanout::shutdown) stops the scheduler (the in-flight cycle
//! completes), drains every subscriber queue, then drains the observers.
//! Queue draining is bounded by [`Config::drain_timeout`](crate::Config::drain_timeout);
//! connections attempted after shutdown fail with [`FanoutError::Stopped`].
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use sensorcast::{ChannelSink, Config, FanoutBuilder, LogWriter, MemoryStore, Observe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let fanout = FanoutBuilder::new(Config::default(), store)
//!         .with_observers(vec![Arc::new(LogWriter::new()) as Arc<dyn Observe>])
//!         .build();
//!
//!     let (sink, mut rx) = ChannelSink::new(64);
//!     let handle = fanout.on_connect("dashboard-1", sink)?;
//!     fanout.on_join_topic(&handle, "*")?;
//!     fanout.start(fanout.config().interval)?;
//!
//!     if let Some(msg) = rx.recv().await {
//!         println!("{}", msg.to_json()?);
//!     }
//!     fanout.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{
    alerts::AlertTracker,
    catalog::SensorCatalog,
    cycle::{BroadcastCycle, CycleOutcome},
    dispatcher::FanoutDispatcher,
    scheduler::{BroadcastScheduler, SchedulerState},
};
use crate::{
    config::Config,
    error::FanoutError,
    events::Bus,
    messages::AlertMessage,
    observers::ObserverSet,
    sensors::{Reading, SensorDescriptor, evaluate},
    subscriptions::{DeliverRef, SubscriptionHandle, SubscriptionRegistry},
};

/// Transport-agnostic sensor fan-out engine.
pub struct Fanout {
    cfg: Config,
    bus: Bus,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: Arc<FanoutDispatcher>,
    alerts: Arc<AlertTracker>,
    catalog: Arc<SensorCatalog>,
    cycle: Arc<BroadcastCycle>,
    scheduler: BroadcastScheduler,
    runtime_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Fanout {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        registry: Arc<SubscriptionRegistry>,
        dispatcher: Arc<FanoutDispatcher>,
        alerts: Arc<AlertTracker>,
        catalog: Arc<SensorCatalog>,
        cycle: Arc<BroadcastCycle>,
        scheduler: BroadcastScheduler,
        runtime_token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry,
            dispatcher,
            alerts,
            catalog,
            cycle,
            scheduler,
            runtime_token,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Forwards bus events to the observer set until the runtime token is cancelled.
    ///
    /// `recv` is polled first, so events already on the bus are emitted before exit.
    pub(super) fn observer_listener(
        bus: &Bus,
        observers: ObserverSet,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => observers.emit(ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "observer listener lagged, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            observers.shutdown().await;
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns a handle to the internal event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Starts periodic broadcasting. See [`BroadcastScheduler::start`].
    pub fn start(&self, interval: Duration) -> Result<(), FanoutError> {
        self.scheduler.start(interval)
    }

    /// Stops periodic broadcasting; the in-flight cycle completes. Idempotent.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Runs one cycle immediately, under the same no-overlap guard as the timer.
    pub async fn broadcast_now(&self) -> Result<CycleOutcome, FanoutError> {
        self.scheduler.broadcast_now().await
    }

    /// Registers an observer. It receives nothing until it joins a topic.
    ///
    /// Fails with [`FanoutError::Stopped`] after [`shutdown`](Self::shutdown).
    pub fn on_connect(
        &self,
        subscriber_id: impl Into<Arc<str>>,
        deliver: DeliverRef,
    ) -> Result<SubscriptionHandle, FanoutError> {
        self.registry.register(subscriber_id, deliver)
    }

    /// Joins `"*"` or a sensor id. Returns `Ok(false)` if already joined.
    pub fn on_join_topic(
        &self,
        handle: &SubscriptionHandle,
        topic: &str,
    ) -> Result<bool, FanoutError> {
        self.registry.join(handle, topic)
    }

    /// Leaves a topic. Returns `Ok(false)` if it was not joined.
    pub fn on_leave_topic(
        &self,
        handle: &SubscriptionHandle,
        topic: &str,
    ) -> Result<bool, FanoutError> {
        self.registry.leave(handle, topic)
    }

    /// Removes the observer. Safe to call more than once.
    pub fn on_disconnect(&self, handle: &SubscriptionHandle) -> bool {
        self.registry.unregister(handle)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Announces a reading the producer has just written to the store.
    ///
    /// With `immediate_dispatch`, pushes a sensor update to `"*"` and the
    /// sensor's subscribers, plus an alert if the sensor changed state.
    /// Returns the number of subscribers the update was queued for.
    pub async fn notify_new_reading(
        &self,
        sensor_id: &str,
        reading: Reading,
    ) -> Result<usize, FanoutError> {
        if reading.sensor_id != sensor_id {
            return Err(FanoutError::SensorMismatch {
                sensor: sensor_id.to_string(),
                reading: reading.sensor_id,
            });
        }
        let descriptor = self.resolve(sensor_id).await?;
        if !self.cfg.immediate_dispatch {
            return Ok(0);
        }

        let state = evaluate(&descriptor, Some(&reading));
        let queued = self
            .dispatcher
            .dispatch_sensor_update(&descriptor, &reading, state);
        if let Some(alert) = self.alerts.observe(&descriptor, Some(&reading), state) {
            self.dispatcher.dispatch_alert(alert);
        }
        Ok(queued)
    }

    /// Pushes a host-generated alert. Returns the number of recipients.
    pub fn dispatch_alert(&self, alert: AlertMessage) -> usize {
        self.dispatcher.dispatch_alert(alert)
    }

    /// Stops the scheduler, drains subscriber queues, then drains observers.
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.registry.close_all().await;
        self.runtime_token.cancel();

        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    async fn resolve(&self, sensor_id: &str) -> Result<SensorDescriptor, FanoutError> {
        let unknown = || FanoutError::UnknownSensor {
            sensor: sensor_id.to_string(),
        };
        if let Some(d) = self.catalog.get(sensor_id) {
            return Ok(d);
        }
        if self.catalog.is_known_miss(sensor_id) {
            return Err(unknown());
        }
        self.cycle.refresh_catalog().await?;
        match self.catalog.get(sensor_id) {
            Some(d) => Ok(d),
            None => {
                self.catalog.remember_miss(sensor_id);
                Err(unknown())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FanoutBuilder;
    use crate::error::{DeliveryError, StoreError};
    use crate::events::{Event, EventKind};
    use crate::messages::{Message, Severity};
    use crate::observers::{CycleStats, Observe};
    use crate::sensors::{AlertState, SensorKind};
    use crate::store::{MemoryStore, ReadingStore};
    use crate::subscriptions::{ChannelSink, DeliverFn};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{broadcast, mpsc};
    use tokio::time::{sleep, timeout};

    /// MemoryStore with a fixed delay per reading fetch and an optional listing outage.
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
        down: bool,
        listings: AtomicUsize,
    }

    impl SlowStore {
        fn new(inner: MemoryStore, delay: Duration) -> Self {
            Self {
                inner,
                delay,
                down: false,
                listings: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReadingStore for SlowStore {
        async fn latest_reading(&self, sensor_id: &str) -> Result<Option<Reading>, StoreError> {
            sleep(self.delay).await;
            self.inner.latest_reading(sensor_id).await
        }

        async fn list_active_sensors(&self) -> Result<Vec<SensorDescriptor>, StoreError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            self.inner.list_active_sensors().await
        }
    }

    fn temp(id: &str) -> SensorDescriptor {
        SensorDescriptor::new(id, id, SensorKind::Temperature, "°C").with_location("Lab")
    }

    fn fast_config() -> Config {
        Config {
            fetch_timeout: Duration::ZERO,
            ..Config::default()
        }
    }

    async fn next(rx: &mut mpsc::Receiver<Arc<Message>>) -> Arc<Message> {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("sink closed")
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn out_of_range_reading_is_tagged_in_snapshot() {
        let store = MemoryStore::with_sensors([
            temp("TEMP_001").with_threshold(18.0, 26.0),
            temp("TEMP_002"),
        ]);
        store.append(Reading::now("TEMP_001", 30.0)).unwrap();
        store.append(Reading::now("TEMP_002", 99.0)).unwrap();
        let fanout = FanoutBuilder::new(fast_config(), Arc::new(store)).build();

        let (sink, mut rx) = ChannelSink::new(16);
        let h = fanout.on_connect("ui", sink).unwrap();
        fanout.on_join_topic(&h, "*").unwrap();

        let outcome = fanout.broadcast_now().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Completed { entries: 2, recipients: 1 });

        let first = next(&mut rx).await;
        let Message::Snapshot(snap) = &*first else {
            panic!("expected snapshot first");
        };
        assert_eq!(snap.readings[0].sensor_id, "TEMP_001");
        assert_eq!(snap.readings[0].alert_state, AlertState::Above);
        assert_eq!(snap.readings[1].value, Some(99.0));
        assert_eq!(snap.readings[1].alert_state, AlertState::None);

        let second = next(&mut rx).await;
        let Message::Alert(alert) = &*second else {
            panic!("expected alert after snapshot");
        };
        assert_eq!(alert.sensor_id.as_deref(), Some("TEMP_001"));
        assert_eq!(alert.severity, Severity::Warning);

        fanout.shutdown().await;
    }

    #[tokio::test]
    async fn never_read_sensor_has_no_value_field() {
        let store = MemoryStore::with_sensors([temp("A"), temp("B"), temp("C")]);
        store.append(Reading::now("A", 1.0)).unwrap();
        store.append(Reading::now("C", 3.0)).unwrap();
        let fanout = FanoutBuilder::new(fast_config(), Arc::new(store)).build();

        let (sink, mut rx) = ChannelSink::new(16);
        fanout.on_join_topic(&fanout.on_connect("ui", sink).unwrap(), "*").unwrap();
        fanout.broadcast_now().await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&next(&mut rx).await.to_json().unwrap()).unwrap();
        let rows = json["readings"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["sensorId"], "B");
        assert!(rows[1].get("value").is_none());
        assert_eq!(rows[2]["value"], 3.0);

        fanout.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_cycle_lets_it_finish_once() {
        let inner = MemoryStore::with_sensors([temp("A")]);
        inner.append(Reading::now("A", 1.0)).unwrap();
        let store = Arc::new(SlowStore::new(inner, Duration::from_millis(500)));
        let fanout = FanoutBuilder::new(fast_config(), store.clone()).build();

        let (sink, mut rx) = ChannelSink::new(16);
        fanout.on_join_topic(&fanout.on_connect("ui", sink).unwrap(), "*").unwrap();

        fanout.start(Duration::from_secs(10)).unwrap();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(fanout.state(), SchedulerState::Running);

        fanout.stop().await;
        assert_eq!(fanout.state(), SchedulerState::Stopped);
        assert!(matches!(*next(&mut rx).await, Message::Snapshot(_)));

        sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err(), "no cycle may start after stop");
        assert_eq!(store.listings.load(Ordering::SeqCst), 1);

        assert!(matches!(
            fanout.start(Duration::from_secs(1)),
            Err(FanoutError::Stopped)
        ));
        assert!(matches!(fanout.broadcast_now().await, Err(FanoutError::Stopped)));
        fanout.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap() {
        let inner = MemoryStore::with_sensors([temp("A"), temp("B")]);
        let store = Arc::new(SlowStore::new(inner, Duration::from_millis(350)));
        let fanout = FanoutBuilder::new(fast_config(), store).build();
        let mut events = fanout.bus().subscribe();

        fanout.start(Duration::from_millis(100)).unwrap();
        assert!(matches!(
            fanout.start(Duration::from_millis(100)),
            Err(FanoutError::AlreadyStarted)
        ));
        sleep(Duration::from_secs(2)).await;
        fanout.stop().await;

        let (mut in_flight, mut peak, mut completed, mut skipped) = (0i32, 0i32, 0, 0);
        for ev in drain(&mut events) {
            match ev.kind {
                EventKind::CycleStarted => {
                    in_flight += 1;
                    peak = peak.max(in_flight);
                }
                EventKind::CycleCompleted => {
                    in_flight -= 1;
                    completed += 1;
                }
                EventKind::CycleSkipped => skipped += 1,
                _ => {}
            }
        }
        assert_eq!(peak, 1);
        assert_eq!(in_flight, 0);
        assert!(completed >= 2, "completed {completed}");
        assert!(skipped >= 2, "skipped {skipped}");
    }

    #[tokio::test]
    async fn store_outage_fails_cycle_but_not_scheduler() {
        let mut store = SlowStore::new(MemoryStore::new(), Duration::ZERO);
        store.down = true;
        let stats = Arc::new(CycleStats::new());
        let fanout = FanoutBuilder::new(fast_config(), Arc::new(store))
            .with_observers(vec![stats.clone() as Arc<dyn Observe>])
            .build();

        let err = fanout.broadcast_now().await.unwrap_err();
        assert_eq!(err.as_label(), "store_unavailable");
        assert_eq!(fanout.state(), SchedulerState::Idle);
        assert!(fanout.broadcast_now().await.is_err());

        fanout.shutdown().await;
        assert_eq!(stats.snapshot().failed, 2);
    }

    #[tokio::test]
    async fn idle_skip_is_opt_in() {
        let store = Arc::new(MemoryStore::with_sensors([temp("A")]));
        let cfg = Config {
            skip_when_idle: true,
            ..fast_config()
        };
        let lazy = FanoutBuilder::new(cfg, store.clone()).build();
        assert_eq!(lazy.broadcast_now().await.unwrap(), CycleOutcome::Idle);

        let eager = FanoutBuilder::new(fast_config(), store).build();
        assert_eq!(
            eager.broadcast_now().await.unwrap(),
            CycleOutcome::Completed { entries: 1, recipients: 0 }
        );
        lazy.shutdown().await;
        eager.shutdown().await;
    }

    #[tokio::test]
    async fn new_reading_reaches_sensor_and_global_topics() {
        let store = Arc::new(MemoryStore::with_sensors([
            temp("X").with_threshold(0.0, 10.0),
            temp("Y"),
        ]));
        let fanout = FanoutBuilder::new(fast_config(), store.clone()).build();

        let (x_sink, mut x_rx) = ChannelSink::new(16);
        let (y_sink, mut y_rx) = ChannelSink::new(16);
        fanout.on_join_topic(&fanout.on_connect("x", x_sink).unwrap(), "X").unwrap();
        fanout.on_join_topic(&fanout.on_connect("y", y_sink).unwrap(), "Y").unwrap();

        let reading = Reading::now("X", 12.5);
        store.append(reading.clone()).unwrap();
        assert_eq!(fanout.notify_new_reading("X", reading).await.unwrap(), 1);

        let msg = next(&mut x_rx).await;
        let Message::SensorUpdate(update) = &*msg else {
            panic!("expected sensor update");
        };
        assert_eq!(update.value, 12.5);
        assert_eq!(update.alert_state, AlertState::Above);
        assert!(matches!(*next(&mut x_rx).await, Message::Alert(_)));
        assert!(y_rx.try_recv().is_err());

        fanout.shutdown().await;
    }

    #[tokio::test]
    async fn notify_rejects_mismatched_and_unknown_sensors() {
        let store = Arc::new(MemoryStore::with_sensors([temp("X")]));
        let fanout = FanoutBuilder::new(fast_config(), store.clone()).build();

        let err = fanout
            .notify_new_reading("X", Reading::now("Y", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FanoutError::SensorMismatch { .. }));

        let err = fanout
            .notify_new_reading("Z", Reading::now("Z", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FanoutError::UnknownSensor { .. }));

        store.upsert_sensor(temp("Z"));
        fanout.broadcast_now().await.unwrap();
        assert_eq!(fanout.notify_new_reading("Z", Reading::now("Z", 1.0)).await.unwrap(), 0);

        fanout.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_sensor_lists_store_once_per_cycle() {
        let store = Arc::new(SlowStore::new(
            MemoryStore::with_sensors([temp("X")]),
            Duration::ZERO,
        ));
        let fanout = FanoutBuilder::new(fast_config(), store.clone()).build();

        for _ in 0..5 {
            let err = fanout
                .notify_new_reading("GHOST", Reading::now("GHOST", 1.0))
                .await
                .unwrap_err();
            assert!(matches!(err, FanoutError::UnknownSensor { .. }));
        }
        assert_eq!(store.listings.load(Ordering::SeqCst), 1);

        store.inner.upsert_sensor(temp("GHOST"));
        fanout.broadcast_now().await.unwrap();
        assert_eq!(store.listings.load(Ordering::SeqCst), 2);

        let sent = fanout
            .notify_new_reading("GHOST", Reading::now("GHOST", 2.0))
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert_eq!(store.listings.load(Ordering::SeqCst), 2);

        fanout.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_bounded_by_stalled_subscriber() {
        let store = MemoryStore::with_sensors([temp("A")]);
        store.append(Reading::now("A", 1.0)).unwrap();
        let cfg = Config {
            drain_timeout: Duration::from_millis(200),
            ..fast_config()
        };
        let fanout = FanoutBuilder::new(cfg, Arc::new(store)).build();
        let mut events = fanout.bus().subscribe();

        // Receiver held but never read: deliveries stall once the sink is full.
        let (sink, _rx) = ChannelSink::new(1);
        fanout.on_join_topic(&fanout.on_connect("stalled", sink).unwrap(), "*").unwrap();
        for _ in 0..3 {
            fanout.broadcast_now().await.unwrap();
        }

        timeout(Duration::from_secs(3), fanout.shutdown())
            .await
            .expect("shutdown must not wait on a stalled subscriber");

        let timed_out = drain(&mut events).into_iter().any(|e| {
            e.kind == EventKind::DeliveryFailed
                && e.subscriber.as_deref() == Some("stalled")
                && e.reason.as_deref() == Some("drain timeout")
        });
        assert!(timed_out);
        assert_eq!(fanout.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn connect_after_shutdown_is_rejected() {
        let fanout = FanoutBuilder::new(fast_config(), Arc::new(MemoryStore::new())).build();
        fanout.shutdown().await;

        let (sink, _rx) = ChannelSink::new(4);
        assert!(matches!(
            fanout.on_connect("late", sink),
            Err(FanoutError::Stopped)
        ));
        assert_eq!(fanout.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn failing_subscriber_keeps_its_registration() {
        let store = Arc::new(MemoryStore::with_sensors([temp("A")]));
        let fanout = FanoutBuilder::new(fast_config(), store).build();
        let mut events = fanout.bus().subscribe();

        let broken = DeliverFn::arc(|_m: Arc<Message>| async { Err::<(), _>(DeliveryError::Closed) });
        let (sink, mut rx) = ChannelSink::new(16);
        let a = fanout.on_connect("a", broken).unwrap();
        fanout.on_join_topic(&a, "*").unwrap();
        fanout.on_join_topic(&fanout.on_connect("b", sink).unwrap(), "*").unwrap();

        for _ in 0..3 {
            fanout.broadcast_now().await.unwrap();
        }
        for _ in 0..3 {
            assert!(matches!(*next(&mut rx).await, Message::Snapshot(_)));
        }
        assert_eq!(fanout.subscriber_count(), 2);

        fanout.shutdown().await;
        let failed = drain(&mut events)
            .into_iter()
            .filter(|e| e.kind == EventKind::DeliveryFailed)
            .count();
        assert_eq!(failed, 3);

        assert!(!fanout.on_disconnect(&a), "close_all already removed it");
    }
}
