//! # SnapshotAssembler: latest reading per active sensor.
//!
//! ```text
//! descriptors ─► filter is_active ─► for each (bounded by semaphore, concurrent):
//!                                      timeout(latest_reading(id))
//!                                        ├─ Ok(Some(r)) → reading
//!                                        ├─ Ok(None)    → absent
//!                                        └─ Err/timeout → absent + ReadFailed
//!                                    ─► evaluate(descriptor, reading)
//!                                    ─► Snapshot (input order preserved)
//! ```
//!
//! Per-reading failures are soft. Only [`list_sensors`](SnapshotAssembler::list_sensors)
//! can fail a cycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::{sync::Semaphore, time};

use crate::config::Config;
use crate::error::StoreError;
use crate::events::{Bus, Event, EventKind};
use crate::sensors::{Reading, SensorDescriptor, Snapshot, SnapshotEntry, evaluate};
use crate::store::ReadingStore;

/// Builds [`Snapshot`]s from a [`ReadingStore`].
pub struct SnapshotAssembler {
    store: Arc<dyn ReadingStore>,
    limit: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
    bus: Bus,
}

impl SnapshotAssembler {
    pub fn new(store: Arc<dyn ReadingStore>, cfg: &Config, bus: Bus) -> Self {
        Self {
            store,
            limit: cfg.fetch_limit().map(|n| Arc::new(Semaphore::new(n))),
            timeout: cfg.store_timeout(),
            bus,
        }
    }

    /// Fetches the active sensor list (hard failure point of a cycle).
    pub async fn list_sensors(&self) -> Result<Vec<SensorDescriptor>, StoreError> {
        bounded(self.timeout, self.store.list_active_sensors()).await
    }

    /// Assembles one entry per active descriptor, in input order.
    ///
    /// Never fails: a sensor whose fetch fails is recorded with no reading.
    pub async fn assemble(&self, descriptors: &[SensorDescriptor]) -> Snapshot {
        let fetches = descriptors
            .iter()
            .filter(|d| d.is_active)
            .map(|d| async move {
                let reading = self.fetch(&d.sensor_id).await;
                SnapshotEntry {
                    alert: evaluate(d, reading.as_ref()),
                    descriptor: d.clone(),
                    reading,
                }
            });
        Snapshot::new(join_all(fetches).await)
    }

    async fn fetch(&self, sensor_id: &str) -> Option<Reading> {
        let _permit = match &self.limit {
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };
        match bounded(self.timeout, self.store.latest_reading(sensor_id)).await {
            Ok(reading) => reading,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::ReadFailed)
                        .with_sensor(sensor_id)
                        .with_reason(e.to_string()),
                );
                None
            }
        }
    }
}

/// Runs a store query under the optional fetch timeout.
async fn bounded<T>(
    timeout: Option<Duration>,
    query: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match timeout {
        Some(d) => time::timeout(d, query)
            .await
            .unwrap_or(Err(StoreError::Timeout { timeout: d })),
        None => query.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{AlertState, SensorKind};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose reads fail for ids in `broken`, sleep for ids in `slow`,
    /// and track peak concurrency.
    struct FlakyStore {
        sensors: Vec<SensorDescriptor>,
        broken: Vec<&'static str>,
        slow: Vec<&'static str>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FlakyStore {
        fn new(sensors: Vec<SensorDescriptor>) -> Self {
            Self {
                sensors,
                broken: Vec::new(),
                slow: Vec::new(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReadingStore for FlakyStore {
        async fn latest_reading(&self, sensor_id: &str) -> Result<Option<Reading>, StoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            time::sleep(Duration::from_millis(10)).await;
            if self.slow.contains(&sensor_id) {
                time::sleep(Duration::from_secs(60)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.broken.contains(&sensor_id) {
                return Err(StoreError::Unavailable("shard down".into()));
            }
            Ok(Some(Reading::now(sensor_id, 42.0)))
        }

        async fn list_active_sensors(&self) -> Result<Vec<SensorDescriptor>, StoreError> {
            Ok(self.sensors.clone())
        }
    }

    fn sensors(n: usize) -> Vec<SensorDescriptor> {
        (0..n)
            .map(|i| {
                SensorDescriptor::new(format!("S{i}"), format!("Sensor {i}"), SensorKind::Other, "u")
            })
            .collect()
    }

    fn ids(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .entries
            .iter()
            .map(|e| e.descriptor.sensor_id.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn every_fetch_failing_still_yields_full_snapshot() {
        let list = sensors(5);
        let mut store = FlakyStore::new(list.clone());
        store.broken = vec!["S0", "S1", "S2", "S3", "S4"];
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        let asm = SnapshotAssembler::new(Arc::new(store), &Config::default(), bus);

        let snap = asm.assemble(&list).await;

        assert_eq!(ids(&snap), ["S0", "S1", "S2", "S3", "S4"]);
        assert!(snap.entries.iter().all(|e| e.reading.is_none()));
        assert!(snap.entries.iter().all(|e| e.alert == AlertState::None));

        let failures = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| e.kind == EventKind::ReadFailed)
            .count();
        assert_eq!(failures, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out_as_absent() {
        let list = sensors(3);
        let mut store = FlakyStore::new(list.clone());
        store.slow = vec!["S1"];
        let cfg = Config {
            fetch_timeout: Duration::from_secs(2),
            ..Config::default()
        };
        let asm = SnapshotAssembler::new(Arc::new(store), &cfg, Bus::new(16));

        let snap = asm.assemble(&list).await;

        assert_eq!(ids(&snap), ["S0", "S1", "S2"]);
        assert!(snap.entries[0].reading.is_some());
        assert!(snap.entries[1].reading.is_none());
        assert!(snap.entries[2].reading.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_concurrency_is_bounded() {
        let list = sensors(20);
        let store = Arc::new(FlakyStore::new(list.clone()));
        let cfg = Config {
            max_concurrent_fetches: 4,
            ..Config::default()
        };
        let asm = SnapshotAssembler::new(store.clone(), &cfg, Bus::new(16));

        let snap = asm.assemble(&list).await;

        assert_eq!(snap.len(), 20);
        let peak = store.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {peak}");
        assert!(peak > 1, "fetches should overlap, peak {peak}");
    }

    #[tokio::test]
    async fn inactive_descriptors_are_skipped_and_order_kept() {
        let store = MemoryStore::with_sensors(sensors(3));
        store.append(Reading::now("S2", 1.0)).unwrap();
        let asm = SnapshotAssembler::new(Arc::new(store), &Config::default(), Bus::new(16));

        let mut list = sensors(3);
        list[1] = list[1].clone().inactive();
        let snap = asm.assemble(&list).await;

        assert_eq!(ids(&snap), ["S0", "S2"]);
        assert!(snap.entries[0].reading.is_none());
        assert_eq!(snap.entries[1].reading.as_ref().map(|r| r.value), Some(1.0));
    }
}
