//! # In-memory reading store.
//!
//! Keeps sensors in insertion order and readings per sensor as an append-only
//! log. "Latest" is the reading with the greatest timestamp, regardless of
//! the order readings were appended in.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::ReadingStore;
use crate::error::StoreError;
use crate::sensors::{Reading, SensorDescriptor};

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    sensors: HashMap<String, SensorDescriptor>,
    readings: HashMap<String, Vec<Reading>>,
}

/// Thread-safe in-process [`ReadingStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `sensors`.
    pub fn with_sensors(sensors: impl IntoIterator<Item = SensorDescriptor>) -> Self {
        let store = Self::new();
        for s in sensors {
            store.upsert_sensor(s);
        }
        store
    }

    /// Inserts a sensor or replaces its configuration.
    ///
    /// Position in the listing is fixed by the first insert.
    pub fn upsert_sensor(&self, descriptor: SensorDescriptor) {
        let mut inner = self.inner.write();
        if !inner.sensors.contains_key(&descriptor.sensor_id) {
            inner.order.push(descriptor.sensor_id.clone());
        }
        inner
            .sensors
            .insert(descriptor.sensor_id.clone(), descriptor);
    }

    /// Appends a reading; unknown sensors are rejected.
    pub fn append(&self, reading: Reading) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if !inner.sensors.contains_key(&reading.sensor_id) {
            return Err(StoreError::Backend(format!(
                "unknown sensor {:?}",
                reading.sensor_id
            )));
        }
        inner
            .readings
            .entry(reading.sensor_id.clone())
            .or_default()
            .push(reading);
        Ok(())
    }

    /// Returns the descriptor of `sensor_id`, active or not.
    pub fn sensor(&self, sensor_id: &str) -> Option<SensorDescriptor> {
        self.inner.read().sensors.get(sensor_id).cloned()
    }

    /// Readings of `sensor_id` with `from <= timestamp < to`, oldest first.
    pub fn readings_between(
        &self,
        sensor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Reading> {
        let inner = self.inner.read();
        let mut out: Vec<Reading> = inner
            .readings
            .get(sensor_id)
            .map(|rs| {
                rs.iter()
                    .filter(|r| r.timestamp >= from && r.timestamp < to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by_key(|r| r.timestamp);
        out
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn latest_reading(&self, sensor_id: &str) -> Result<Option<Reading>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .readings
            .get(sensor_id)
            .and_then(|rs| rs.iter().max_by_key(|r| r.timestamp))
            .cloned())
    }

    async fn list_active_sensors(&self) -> Result<Vec<SensorDescriptor>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.sensors.get(id))
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorKind;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::with_sensors([
            SensorDescriptor::new("TEMP_001", "Lab", SensorKind::Temperature, "°C"),
            SensorDescriptor::new("TEMP_002", "Hall", SensorKind::Temperature, "°C").inactive(),
            SensorDescriptor::new("PWR_001", "Main", SensorKind::Power, "W"),
        ])
    }

    #[tokio::test]
    async fn lists_only_active_sensors_in_insertion_order() {
        let s = store();
        let ids: Vec<String> = s
            .list_active_sensors()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.sensor_id)
            .collect();
        assert_eq!(ids, ["TEMP_001", "PWR_001"]);
    }

    #[tokio::test]
    async fn latest_is_by_timestamp_not_append_order() {
        let s = store();
        s.append(Reading::new("TEMP_001", 21.0, at(20))).unwrap();
        s.append(Reading::new("TEMP_001", 19.0, at(10))).unwrap();

        let latest = s.latest_reading("TEMP_001").await.unwrap().unwrap();
        assert_eq!(latest.value, 21.0);
        assert!(s.latest_reading("PWR_001").await.unwrap().is_none());
    }

    #[test]
    fn append_rejects_unknown_sensor() {
        let s = store();
        let err = s.append(Reading::now("NOPE", 1.0)).unwrap_err();
        assert_eq!(err.as_label(), "store_backend");
    }

    #[test]
    fn range_query_is_half_open_and_sorted() {
        let s = store();
        for (secs, v) in [(30, 3.0), (10, 1.0), (20, 2.0), (40, 4.0)] {
            s.append(Reading::new("PWR_001", v, at(secs))).unwrap();
        }
        let values: Vec<f64> = s
            .readings_between("PWR_001", at(10), at(40))
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn upsert_keeps_position() {
        let s = store();
        s.upsert_sensor(
            SensorDescriptor::new("TEMP_001", "Lab (moved)", SensorKind::Temperature, "°C"),
        );
        assert_eq!(s.sensor("TEMP_001").unwrap().display_name, "Lab (moved)");
        assert_eq!(s.inner.read().order.len(), 3);
    }
}
