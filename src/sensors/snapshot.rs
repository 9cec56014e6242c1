//! Per-cycle view of every active sensor.

use super::{AlertState, Reading, SensorDescriptor};

/// One row of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub descriptor: SensorDescriptor,
    /// `None` when the sensor has no reading yet or its fetch failed.
    pub reading: Option<Reading>,
    pub alert: AlertState,
}

/// Ordered list of entries, one per active sensor, in descriptor order.
///
/// Built fresh on each cycle and discarded after dispatch. Entries are
/// fetched independently; they do not share a single instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries currently outside their safe range.
    pub fn alerts(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter().filter(|e| e.alert.is_alert())
    }

    /// Returns the entry for `sensor_id`, if present.
    pub fn get(&self, sensor_id: &str) -> Option<&SnapshotEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.sensor_id == sensor_id)
    }
}
