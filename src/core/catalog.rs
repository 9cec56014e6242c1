//! Descriptor cache used to resolve `notify_new_reading` without a store round trip.
//!
//! Ids that were still missing after a refresh are remembered until the next
//! replacement, so a producer repeating an unknown id costs one listing per
//! cycle at most.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::sensors::SensorDescriptor;

/// Remembered misses beyond this are forgotten all at once.
const MAX_MISSES: usize = 1024;

#[derive(Default)]
struct Inner {
    sensors: HashMap<String, SensorDescriptor>,
    misses: HashSet<String>,
}

/// Active sensors by id, replaced wholesale on every successful listing.
#[derive(Default)]
pub(crate) struct SensorCatalog {
    inner: RwLock<Inner>,
}

impl SensorCatalog {
    pub(crate) fn replace(&self, descriptors: &[SensorDescriptor]) {
        let fresh = descriptors
            .iter()
            .filter(|d| d.is_active)
            .map(|d| (d.sensor_id.clone(), d.clone()))
            .collect();
        let mut inner = self.inner.write();
        inner.sensors = fresh;
        inner.misses.clear();
    }

    pub(crate) fn get(&self, sensor_id: &str) -> Option<SensorDescriptor> {
        self.inner.read().sensors.get(sensor_id).cloned()
    }

    /// `true` if `sensor_id` was unresolvable since the last replacement.
    pub(crate) fn is_known_miss(&self, sensor_id: &str) -> bool {
        self.inner.read().misses.contains(sensor_id)
    }

    pub(crate) fn remember_miss(&self, sensor_id: &str) {
        let mut inner = self.inner.write();
        if inner.sensors.contains_key(sensor_id) {
            return;
        }
        if inner.misses.len() >= MAX_MISSES {
            inner.misses.clear();
        }
        inner.misses.insert(sensor_id.to_string());
    }
}
