//! One timestamped measurement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable measurement appended by a producer.
///
/// Timestamps are non-decreasing per sensor in practice, but nothing in the
/// core relies on the order in which a store returns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value,
            timestamp,
            metadata: None,
        }
    }

    /// Creates a reading stamped with the current wall-clock time.
    pub fn now(sensor_id: impl Into<String>, value: f64) -> Self {
        Self::new(sensor_id, value, Utc::now())
    }

    /// Attaches an opaque metadata blob.
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}
