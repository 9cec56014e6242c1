//! Static identity and configuration of one sensor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical quantity a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Power,
    Pressure,
    Other,
}

impl SensorKind {
    /// Returns the stable snake_case name (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Power => "power",
            SensorKind::Pressure => "pressure",
            SensorKind::Other => "other",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive safe range of a sensor.
///
/// Values equal to `min` or `max` are inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub min: f64,
    pub max: f64,
}

impl Threshold {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns `true` when `value` lies in `[min, max]`.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Identity and static configuration of one sensor.
///
/// Read-only to the fan-out core; `sensor_id` is unique and never changes once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDescriptor {
    pub sensor_id: String,
    pub display_name: String,
    pub kind: SensorKind,
    pub unit: String,
    pub location: String,
    pub alert_threshold: Option<Threshold>,
    pub is_active: bool,
}

impl SensorDescriptor {
    /// Creates an active sensor without threshold or location.
    ///
    /// # Example
    /// ```
    /// use sensorcast::{SensorDescriptor, SensorKind};
    ///
    /// let d = SensorDescriptor::new("TEMP_001", "Server room", SensorKind::Temperature, "°C")
    ///     .with_location("Rack A")
    ///     .with_threshold(18.0, 26.0);
    /// assert!(d.is_active);
    /// assert_eq!(d.alert_threshold.unwrap().max, 26.0);
    /// ```
    pub fn new(
        sensor_id: impl Into<String>,
        display_name: impl Into<String>,
        kind: SensorKind,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            display_name: display_name.into(),
            kind,
            unit: unit.into(),
            location: String::new(),
            alert_threshold: None,
            is_active: true,
        }
    }

    /// Returns a descriptor with the given safe range.
    pub fn with_threshold(mut self, min: f64, max: f64) -> Self {
        self.alert_threshold = Some(Threshold::new(min, max));
        self
    }

    /// Returns a descriptor with the given location label.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Returns a descriptor marked inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_bounds_are_inclusive() {
        let t = Threshold::new(18.0, 26.0);
        assert!(t.contains(18.0));
        assert!(t.contains(26.0));
        assert!(!t.contains(17.999));
        assert!(!t.contains(26.001));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&SensorKind::Temperature).unwrap();
        assert_eq!(json, "\"temperature\"");
        assert_eq!(SensorKind::Pressure.to_string(), "pressure");
    }
}
