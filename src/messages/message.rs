use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sensors::{AlertState, Reading, SensorDescriptor, SensorKind, Snapshot};

/// A message pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Snapshot(SnapshotMessage),
    SensorUpdate(SensorUpdateMessage),
    Alert(AlertMessage),
}

impl Message {
    /// Returns the sensor this message is scoped to.
    ///
    /// Snapshots and sensor-less alerts return `None` and only reach `"*"` subscribers.
    pub fn sensor_id(&self) -> Option<&str> {
        match self {
            Message::Snapshot(_) => None,
            Message::SensorUpdate(m) => Some(&m.sensor_id),
            Message::Alert(m) => m.sensor_id.as_deref(),
        }
    }

    /// Short stable name of the message kind (for logs/metrics).
    pub fn as_label(&self) -> &'static str {
        match self {
            Message::Snapshot(_) => "snapshot",
            Message::SensorUpdate(_) => "sensor_update",
            Message::Alert(_) => "alert",
        }
    }

    /// Serializes the message as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One sensor row of a [`SnapshotMessage`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    pub sensor_id: String,
    pub display_name: String,
    pub kind: SensorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub location: String,
    pub alert_state: AlertState,
}

/// Full per-cycle view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMessage {
    pub readings: Vec<SnapshotRow>,
}

impl From<&Snapshot> for SnapshotMessage {
    fn from(snapshot: &Snapshot) -> Self {
        let readings = snapshot
            .entries
            .iter()
            .map(|e| SnapshotRow {
                sensor_id: e.descriptor.sensor_id.clone(),
                display_name: e.descriptor.display_name.clone(),
                kind: e.descriptor.kind,
                value: e.reading.as_ref().map(|r| r.value),
                unit: e.descriptor.unit.clone(),
                timestamp: e.reading.as_ref().map(|r| r.timestamp),
                location: e.descriptor.location.clone(),
                alert_state: e.alert,
            })
            .collect();
        Self { readings }
    }
}

/// A single fresh reading, pushed outside the periodic cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorUpdateMessage {
    pub sensor_id: String,
    pub display_name: String,
    pub kind: SensorKind,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub alert_state: AlertState,
}

impl SensorUpdateMessage {
    pub fn new(descriptor: &SensorDescriptor, reading: &Reading, alert: AlertState) -> Self {
        Self {
            sensor_id: descriptor.sensor_id.clone(),
            display_name: descriptor.display_name.clone(),
            kind: descriptor.kind,
            value: reading.value,
            unit: descriptor.unit.clone(),
            timestamp: reading.timestamp,
            location: descriptor.location.clone(),
            alert_state: alert,
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A sensor returned to its safe range.
    Info,
    /// A sensor left its safe range.
    Warning,
}

/// Alert notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    /// Creates an alert that is not tied to a sensor (delivered to `"*"` only).
    pub fn global(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            sensor_id: None,
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    /// Creates an alert scoped to one sensor (delivered to `"*"` and that sensor's topic).
    pub fn for_sensor(
        sensor_id: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: Some(sensor_id.into()),
            message: message.into(),
            severity,
            timestamp,
        }
    }
}

impl From<SnapshotMessage> for Message {
    fn from(m: SnapshotMessage) -> Self {
        Message::Snapshot(m)
    }
}

impl From<SensorUpdateMessage> for Message {
    fn from(m: SensorUpdateMessage) -> Self {
        Message::SensorUpdate(m)
    }
}

impl From<AlertMessage> for Message {
    fn from(m: AlertMessage) -> Self {
        Message::Alert(m)
    }
}

/// Shared message handle queued to every matching subscriber.
pub(crate) type MessageRef = Arc<Message>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SnapshotEntry;

    #[test]
    fn absent_reading_omits_value_and_timestamp() {
        let d = SensorDescriptor::new("HUM_001", "Hall", SensorKind::Humidity, "%");
        let snapshot = Snapshot::new(vec![SnapshotEntry {
            descriptor: d,
            reading: None,
            alert: AlertState::None,
        }]);
        let msg = Message::from(SnapshotMessage::from(&snapshot));
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "snapshot");
        let row = &json["readings"][0];
        assert_eq!(row["sensorId"], "HUM_001");
        assert_eq!(row["alertState"], "none");
        assert!(row.get("value").is_none());
        assert!(row.get("timestamp").is_none());
    }

    #[test]
    fn scoped_sensor_id() {
        let d = SensorDescriptor::new("PWR_001", "Main", SensorKind::Power, "W");
        let update = Message::from(SensorUpdateMessage::new(
            &d,
            &Reading::now("PWR_001", 5.0),
            AlertState::None,
        ));
        assert_eq!(update.sensor_id(), Some("PWR_001"));
        assert_eq!(update.as_label(), "sensor_update");

        let alert = Message::from(AlertMessage::global("maintenance", Severity::Info));
        assert_eq!(alert.sensor_id(), None);
    }
}
