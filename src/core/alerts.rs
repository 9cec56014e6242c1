//! # AlertTracker: threshold transitions, not levels.
//!
//! [`evaluate`](crate::evaluate) tags every reading; the tracker turns those
//! tags into notifications only when a sensor's state changes:
//!
//! ```text
//! None  ──► Below/Above   Warning  + AlertRaised
//! Below ──► Above (or ↔)  Warning  + AlertRaised
//! Below/Above ──► None    Info     + AlertCleared
//! same state              nothing
//! no reading              nothing (state kept)
//! older timestamp         nothing (state kept)
//! ```
//!
//! The periodic cycle and `notify_new_reading` feed the same tracker, so a
//! transition is reported once whichever path sees it first.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::events::{Bus, Event, EventKind};
use crate::messages::{AlertMessage, Severity};
use crate::sensors::{AlertState, Reading, SensorDescriptor};

struct Tracked {
    state: AlertState,
    at: DateTime<Utc>,
}

/// Last known [`AlertState`] per sensor.
pub struct AlertTracker {
    states: Mutex<HashMap<String, Tracked>>,
    bus: Bus,
}

impl AlertTracker {
    pub fn new(bus: Bus) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            bus,
        }
    }

    /// Records `state` for the descriptor's sensor.
    ///
    /// Returns an [`AlertMessage`] when the state differs from the last one seen.
    pub fn observe(
        &self,
        descriptor: &SensorDescriptor,
        reading: Option<&Reading>,
        state: AlertState,
    ) -> Option<AlertMessage> {
        let reading = reading?;
        let previous = {
            let mut states = self.states.lock();
            let tracked = states
                .entry(descriptor.sensor_id.clone())
                .or_insert(Tracked {
                    state: AlertState::None,
                    at: reading.timestamp,
                });
            if reading.timestamp < tracked.at {
                return None;
            }
            tracked.at = reading.timestamp;
            std::mem::replace(&mut tracked.state, state)
        };
        if previous == state {
            return None;
        }

        let id = descriptor.sensor_id.as_str();
        let (text, severity) = if state.is_alert() {
            self.bus.publish(
                Event::new(EventKind::AlertRaised)
                    .with_sensor(id)
                    .with_reason(state.as_str()),
            );
            (raised_text(descriptor, reading, state), Severity::Warning)
        } else {
            self.bus
                .publish(Event::new(EventKind::AlertCleared).with_sensor(id));
            (cleared_text(descriptor, reading), Severity::Info)
        };
        Some(AlertMessage::for_sensor(id, text, severity, reading.timestamp))
    }

    /// Current state of `sensor_id` (`None` if never observed).
    pub fn state(&self, sensor_id: &str) -> AlertState {
        self.states
            .lock()
            .get(sensor_id)
            .map(|t| t.state)
            .unwrap_or_default()
    }

    /// Forgets sensors that are no longer listed.
    pub fn retain(&self, active: &HashSet<&str>) {
        self.states
            .lock()
            .retain(|id, _| active.contains(id.as_str()));
    }
}

fn raised_text(d: &SensorDescriptor, r: &Reading, state: AlertState) -> String {
    let bound = match (state, d.alert_threshold) {
        (AlertState::Below, Some(t)) => format!(" (min {} {})", t.min, d.unit),
        (AlertState::Above, Some(t)) => format!(" (max {} {})", t.max, d.unit),
        _ => String::new(),
    };
    format!(
        "{} is {} its safe range: {} {}{}",
        d.display_name,
        state.as_str(),
        r.value,
        d.unit,
        bound
    )
}

fn cleared_text(d: &SensorDescriptor, r: &Reading) -> String {
    format!("{} is back in its safe range: {} {}", d.display_name, r.value, d.unit)
}
