//! # Threshold evaluation.
//!
//! [`evaluate`] is a pure, total function:
//! ```text
//! no threshold         → None
//! no reading           → None
//! value <  min         → Below
//! value >  max         → Above
//! min <= value <= max  → None   (boundaries are not alerts)
//! ```

use serde::{Deserialize, Serialize};

use super::{Reading, SensorDescriptor};

/// Derived alert classification of one reading. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    #[default]
    None,
    Below,
    Above,
}

impl AlertState {
    /// Returns `true` for [`AlertState::Below`] and [`AlertState::Above`].
    #[inline]
    pub fn is_alert(&self) -> bool {
        !matches!(self, AlertState::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::None => "none",
            AlertState::Below => "below",
            AlertState::Above => "above",
        }
    }
}

/// Classifies `reading` against the descriptor's safe range.
///
/// # Example
/// ```
/// use sensorcast::{AlertState, Reading, SensorDescriptor, SensorKind, evaluate};
///
/// let d = SensorDescriptor::new("TEMP_001", "Lab", SensorKind::Temperature, "°C")
///     .with_threshold(18.0, 26.0);
/// assert_eq!(evaluate(&d, Some(&Reading::now("TEMP_001", 30.0))), AlertState::Above);
/// assert_eq!(evaluate(&d, Some(&Reading::now("TEMP_001", 26.0))), AlertState::None);
/// assert_eq!(evaluate(&d, None), AlertState::None);
/// ```
pub fn evaluate(descriptor: &SensorDescriptor, reading: Option<&Reading>) -> AlertState {
    let (Some(threshold), Some(reading)) = (descriptor.alert_threshold, reading) else {
        return AlertState::None;
    };
    if reading.value < threshold.min {
        AlertState::Below
    } else if reading.value > threshold.max {
        AlertState::Above
    } else {
        AlertState::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorKind;

    fn sensor(threshold: Option<(f64, f64)>) -> SensorDescriptor {
        let d = SensorDescriptor::new("S", "S", SensorKind::Other, "u");
        match threshold {
            Some((min, max)) => d.with_threshold(min, max),
            None => d,
        }
    }

    #[test]
    fn classifies_against_strict_bounds() {
        let d = sensor(Some((18.0, 26.0)));
        let cases = [
            (-40.0, AlertState::Below),
            (17.9, AlertState::Below),
            (18.0, AlertState::None),
            (22.0, AlertState::None),
            (26.0, AlertState::None),
            (26.1, AlertState::Above),
            (1e9, AlertState::Above),
        ];
        for (value, expected) in cases {
            let r = Reading::now("S", value);
            assert_eq!(evaluate(&d, Some(&r)), expected, "value {value}");
        }
    }

    #[test]
    fn without_threshold_never_alerts() {
        let d = sensor(None);
        for value in [-1e9, 0.0, 1e9] {
            assert_eq!(evaluate(&d, Some(&Reading::now("S", value))), AlertState::None);
        }
    }

    #[test]
    fn nan_is_not_an_alert() {
        let d = sensor(Some((0.0, 1.0)));
        assert_eq!(evaluate(&d, Some(&Reading::now("S", f64::NAN))), AlertState::None);
    }
}
