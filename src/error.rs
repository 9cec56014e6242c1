//! Error types used by the sensorcast runtime, its store and its subscribers.
//!
//! This module defines three error enums:
//!
//! - [`FanoutError`]: errors returned synchronously to the host service.
//! - [`StoreError`]: errors raised by a [`ReadingStore`](crate::ReadingStore).
//! - [`DeliveryError`]: errors raised by a single subscriber's delivery capability.
//!
//! All of them provide `as_label` for logging/metrics.
//!
//! ## Hard vs soft errors
//! ```text
//! StoreError from list_active_sensors()  ─► cycle aborted (hard), next tick retries
//! StoreError from latest_reading()       ─► entry recorded as absent (soft)
//! DeliveryError / panic in Deliver       ─► event published, loop continues (soft)
//! FanoutError::InvalidTopic              ─► returned to the caller, no state change
//! ```

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by the fan-out core to its host.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FanoutError {
    /// Join/Leave was called with a malformed topic identifier.
    #[error("invalid topic {topic:?}: {reason}")]
    InvalidTopic {
        /// The rejected topic as given by the caller.
        topic: String,
        /// Why the topic was rejected.
        reason: &'static str,
    },

    /// The handle does not belong to a live registration (unregistered or replaced).
    #[error("unknown or revoked subscription handle for {subscriber:?}")]
    UnknownHandle {
        /// Subscriber id carried by the handle.
        subscriber: String,
    },

    /// A reading was announced for a sensor the store does not list as active.
    #[error("unknown sensor {sensor:?}")]
    UnknownSensor {
        /// The sensor id that could not be resolved.
        sensor: String,
    },

    /// `notify_new_reading` was called with a reading owned by another sensor.
    #[error("reading belongs to {reading:?}, announced for {sensor:?}")]
    SensorMismatch {
        /// Sensor id the caller announced.
        sensor: String,
        /// Sensor id stored in the reading itself.
        reading: String,
    },

    /// The sensor list could not be obtained from the store.
    #[error("reading store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The scheduler was started twice.
    #[error("broadcast scheduler already started")]
    AlreadyStarted,

    /// The scheduler was stopped; it cannot be restarted.
    #[error("broadcast scheduler stopped")]
    Stopped,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The global tracing subscriber could not be installed.
    #[error("tracing init failed: {0}")]
    TracingInit(String),
}

impl FanoutError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use sensorcast::FanoutError;
    ///
    /// let err = FanoutError::InvalidTopic { topic: "".into(), reason: "empty" };
    /// assert_eq!(err.as_label(), "invalid_topic");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FanoutError::InvalidTopic { .. } => "invalid_topic",
            FanoutError::UnknownHandle { .. } => "unknown_handle",
            FanoutError::UnknownSensor { .. } => "unknown_sensor",
            FanoutError::SensorMismatch { .. } => "sensor_mismatch",
            FanoutError::StoreUnavailable(_) => "store_unavailable",
            FanoutError::AlreadyStarted => "scheduler_already_started",
            FanoutError::Stopped => "scheduler_stopped",
            FanoutError::Config(_) => "invalid_config",
            FanoutError::TracingInit(_) => "tracing_init",
        }
    }
}

/// # Errors produced by a reading store.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unreachable: {0}")]
    Unavailable(String),

    /// The query did not complete within the fetch timeout.
    #[error("query timed out after {timeout:?}")]
    Timeout {
        /// The fetch timeout that was exceeded.
        timeout: Duration,
    },

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "store_unreachable",
            StoreError::Timeout { .. } => "store_timeout",
            StoreError::Backend(_) => "store_backend",
        }
    }
}

/// # Errors produced by a subscriber's delivery capability.
///
/// Delivery errors are never propagated to other subscribers; the delivery
/// worker turns them into [`EventKind::DeliveryFailed`](crate::EventKind::DeliveryFailed).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The underlying transport is gone.
    #[error("transport closed")]
    Closed,

    /// The transport rejected or failed to write the message.
    #[error("delivery failed: {0}")]
    Failed(String),
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use sensorcast::DeliveryError;
    ///
    /// assert_eq!(DeliveryError::Closed.as_label(), "delivery_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Closed => "delivery_closed",
            DeliveryError::Failed(_) => "delivery_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_into_store_unavailable() {
        let err: FanoutError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(err.as_label(), "store_unavailable");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn timeout_message_carries_duration() {
        let err = StoreError::Timeout {
            timeout: Duration::from_secs(3),
        };
        assert_eq!(err.as_label(), "store_timeout");
        assert_eq!(err.to_string(), "query timed out after 3s");
    }
}
