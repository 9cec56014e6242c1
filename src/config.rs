//! # Runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the fan-out runtime, and
//! [`LogConfig`] for [`init_tracing`](crate::init_tracing).
//!
//! ## Sentinel values
//! - `max_concurrent_fetches = 0` → unlimited (no fetch semaphore created)
//! - `fetch_timeout = 0s` → no timeout on store queries
//! - `drain_timeout = 0s` → wait for every subscriber queue on shutdown
//!
//! ## TOML
//! Every key is optional; missing keys keep their [`Default`] value.
//! ```toml
//! interval_ms = 5000
//! fetch_timeout_ms = 3000
//! drain_timeout_ms = 5000
//! max_concurrent_fetches = 8
//! bus_capacity = 1024
//! delivery_queue_capacity = 256
//! immediate_dispatch = true
//! skip_when_idle = false
//!
//! [log]
//! level = "info"
//! json = false
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::FanoutError;

/// Global configuration for the fan-out runtime.
///
/// ## Field semantics
/// - `interval`: Period of the broadcast scheduler
/// - `fetch_timeout`: Per-query store timeout (`0s` = none)
/// - `max_concurrent_fetches`: Parallel `latest_reading` queries per cycle (`0` = unlimited)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `delivery_queue_capacity`: Default per-subscriber queue size (min 1)
/// - `drain_timeout`: Shutdown budget for draining subscriber queues (`0s` = none)
/// - `immediate_dispatch`: Push a sensor update as soon as a reading is announced
/// - `skip_when_idle`: Skip snapshot assembly while nobody is subscribed
#[derive(Clone, Debug)]
pub struct Config {
    /// Period between two broadcast ticks.
    pub interval: Duration,

    /// Timeout applied to each store query.
    ///
    /// A timed out `latest_reading` is recorded as absent; a timed out
    /// `list_active_sensors` fails the cycle.
    pub fetch_timeout: Duration,

    /// Maximum number of `latest_reading` queries in flight during one cycle.
    pub max_concurrent_fetches: usize,

    /// Capacity of the internal event bus broadcast channel.
    pub bus_capacity: usize,

    /// Queue size for subscribers that do not declare their own.
    pub delivery_queue_capacity: usize,

    /// How long shutdown waits for subscriber queues to drain.
    ///
    /// Workers still delivering after this are aborted.
    pub drain_timeout: Duration,

    /// Dispatch a [`SensorUpdateMessage`](crate::SensorUpdateMessage) from
    /// `notify_new_reading` without waiting for the next cycle.
    pub immediate_dispatch: bool,

    /// Skip the periodic cycle entirely when no subscription exists.
    pub skip_when_idle: bool,
}

impl Config {
    /// Returns the fetch concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` queries in flight
    #[inline]
    pub fn fetch_limit(&self) -> Option<usize> {
        if self.max_concurrent_fetches == 0 {
            None
        } else {
            Some(self.max_concurrent_fetches)
        }
    }

    /// Returns the store query timeout as an `Option`.
    #[inline]
    pub fn store_timeout(&self) -> Option<Duration> {
        if self.fetch_timeout == Duration::ZERO {
            None
        } else {
            Some(self.fetch_timeout)
        }
    }

    /// Returns the shutdown drain budget as an `Option`.
    #[inline]
    pub fn drain_limit(&self) -> Option<Duration> {
        if self.drain_timeout == Duration::ZERO {
            None
        } else {
            Some(self.drain_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Parses a configuration from TOML, keeping defaults for missing keys.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use sensorcast::Config;
    ///
    /// let (cfg, log) = Config::from_toml_str("interval_ms = 250\n[log]\nlevel = \"debug\"").unwrap();
    /// assert_eq!(cfg.interval, Duration::from_millis(250));
    /// assert_eq!(log.level, "debug");
    /// ```
    pub fn from_toml_str(raw: &str) -> Result<(Config, LogConfig), FanoutError> {
        let file: ConfigFile =
            toml::from_str(raw).map_err(|e| FanoutError::Config(e.to_string()))?;
        Ok(file.into_parts())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `interval = 5s`
    /// - `fetch_timeout = 3s`
    /// - `max_concurrent_fetches = 8`
    /// - `bus_capacity = 1024`
    /// - `delivery_queue_capacity = 256`
    /// - `drain_timeout = 5s`
    /// - `immediate_dispatch = true`
    /// - `skip_when_idle = false` (broadcast unconditionally)
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(3),
            max_concurrent_fetches: 8,
            bus_capacity: 1024,
            delivery_queue_capacity: 256,
            drain_timeout: Duration::from_secs(5),
            immediate_dispatch: true,
            skip_when_idle: false,
        }
    }
}

/// Tracing output settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// On-disk shape of the configuration (durations in milliseconds).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    interval_ms: Option<u64>,
    fetch_timeout_ms: Option<u64>,
    max_concurrent_fetches: Option<usize>,
    bus_capacity: Option<usize>,
    delivery_queue_capacity: Option<usize>,
    drain_timeout_ms: Option<u64>,
    immediate_dispatch: Option<bool>,
    skip_when_idle: Option<bool>,
    log: LogConfig,
}

impl ConfigFile {
    fn into_parts(self) -> (Config, LogConfig) {
        let d = Config::default();
        let cfg = Config {
            interval: self.interval_ms.map(Duration::from_millis).unwrap_or(d.interval),
            fetch_timeout: self
                .fetch_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(d.fetch_timeout),
            max_concurrent_fetches: self
                .max_concurrent_fetches
                .unwrap_or(d.max_concurrent_fetches),
            bus_capacity: self.bus_capacity.unwrap_or(d.bus_capacity),
            delivery_queue_capacity: self
                .delivery_queue_capacity
                .unwrap_or(d.delivery_queue_capacity),
            drain_timeout: self
                .drain_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(d.drain_timeout),
            immediate_dispatch: self.immediate_dispatch.unwrap_or(d.immediate_dispatch),
            skip_when_idle: self.skip_when_idle.unwrap_or(d.skip_when_idle),
        };
        (cfg, self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_keeps_defaults() {
        let (cfg, log) = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(5));
        assert_eq!(cfg.fetch_limit(), Some(8));
        assert!(cfg.immediate_dispatch);
        assert!(!cfg.skip_when_idle);
        assert_eq!(log.level, "info");
        assert!(!log.json);
    }

    #[test]
    fn zero_sentinels_disable_limits() {
        let (cfg, _) =
            Config::from_toml_str("fetch_timeout_ms = 0\nmax_concurrent_fetches = 0\ndrain_timeout_ms = 0")
                .unwrap();
        assert_eq!(cfg.store_timeout(), None);
        assert_eq!(cfg.drain_limit(), None);
        assert_eq!(cfg.fetch_limit(), None);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = Config::from_toml_str("intervall_ms = 10").unwrap_err();
        assert_eq!(err.as_label(), "invalid_config");
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
