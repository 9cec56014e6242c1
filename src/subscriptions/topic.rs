//! # Subscription topics.
//!
//! A topic is either the global feed `"*"` or one sensor id. Sensor ids are
//! validated before any registry state is touched:
//! - non-empty, at most [`MAX_TOPIC_LEN`] bytes
//! - only ASCII letters, digits, `_`, `-`, `.`, `:`

use std::fmt;
use std::str::FromStr;

use crate::error::FanoutError;

/// Longest accepted sensor topic.
pub const MAX_TOPIC_LEN: usize = 128;

/// Subscription filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every sensor, plus full snapshots.
    All,
    /// One sensor id.
    Sensor(String),
}

impl Topic {
    /// Wire form of [`Topic::All`].
    pub const ALL: &'static str = "*";

    /// Parses and validates a topic identifier.
    ///
    /// # Example
    /// ```
    /// use sensorcast::Topic;
    ///
    /// assert_eq!(Topic::parse("*").unwrap(), Topic::All);
    /// assert_eq!(Topic::parse("TEMP_001").unwrap(), Topic::Sensor("TEMP_001".into()));
    /// assert!(Topic::parse("temp 001").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Topic, FanoutError> {
        if raw == Self::ALL {
            return Ok(Topic::All);
        }
        let reject = |reason| FanoutError::InvalidTopic {
            topic: raw.to_string(),
            reason,
        };
        if raw.is_empty() {
            return Err(reject("empty"));
        }
        if raw.len() > MAX_TOPIC_LEN {
            return Err(reject("too long"));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':'))
        {
            return Err(reject("unsupported character"));
        }
        Ok(Topic::Sensor(raw.to_string()))
    }

    /// Returns `true` if a message scoped to `sensor` should reach this topic.
    ///
    /// Unscoped messages (`None`, i.e. snapshots) only match [`Topic::All`].
    #[inline]
    pub fn matches(&self, sensor: Option<&str>) -> bool {
        match self {
            Topic::All => true,
            Topic::Sensor(id) => sensor == Some(id.as_str()),
        }
    }
}

impl FromStr for Topic {
    type Err = FanoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::parse(s)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::All => f.write_str(Self::ALL),
            Topic::Sensor(id) => f.write_str(id),
        }
    }
}
