//! # Sensor value types.
//!
//! This module groups the data model shared by the store, the assembler and
//! the dispatcher:
//! - [`SensorDescriptor`], [`SensorKind`], [`Threshold`] static sensor identity and config
//! - [`Reading`] one immutable timestamped measurement
//! - [`AlertState`] and [`evaluate`] threshold classification
//! - [`Snapshot`], [`SnapshotEntry`] the per-cycle view broadcast to subscribers

mod alert;
mod descriptor;
mod reading;
mod snapshot;

pub use alert::{AlertState, evaluate};
pub use descriptor::{SensorDescriptor, SensorKind, Threshold};
pub use reading::Reading;
pub use snapshot::{Snapshot, SnapshotEntry};
