//! # Reading store interface.
//!
//! The core never owns sensor or reading persistence; it only queries a
//! [`ReadingStore`]. The store is treated as externally synchronized.
//!
//! ```text
//! BroadcastScheduler ─► list_active_sensors() ─► SnapshotAssembler
//!                                                   └─► latest_reading(id) × N (bounded, concurrent)
//! ```
//!
//! [`MemoryStore`] is an in-process implementation for tests, demos, and
//! hosts without a database.

mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::sensors::{Reading, SensorDescriptor};

pub use memory::MemoryStore;

/// Query contract the fan-out core consumes.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use sensorcast::{Reading, ReadingStore, SensorDescriptor, StoreError};
///
/// struct Empty;
///
/// #[async_trait]
/// impl ReadingStore for Empty {
///     async fn latest_reading(&self, _sensor_id: &str) -> Result<Option<Reading>, StoreError> {
///         Ok(None)
///     }
///     async fn list_active_sensors(&self) -> Result<Vec<SensorDescriptor>, StoreError> {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[async_trait]
pub trait ReadingStore: Send + Sync + 'static {
    /// Most recent reading of `sensor_id`, or `None` if it never reported.
    async fn latest_reading(&self, sensor_id: &str) -> Result<Option<Reading>, StoreError>;

    /// Every active sensor, in a stable order.
    async fn list_active_sensors(&self) -> Result<Vec<SensorDescriptor>, StoreError>;
}
