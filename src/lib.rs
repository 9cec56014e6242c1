//! # sensorcast
//!
//! **Sensorcast** is a real-time sensor-reading fan-out core for Rust.
//!
//! It periodically samples the latest reading of every active sensor, tags
//! readings that leave their safe range, and pushes the result to any number
//! of subscribed observers. At most one broadcast is in flight at a time, and
//! one slow or broken observer never holds up the others. The crate is
//! transport-agnostic: a host maps its connections onto [`Fanout`] and supplies
//! a [`Deliver`] per observer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ReadingStore (host)                         Observers (host transport)
//!   ┌──────────────────────┐                    ┌──────┐ ┌──────┐ ┌──────┐
//!   │ list_active_sensors  │                    │ ws-1 │ │ ws-2 │ │ sse-7│
//!   │ latest_reading(id)   │                    └──▲───┘ └──▲───┘ └──▲───┘
//!   └──────────▲───────────┘                       │        │        │
//!              │                               worker 1  worker 2  worker N
//!              │                                  ▲        ▲        ▲
//! ┌────────────┴─────────────────────────────────────┴────────┴────────┴───┐
//! │  Fanout                                                                │
//! │  - BroadcastScheduler (timer, at-most-one cycle in flight)             │
//! │  - SnapshotAssembler  (bounded concurrent fetches, timeouts)           │
//! │  - AlertTracker       (threshold transitions)                          │
//! │  - FanoutDispatcher   (topic match, per-subscriber bounded queues)     │
//! │  - SubscriptionRegistry ("*" or sensor id topics per observer)         │
//! └───────────────────────────────────┬────────────────────────────────────┘
//!                                     │ publishes Events
//!                                     ▼
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                            │
//! │                  (capacity: Config::bus_capacity)                      │
//! └───────────────────────────────────┬────────────────────────────────────┘
//!                                     ▼
//!                          observer_listener ──► ObserverSet
//!                                              ┌─────┴─────┐
//!                                              ▼           ▼
//!                                          LogWriter   CycleStats
//! ```
//!
//! ### Broadcast cycle
//! ```text
//! tick ──► running? ── yes ──► CycleSkipped("running")
//!            │ no
//!            ▼
//!   list_active_sensors ── Err ──► CycleFailed (next tick retries)
//!            │ Ok
//!            ▼
//!   for each active sensor (≤ max_concurrent_fetches, ≤ fetch_timeout):
//!       latest_reading ── Err/timeout ──► absent + ReadFailed
//!            ▼
//!   evaluate thresholds ──► Snapshot (descriptor order)
//!            ▼
//!   SnapshotMessage ──► "*" subscribers
//!   AlertMessage    ──► "*" + sensor subscribers (on transitions only)
//!            ▼
//!   CycleCompleted
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Engine**        | Host façade: scheduler, subscriptions, new-reading push      | [`Fanout`], [`FanoutBuilder`]               |
//! | **Subscriptions** | Per-observer delivery capability and topic filter            | [`Deliver`], [`DeliverFn`], [`ChannelSink`] |
//! | **Storage**       | Source of sensor descriptors and readings                    | [`ReadingStore`], [`MemoryStore`]           |
//! | **Messages**      | Closed set of messages pushed to observers                   | [`Message`]                                 |
//! | **Observability** | Runtime events, logging and counters                         | [`Observe`], [`LogWriter`], [`CycleStats`]  |
//! | **Errors**        | Typed errors with stable labels                              | [`FanoutError`], [`StoreError`]             |
//! | **Configuration** | Centralized runtime settings, TOML loadable                  | [`Config`], [`LogConfig`]                   |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use sensorcast::{
//!     ChannelSink, Config, FanoutBuilder, Message, MemoryStore, Reading, SensorDescriptor,
//!     SensorKind,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::with_sensors([
//!         SensorDescriptor::new("TEMP_001", "Lab", SensorKind::Temperature, "°C")
//!             .with_threshold(18.0, 26.0),
//!     ]));
//!     store.append(Reading::now("TEMP_001", 30.0))?;
//!
//!     let fanout = FanoutBuilder::new(Config::default(), store).build();
//!     let (sink, mut rx) = ChannelSink::new(16);
//!     let handle = fanout.on_connect("dashboard", sink)?;
//!     fanout.on_join_topic(&handle, "*")?;
//!
//!     fanout.broadcast_now().await?;
//!     let first = rx.recv().await.expect("snapshot");
//!     assert!(matches!(*first, Message::Snapshot(_)));
//!
//!     fanout.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod logging;

pub mod events;
pub mod messages;
pub mod observers;
pub mod sensors;
pub mod store;
pub mod subscriptions;

// ---- Public re-exports ----

pub use config::{Config, LogConfig};
pub use core::{
    AlertTracker, BroadcastScheduler, CycleOutcome, Fanout, FanoutBuilder, FanoutDispatcher,
    SchedulerState, SnapshotAssembler, wait_for_shutdown_signal,
};
pub use error::{DeliveryError, FanoutError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use logging::init_tracing;
pub use messages::{AlertMessage, Message, SensorUpdateMessage, Severity, SnapshotMessage, SnapshotRow};
pub use observers::{CycleStats, LogWriter, Observe, ObserverSet, StatsSnapshot};
pub use sensors::{
    AlertState, Reading, SensorDescriptor, SensorKind, Snapshot, SnapshotEntry, Threshold, evaluate,
};
pub use store::{MemoryStore, ReadingStore};
pub use subscriptions::{
    ChannelSink, Deliver, DeliverFn, DeliverRef, Subscription, SubscriptionHandle,
    SubscriptionRegistry, Topic,
};
