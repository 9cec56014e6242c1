//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish runtime events emitted by the scheduler, assembler, registry,
//! dispatcher and delivery workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `BroadcastScheduler`, `SnapshotAssembler`, `SubscriptionRegistry`,
//!   `FanoutDispatcher`, delivery workers, `AlertTracker`.
//! - **Consumers**: the observer listener in `Fanout` (fans out to `ObserverSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
