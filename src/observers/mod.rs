//! # Observers of runtime events.
//!
//! This module provides the [`Observe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler / Registry / Workers ── publish(Event) ──► Bus ──► observer_listener
//!                                                                    │
//!                                                              ObserverSet::emit
//!                                                        ┌───────────┼───────────┐
//!                                                        ▼           ▼           ▼
//!                                                    LogWriter   CycleStats    Custom
//! ```
//!
//! ## Observer types
//! - **Passive observers** - react to events (logging, alerting): [`LogWriter`]
//! - **Stateful observers** - aggregate events into state: [`CycleStats`]

mod log;
mod observer;
mod set;
mod stats;

pub use log::LogWriter;
pub use observer::Observe;
pub use set::ObserverSet;
pub use stats::{CycleStats, StatsSnapshot};
