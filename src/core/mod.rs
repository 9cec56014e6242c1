//! Fan-out core: assembly, dispatch, scheduling and the host façade.
//!
//! The only entry point most hosts need is [`Fanout`], built with [`FanoutBuilder`].
//!
//! Internal modules:
//! - [`assembler`]: latest reading per active sensor, bounded and time-limited;
//! - [`dispatcher`]: topic matching and per-subscriber enqueue;
//! - [`alerts`]: threshold transitions into alert messages;
//! - [`cycle`]: one assemble-and-dispatch pass;
//! - [`scheduler`]: periodic timer with at-most-one cycle in flight;
//! - [`fanout`]: the host-facing façade;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod alerts;
mod assembler;
mod builder;
mod catalog;
mod cycle;
mod dispatcher;
mod fanout;
mod scheduler;
mod shutdown;

pub use alerts::AlertTracker;
pub use assembler::SnapshotAssembler;
pub use builder::FanoutBuilder;
pub use cycle::CycleOutcome;
pub use dispatcher::FanoutDispatcher;
pub use fanout::Fanout;
pub use scheduler::{BroadcastScheduler, SchedulerState};
pub use shutdown::wait_for_shutdown_signal;
