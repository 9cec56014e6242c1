//! # Messages delivered to subscribers.
//!
//! [`Message`] is a closed union of the three shapes the core emits:
//! ```text
//! Message::Snapshot      periodic cycle         → "*" subscribers
//! Message::SensorUpdate  notify_new_reading     → "*" + sensor topic
//! Message::Alert         alert transitions      → "*" + sensor topic
//! ```
//!
//! The shapes are logical; [`Message::to_json`] gives the default wire form
//! (internally tagged by `"type"`).

mod message;

pub use message::{
    AlertMessage, Message, SensorUpdateMessage, Severity, SnapshotMessage, SnapshotRow,
};
pub(crate) use message::MessageRef;
