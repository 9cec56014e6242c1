//! # Subscriptions: who receives which messages.
//!
//! ```text
//! on_connect(id, deliver) ──► SubscriptionRegistry::register
//!                                  ├─ bounded queue (per subscriber, FIFO)
//!                                  └─ worker ──► deliver.deliver(msg)
//!                                                   ├─ Err   → DeliveryFailed
//!                                                   └─ panic → DeliveryPanicked
//! on_join_topic / on_leave_topic ──► topic set ("*" or sensor id)
//! FanoutDispatcher ──► registry.snapshot() ──► try_send to matching queues
//! ```
//!
//! Contents:
//! - [`Topic`] validated subscription filter
//! - [`Deliver`], [`DeliverFn`], [`ChannelSink`] the push capability of one observer
//! - [`SubscriptionRegistry`], [`SubscriptionHandle`], [`Subscription`]

mod deliver;
mod registry;
mod topic;
mod worker;

pub use deliver::{ChannelSink, Deliver, DeliverFn, DeliverRef};
pub use registry::{Subscription, SubscriptionHandle, SubscriptionRegistry};
pub use topic::Topic;
pub(crate) use worker::panic_message;
