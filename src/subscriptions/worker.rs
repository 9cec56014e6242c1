//! # Per-subscriber delivery worker.
//!
//! ```text
//! [queue] ──► recv ──► deliver(msg)
//!                        ├─ Ok    → next
//!                        ├─ Err   → publish DeliveryFailed,  next
//!                        └─ panic → publish DeliveryPanicked, next
//! queue closed (unregister / replace) ──► drain remaining, exit
//! ```
//!
//! Failures never unregister the subscriber and are never retried; the next
//! periodic snapshot carries the current state again.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a `Deliver` implementation panics while holding a lock.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::DeliverRef;
use crate::events::{Bus, Event, EventKind};
use crate::messages::MessageRef;

/// Spawns the worker draining `rx` into `deliver`.
pub(super) fn spawn(
    subscriber: Arc<str>,
    deliver: DeliverRef,
    mut rx: mpsc::Receiver<MessageRef>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let fut = deliver.deliver(msg);
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => bus.publish(
                    Event::new(EventKind::DeliveryFailed)
                        .with_subscriber(Arc::clone(&subscriber))
                        .with_reason(e.to_string()),
                ),
                Err(panic_err) => bus.publish(Event::delivery_panicked(
                    Arc::clone(&subscriber),
                    panic_message(&*panic_err),
                )),
            }
        }
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
