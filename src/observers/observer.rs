//! # Core observer trait
//!
//! `Observe` is the extension point for plugging custom event handlers into the
//! runtime. Each observer is driven by a dedicated worker loop fed by a bounded
//! queue owned by the [`ObserverSet`](crate::observers::ObserverSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) – they do **not** block the
//!   publisher nor other observers.
//! - If an observer's queue overflows, events for that observer are **dropped** (warn).

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event observers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use sensorcast::{Event, EventKind, Observe};
///
/// struct AlertPager;
///
/// #[async_trait]
/// impl Observe for AlertPager {
///     async fn on_event(&self, ev: &Event) {
///         if ev.kind == EventKind::AlertRaised {
///             // page someone...
///         }
///     }
///     fn name(&self) -> &'static str { "alert-pager" }
/// }
/// ```
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this observer's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
