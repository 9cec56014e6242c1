//! # CycleStats: counters over runtime events
//!
//! Keeps lock-free counters of cycle outcomes and delivery problems.
//!
//! ```text
//! on_event(ev):
//!   ├─ CycleCompleted                   => completed += 1
//!   ├─ CycleSkipped                     => skipped += 1
//!   ├─ CycleFailed                      => failed += 1
//!   ├─ ReadFailed                       => read_failures += 1
//!   └─ Delivery{Failed,Panicked,Overflow} => delivery_failures += 1
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Point-in-time copy of [`CycleStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub read_failures: u64,
    pub delivery_failures: u64,
}

/// Aggregates runtime events into counters.
#[derive(Default)]
pub struct CycleStats {
    completed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    read_failures: AtomicU64,
    delivery_failures: AtomicU64,
}

impl CycleStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl Observe for CycleStats {
    async fn on_event(&self, ev: &Event) {
        let counter = match ev.kind {
            EventKind::CycleCompleted => &self.completed,
            EventKind::CycleSkipped => &self.skipped,
            EventKind::CycleFailed => &self.failed,
            EventKind::ReadFailed => &self.read_failures,
            _ if ev.is_delivery_problem() => &self.delivery_failures,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn name(&self) -> &'static str {
        "CycleStats"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_by_kind() {
        let stats = CycleStats::new();
        for kind in [
            EventKind::CycleCompleted,
            EventKind::CycleCompleted,
            EventKind::CycleSkipped,
            EventKind::DeliveryPanicked,
            EventKind::DeliveryOverflow,
            EventKind::SubscriberRegistered,
        ] {
            stats.on_event(&Event::new(kind)).await;
        }
        let s = stats.snapshot();
        assert_eq!(s.completed, 2);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.failed, 0);
        assert_eq!(s.delivery_failures, 2);
    }
}
