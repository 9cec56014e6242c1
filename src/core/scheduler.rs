//! # BroadcastScheduler: at most one cycle in flight.
//!
//! ```text
//! start(interval)
//!   └─► ticker task: interval(Skip) ──tick──► launch()
//!
//! launch()  (under gate)
//!   ├─ token cancelled         → Stopped
//!   ├─ running.swap(true)=true → CycleSkipped("running"), Busy
//!   └─ tracker.spawn(cycle.run())   RunningGuard resets the flag on exit/panic
//!
//! stop()
//!   ├─ gate: token.cancel(), tracker.close()
//!   ├─ await ticker
//!   ├─ tracker.wait()   (in-flight cycle finishes and dispatches)
//!   └─ SchedulerStopped (once)
//! ```
//!
//! ## Rules
//! - Ticks that land on a running cycle are dropped, never queued.
//! - `stop` does not abort the running cycle; it only prevents new ones.
//! - `Stopped` is terminal: `start` and `broadcast_now` fail afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::cycle::{BroadcastCycle, CycleOutcome};
use crate::error::{FanoutError, StoreError};
use crate::events::{Bus, Event, EventKind};
use crate::subscriptions::panic_message;

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No cycle in flight.
    Idle,
    /// A cycle is assembling or dispatching.
    Running,
    /// `stop` was called. Terminal.
    Stopped,
}

type CycleHandle = JoinHandle<Result<CycleOutcome, FanoutError>>;

enum Launch {
    Spawned(CycleHandle),
    Busy,
    Stopped,
}

struct Shared {
    cycle: Arc<BroadcastCycle>,
    running: Arc<AtomicBool>,
    token: CancellationToken,
    tracker: TaskTracker,
    gate: Mutex<()>,
    bus: Bus,
}

/// Resets the running flag when the cycle task ends, including on panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    fn launch(&self) -> Launch {
        let _gate = self.gate.lock();
        if self.token.is_cancelled() {
            return Launch::Stopped;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            self.bus
                .publish(Event::new(EventKind::CycleSkipped).with_reason("running"));
            return Launch::Busy;
        }

        let guard = RunningGuard(Arc::clone(&self.running));
        let cycle = Arc::clone(&self.cycle);
        let bus = self.bus.clone();
        Launch::Spawned(self.tracker.spawn(async move {
            let _guard = guard;
            match std::panic::AssertUnwindSafe(cycle.run()).catch_unwind().await {
                Ok(res) => res,
                Err(panic_err) => {
                    let msg = format!("cycle panicked: {}", panic_message(&*panic_err));
                    bus.publish(Event::new(EventKind::CycleFailed).with_reason(msg.as_str()));
                    Err(FanoutError::StoreUnavailable(StoreError::Backend(msg)))
                }
            }
        }))
    }
}

/// Periodic driver of broadcast cycles.
pub struct BroadcastScheduler {
    shared: Arc<Shared>,
    started: AtomicBool,
    stopped: AtomicBool,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastScheduler {
    pub(crate) fn new(cycle: Arc<BroadcastCycle>, bus: Bus) -> Self {
        Self {
            shared: Arc::new(Shared {
                cycle,
                running: Arc::new(AtomicBool::new(false)),
                token: CancellationToken::new(),
                tracker: TaskTracker::new(),
                gate: Mutex::new(()),
                bus,
            }),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            ticker: Mutex::new(None),
        }
    }

    /// Starts the periodic timer. The first cycle runs immediately.
    ///
    /// A zero interval is raised to 1ms.
    pub fn start(&self, interval: Duration) -> Result<(), FanoutError> {
        if self.shared.token.is_cancelled() {
            return Err(FanoutError::Stopped);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(FanoutError::AlreadyStarted);
        }
        let period = interval.max(Duration::from_millis(1));
        let handle = spawn_ticker(Arc::clone(&self.shared), period);
        *self.ticker.lock() = Some(handle);

        self.shared
            .bus
            .publish(Event::new(EventKind::SchedulerStarted).with_elapsed(period));
        Ok(())
    }

    /// Runs one cycle now and waits for it.
    ///
    /// Returns [`CycleOutcome::Busy`] without waiting if a cycle is already running.
    pub async fn broadcast_now(&self) -> Result<CycleOutcome, FanoutError> {
        match self.shared.launch() {
            Launch::Spawned(handle) => handle.await.unwrap_or(Err(FanoutError::Stopped)),
            Launch::Busy => Ok(CycleOutcome::Busy),
            Launch::Stopped => Err(FanoutError::Stopped),
        }
    }

    /// Stops the timer and waits for the in-flight cycle, if any. Idempotent.
    pub async fn stop(&self) {
        {
            let _gate = self.shared.gate.lock();
            self.shared.token.cancel();
            self.shared.tracker.close();
        }
        let ticker = self.ticker.lock().take();
        if let Some(ticker) = ticker {
            let _ = ticker.await;
        }
        self.shared.tracker.wait().await;

        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.shared
                .bus
                .publish(Event::new(EventKind::SchedulerStopped));
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.shared.token.is_cancelled() {
            SchedulerState::Stopped
        } else if self.shared.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }
}

fn spawn_ticker(shared: Arc<Shared>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = shared.token.cancelled() => break,
                _ = ticks.tick() => {
                    if let Launch::Stopped = shared.launch() {
                        break;
                    }
                }
            }
        }
    })
}
