//! # SubscriptionRegistry - live observer registrations.
//!
//! ## Architecture
//! ```text
//! register(id, deliver) ─► Entry { generation, topics = {}, queue, worker }
//! join / leave          ─► mutate topics (generation must match)
//! unregister            ─► remove entry (generation must match), queue closed
//! snapshot()            ─► Vec<Subscription> copied under the lock
//! close_all()           ─► registry closed, workers drained until the deadline
//! ```
//!
//! ## Rules
//! - One mutex guards the map; it is never held across an `.await`.
//! - A new registration has no topics and receives nothing until it joins one.
//! - Re-registering an id replaces the entry and revokes the old handle.
//! - A revoked handle cannot join/leave (`UnknownHandle`) and its unregister is a no-op.
//! - Dispatch works on a [`snapshot`](SubscriptionRegistry::snapshot) copy,
//!   so concurrent join/leave/unregister never block on delivery.
//! - After [`close_all`](SubscriptionRegistry::close_all), `register` fails with
//!   [`FanoutError::Stopped`]; no worker is spawned.
//! - Workers still running at the drain deadline are aborted and reported as
//!   [`EventKind::DeliveryFailed`] with reason `"drain timeout"`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, timeout_at},
};

use super::{DeliverRef, Topic, worker};
use crate::error::FanoutError;
use crate::events::{Bus, Event, EventKind};
use crate::messages::MessageRef;

/// Opaque handle returned by [`SubscriptionRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    subscriber: Arc<str>,
    generation: u64,
}

impl SubscriptionHandle {
    /// The subscriber id this handle was issued for.
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber
    }
}

/// Point-in-time copy of one registration, used for dispatch.
#[derive(Clone)]
pub struct Subscription {
    pub subscriber_id: Arc<str>,
    pub topics: HashSet<Topic>,
    queue: mpsc::Sender<MessageRef>,
}

impl Subscription {
    /// Returns `true` if a message scoped to `sensor` should be delivered here.
    pub fn wants(&self, sensor: Option<&str>) -> bool {
        self.topics.iter().any(|t| t.matches(sensor))
    }

    /// Queues `msg` without waiting.
    pub(crate) fn try_enqueue(
        &self,
        msg: MessageRef,
    ) -> Result<(), mpsc::error::TrySendError<MessageRef>> {
        self.queue.try_send(msg)
    }
}

struct Entry {
    generation: u64,
    topics: HashSet<Topic>,
    queue: mpsc::Sender<MessageRef>,
    worker: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    entries: HashMap<Arc<str>, Entry>,
    closed: bool,
}

/// Thread-safe registry of connected observers and their topics.
pub struct SubscriptionRegistry {
    state: Mutex<State>,
    next_generation: AtomicU64,
    default_capacity: usize,
    drain_timeout: Option<Duration>,
    bus: Bus,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    ///
    /// `default_capacity` sizes the queue of subscribers that do not declare one.
    pub fn new(bus: Bus, default_capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_generation: AtomicU64::new(1),
            default_capacity: default_capacity.max(1),
            drain_timeout: None,
            bus,
        }
    }

    /// Bounds how long [`close_all`](Self::close_all) waits for workers.
    ///
    /// `None` waits indefinitely.
    pub fn with_drain_timeout(mut self, drain_timeout: Option<Duration>) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Registers `subscriber_id` with no topics and spawns its delivery worker.
    ///
    /// Must be called within a tokio runtime. An existing registration with
    /// the same id is replaced; its queue is closed after draining and its
    /// handle stops working.
    ///
    /// # Errors
    /// [`FanoutError::Stopped`] once [`close_all`](Self::close_all) has run.
    pub fn register(
        &self,
        subscriber_id: impl Into<Arc<str>>,
        deliver: DeliverRef,
    ) -> Result<SubscriptionHandle, FanoutError> {
        let subscriber: Arc<str> = subscriber_id.into();
        let capacity = deliver
            .queue_capacity()
            .unwrap_or(self.default_capacity)
            .max(1);

        let (generation, previous) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(FanoutError::Stopped);
            }
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = mpsc::channel::<MessageRef>(capacity);
            let worker = worker::spawn(Arc::clone(&subscriber), deliver, rx, self.bus.clone());
            let previous = state.entries.insert(
                Arc::clone(&subscriber),
                Entry {
                    generation,
                    topics: HashSet::new(),
                    queue: tx,
                    worker,
                },
            );
            (generation, previous)
        };

        let kind = if previous.is_some() {
            EventKind::SubscriberReplaced
        } else {
            EventKind::SubscriberRegistered
        };
        self.bus
            .publish(Event::new(kind).with_subscriber(Arc::clone(&subscriber)));

        Ok(SubscriptionHandle {
            subscriber,
            generation,
        })
    }

    /// Adds `topic` to the handle's topic set.
    ///
    /// Returns `Ok(false)` if the topic was already joined.
    pub fn join(&self, handle: &SubscriptionHandle, topic: &str) -> Result<bool, FanoutError> {
        let topic = Topic::parse(topic)?;
        self.with_entry(handle, |e| e.topics.insert(topic))
    }

    /// Removes `topic` from the handle's topic set.
    ///
    /// Returns `Ok(false)` if the topic was not joined.
    pub fn leave(&self, handle: &SubscriptionHandle, topic: &str) -> Result<bool, FanoutError> {
        let topic = Topic::parse(topic)?;
        self.with_entry(handle, |e| e.topics.remove(&topic))
    }

    /// Removes the registration. Idempotent.
    ///
    /// Returns `true` only for the call that actually removed it.
    pub fn unregister(&self, handle: &SubscriptionHandle) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let current = state.entries.get(&handle.subscriber).map(|e| e.generation);
            if current == Some(handle.generation) {
                state.entries.remove(&handle.subscriber)
            } else {
                None
            }
        };
        match removed {
            Some(_entry) => {
                self.bus.publish(
                    Event::new(EventKind::SubscriberUnregistered)
                        .with_subscriber(Arc::clone(&handle.subscriber)),
                );
                true
            }
            None => false,
        }
    }

    /// Returns the topics currently joined by `handle`, sorted by name.
    pub fn topics(&self, handle: &SubscriptionHandle) -> Result<Vec<Topic>, FanoutError> {
        let mut topics: Vec<Topic> =
            self.with_entry(handle, |e| e.topics.iter().cloned().collect())?;
        topics.sort_unstable_by_key(|t| t.to_string());
        Ok(topics)
    }

    /// Copies every registration for dispatch.
    ///
    /// The lock is held only while cloning.
    pub fn snapshot(&self) -> Vec<Subscription> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|(id, e)| Subscription {
                subscriber_id: Arc::clone(id),
                topics: e.topics.clone(),
                queue: e.queue.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Closes the registry, removes every registration and waits for their
    /// workers to drain.
    ///
    /// All workers share one deadline; those still running when it passes
    /// are aborted.
    pub async fn close_all(&self) {
        let drained: Vec<(Arc<str>, Entry)> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.entries.drain().collect()
        };
        let workers: Vec<(Arc<str>, JoinHandle<()>)> = drained
            .into_iter()
            .map(|(id, e)| {
                drop(e.queue);
                (id, e.worker)
            })
            .collect();

        let Some(limit) = self.drain_timeout else {
            for (_, w) in workers {
                let _ = w.await;
            }
            return;
        };

        let deadline = Instant::now() + limit;
        for (id, mut w) in workers {
            if timeout_at(deadline, &mut w).await.is_err() {
                w.abort();
                self.bus.publish(
                    Event::new(EventKind::DeliveryFailed)
                        .with_subscriber(id)
                        .with_reason("drain timeout"),
                );
            }
        }
    }

    fn with_entry<R>(
        &self,
        handle: &SubscriptionHandle,
        f: impl FnOnce(&mut Entry) -> R,
    ) -> Result<R, FanoutError> {
        let mut state = self.state.lock();
        match state.entries.get_mut(&handle.subscriber) {
            Some(e) if e.generation == handle.generation => Ok(f(e)),
            _ => Err(FanoutError::UnknownHandle {
                subscriber: handle.subscriber.to_string(),
            }),
        }
    }
}
