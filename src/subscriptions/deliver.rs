//! # Delivery capability of one observer.
//!
//! [`Deliver`] is the only thing the core needs from a transport: a way to
//! push one [`Message`] and learn whether it failed. Any push-capable channel
//! (socket writer, SSE stream, queue) can implement it.
//!
//! Provided implementations:
//! - [`DeliverFn`] wraps a closure `Fn(Arc<Message>) -> Future`
//! - [`ChannelSink`] forwards into a bounded tokio mpsc channel

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::messages::Message;

/// Push capability of one subscriber.
///
/// Called from the subscriber's dedicated delivery worker, one message at a
/// time, in emission order.
#[async_trait]
pub trait Deliver: Send + Sync + 'static {
    /// Pushes one message to the observer.
    async fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError>;

    /// Preferred capacity of this subscriber's queue.
    ///
    /// `None` uses [`Config::delivery_queue_capacity`](crate::Config::delivery_queue_capacity).
    fn queue_capacity(&self) -> Option<usize> {
        None
    }
}

/// Shared handle to a delivery capability.
pub type DeliverRef = Arc<dyn Deliver>;

/// Closure-backed [`Deliver`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use sensorcast::{DeliverFn, DeliverRef, DeliveryError, Message};
///
/// let d: DeliverRef = DeliverFn::arc(|msg: Arc<Message>| async move {
///     let _json = msg.to_json().map_err(|e| DeliveryError::Failed(e.to_string()))?;
///     // write to the socket...
///     Ok::<(), DeliveryError>(())
/// });
/// ```
pub struct DeliverFn<F> {
    f: F,
}

impl<F> DeliverFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the capability and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Deliver for DeliverFn<F>
where
    F: Fn(Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
{
    async fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError> {
        (self.f)(message).await
    }
}

/// [`Deliver`] into a bounded mpsc channel.
///
/// The worker waits for room in the channel, so a slow reader only slows its
/// own queue. A dropped receiver yields [`DeliveryError::Closed`].
pub struct ChannelSink {
    tx: mpsc::Sender<Arc<Message>>,
}

impl ChannelSink {
    /// Creates a sink and the receiving half.
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Deliver for ChannelSink {
    async fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| DeliveryError::Closed)
    }
}
