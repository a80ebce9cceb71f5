//! Strict work queue: each message is delivered to exactly one consumer,
//! which must settle the delivery with `ack` or `reject`.
//!
//! A rejected delivery with `requeue = true` goes back to the head of the
//! queue for redelivery (possibly to another consumer); with `requeue =
//! false` it is dropped permanently. A delivery dropped without settling is
//! simply gone — redelivery across consumer crashes is out of scope.

use crate::models::error::{ChannelError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct QueueInner {
    queue: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
    closed: AtomicBool,
}

/// A work queue carrying serialized payloads.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<QueueInner>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                queue: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Publish is fire-and-forget: it enqueues and returns without waiting
    /// for any consumer.
    pub fn publish(&self, payload: Vec<u8>) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed.into());
        }
        self.inner.queue.lock().unwrap().push_back(payload);
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Block until a message is available or the channel is closed and fully
    /// drained.
    pub async fn consume(&self) -> Result<Delivery> {
        loop {
            // Register for notification before checking, so a publish racing
            // with this check cannot be missed.
            let notified = self.inner.notify.notified();
            {
                let mut queue = self.inner.queue.lock().unwrap();
                if let Some(payload) = queue.pop_front() {
                    return Ok(Delivery {
                        payload,
                        inner: Arc::clone(&self.inner),
                    });
                }
                if self.inner.closed.load(Ordering::Acquire) {
                    return Err(ChannelError::Closed.into());
                }
            }
            notified.await;
        }
    }

    /// Close the queue. Consumers drain the backlog, then observe closed.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// One consumed message awaiting settlement.
pub struct Delivery {
    payload: Vec<u8>,
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl Delivery {
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Confirm successful processing. The message is gone.
    pub fn ack(self) {}

    /// Give up on this message. With `requeue` it returns to the head of the
    /// queue for another consumer; without, it is dropped permanently.
    pub fn reject(self, requeue: bool) {
        if requeue {
            self.inner.queue.lock().unwrap().push_front(self.payload);
            self.inner.notify.notify_one();
        }
    }
}
