//! Single-slot, TTL-expiring model channel with last-write-wins semantics.
//!
//! Consuming does not drain the slot: every currently-waiting or future
//! consumer observes the same envelope until it expires or is replaced.
//! Replacing the slot never touches copies that consumers already hold.

use crate::models::error::{ChannelError, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

struct Stored {
    payload: Vec<u8>,
    deadline: Instant,
}

struct SlotInner {
    state: Mutex<SlotState>,
    notify: Notify,
}

struct SlotState {
    current: Option<Stored>,
    closed: bool,
}

/// The model distribution channel.
#[derive(Clone)]
pub struct ModelSlot {
    inner: Arc<SlotInner>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                state: Mutex::new(SlotState {
                    current: None,
                    closed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Replace the slot contents. The new envelope is what any *new* consume
    /// observes for the next `ttl`.
    pub fn publish(&self, payload: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.closed {
            return Err(ChannelError::Closed.into());
        }
        state.current = Some(Stored {
            payload,
            deadline: Instant::now() + ttl,
        });
        drop(state);
        self.inner.notify.notify_waiters();
        Ok(())
    }

    /// Block until a non-expired envelope is present, then return a copy.
    ///
    /// An expired envelope is indistinguishable from an empty slot: the call
    /// keeps waiting for a fresh publish.
    pub async fn consume(&self) -> Result<Vec<u8>> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let state = self.inner.state.lock().unwrap();
                if let Some(stored) = &state.current {
                    if Instant::now() < stored.deadline {
                        return Ok(stored.payload.clone());
                    }
                }
                if state.closed {
                    return Err(ChannelError::Closed.into());
                }
            }
            notified.await;
        }
    }

    /// Close the channel; blocked and future consumers observe closed.
    pub fn close(&self) {
        self.inner.state.lock().unwrap().closed = true;
        self.inner.notify.notify_waiters();
    }
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn consume_sees_current_envelope_repeatedly() {
        let slot = ModelSlot::new();
        slot.publish(b"model-a".to_vec(), Duration::from_secs(100))
            .unwrap();

        // Non-draining: both consumes observe the same copy.
        assert_eq!(slot.consume().await.unwrap(), b"model-a");
        assert_eq!(slot.consume().await.unwrap(), b"model-a");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_envelope_is_invisible_to_new_consumers() {
        let slot = ModelSlot::new();
        slot.publish(b"model-a".to_vec(), Duration::from_secs(2))
            .unwrap();

        advance(Duration::from_secs(3)).await;
        assert!(
            timeout(Duration::from_secs(1), slot.consume()).await.is_err(),
            "consume should still be blocking on an expired slot"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn long_ttl_survives_the_same_delay() {
        let slot = ModelSlot::new();
        slot.publish(b"model-a".to_vec(), Duration::from_secs(100))
            .unwrap();

        advance(Duration::from_secs(3)).await;
        assert_eq!(slot.consume().await.unwrap(), b"model-a");
    }

    #[tokio::test(start_paused = true)]
    async fn republish_is_last_write_wins() {
        let slot = ModelSlot::new();
        slot.publish(b"model-a".to_vec(), Duration::from_secs(100))
            .unwrap();
        slot.publish(b"model-b".to_vec(), Duration::from_secs(100))
            .unwrap();

        assert_eq!(slot.consume().await.unwrap(), b"model-b");
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_consumer_wakes_on_publish() {
        let slot = ModelSlot::new();
        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.consume().await.unwrap() })
        };

        tokio::task::yield_now().await;
        slot.publish(b"fresh".to_vec(), Duration::from_secs(10))
            .unwrap();
        assert_eq!(waiter.await.unwrap(), b"fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn close_releases_blocked_consumers() {
        let slot = ModelSlot::new();
        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.consume().await })
        };

        tokio::task::yield_now().await;
        slot.close();
        assert!(waiter.await.unwrap().is_err());
    }
}
