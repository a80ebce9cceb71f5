//! Message channel abstraction.
//!
//! Three logical channels with distinct delivery semantics:
//! - `ModelSlot` — single-slot, TTL-expiring, last-write-wins; how the
//!   current model reaches workers.
//! - scenario `WorkQueue` — strict work sharing, each scenario to exactly
//!   one worker, settled with ack/reject.
//! - result `WorkQueue` — same mechanics, one logical consumer (the
//!   aggregator).
//!
//! The transport is in-process, built on tokio primitives. `Broker::connect`
//! takes the configured endpoint and credentials so a networked transport
//! can be swapped in behind the same surface; the in-process one validates
//! them and nothing more.

pub mod queue;
pub mod retry;
pub mod slot;

pub use queue::{Delivery, WorkQueue};
pub use retry::with_retry;
pub use slot::ModelSlot;

use crate::models::config::BrokerConfig;
use crate::models::error::Result;
use tracing::debug;

/// Handle to the three channels. Cheap to clone; clones share the broker.
#[derive(Clone)]
pub struct Broker {
    model: ModelSlot,
    scenarios: WorkQueue,
    results: WorkQueue,
}

impl Broker {
    /// Establish a broker connection from configuration.
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(crate::models::error::ConfigError::EmptyEndpoint.into());
        }
        debug!(endpoint = %config.endpoint, "broker connected");
        Ok(Self {
            model: ModelSlot::new(),
            scenarios: WorkQueue::new(),
            results: WorkQueue::new(),
        })
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }

    pub fn scenarios(&self) -> &WorkQueue {
        &self.scenarios
    }

    pub fn results(&self) -> &WorkQueue {
        &self.results
    }
}
