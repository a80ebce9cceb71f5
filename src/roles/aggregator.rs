//! Aggregator role: reduce the result stream into running statistics.
//!
//! Two concurrent contexts share the statistics: the consume loop (the only
//! writer) and any number of snapshot readers. Snapshots travel through a
//! `tokio::sync::watch` channel, so the writer publishes copies and is never
//! blocked by a reader.

use crate::broker::Broker;
use crate::models::error::{ChannelError, Result, SimError};
use crate::models::message::ResultMsg;
use crate::models::stats::{RunningStats, StatsSnapshot};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Read-only access to the aggregator's statistics, safe to use from any
/// task while the consume loop runs.
#[derive(Clone)]
pub struct AggregatorHandle {
    rx: watch::Receiver<StatsSnapshot>,
}

impl AggregatorHandle {
    /// A consistent copy of the statistics at this instant.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.rx.borrow().clone()
    }
}

/// The result-stream consumer.
pub struct Aggregator {
    broker: Broker,
    stats: RunningStats,
    stats_tx: watch::Sender<StatsSnapshot>,
}

impl Aggregator {
    pub fn new(broker: Broker) -> (Self, AggregatorHandle) {
        let (stats_tx, rx) = watch::channel(StatsSnapshot::default());
        (
            Self {
                broker,
                stats: RunningStats::new(),
                stats_tx,
            },
            AggregatorHandle { rx },
        )
    }

    /// Consume results until the result channel is closed and drained.
    ///
    /// Data errors never terminate the loop: a malformed payload is rejected
    /// without requeue, logged, and the loop moves on.
    pub async fn run(mut self) -> Result<RunningStats> {
        loop {
            let delivery = match self.broker.results().consume().await {
                Ok(delivery) => delivery,
                Err(SimError::Channel(ChannelError::Closed)) => break,
                Err(e) => return Err(e),
            };

            match ResultMsg::from_bytes(delivery.payload()) {
                Ok(msg) => {
                    self.stats.record(&msg.worker_id, msg.value);
                    self.stats_tx.send_replace(self.stats.snapshot());
                    delivery.ack();
                }
                Err(e) => {
                    warn!(error = %e, "rejecting malformed result payload");
                    delivery.reject(false);
                }
            }
        }

        debug!(count = self.stats.count(), "result channel closed; aggregator finished");
        Ok(self.stats)
    }
}
