//! Worker role: cache one model, then evaluate scenarios until told to stop.
//!
//! Lifecycle is a one-way state machine:
//!
//! ```text
//! Booting -> AwaitingModel -> Ready -> Draining
//! ```
//!
//! The model is consumed exactly once per process lifetime. A worker that
//! cached its model before a republish keeps running against the stale copy
//! indefinitely; the slot only changes what a new consumer observes.

use crate::broker::{with_retry, Broker, Delivery};
use crate::models::config::Config;
use crate::models::error::{ChannelError, Result, SimError};
use crate::models::message::{ModelEnvelope, ResultMsg, Scenario};
use crate::models::spec::ModelSpec;
use crate::sim::evaluate;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Worker lifecycle states. No transition ever goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Booting,
    AwaitingModel,
    Ready,
    Draining,
}

/// Statistics for one worker's lifetime.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Scenarios evaluated successfully
    pub processed: u64,
    /// Results published (equals `processed`)
    pub published: u64,
    /// Scenarios dropped on evaluation failure
    pub failed: u64,
    /// Total runtime in seconds
    pub runtime_secs: f64,
}

/// A scenario worker.
pub struct Worker {
    id: String,
    broker: Broker,
    max_retries: u32,
    state_tx: watch::Sender<WorkerState>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    /// Create a worker. Returns the worker and a receiver observing its
    /// state transitions.
    pub fn new(
        broker: Broker,
        config: &Config,
        id: impl Into<String>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, watch::Receiver<WorkerState>) {
        let (state_tx, state_rx) = watch::channel(WorkerState::Booting);
        (
            Self {
                id: id.into(),
                broker,
                max_retries: config.broker.max_retries,
                state_tx,
                shutdown,
            },
            state_rx,
        )
    }

    fn transition(&self, state: WorkerState) {
        debug!(worker = %self.id, ?state, "state transition");
        self.state_tx.send_replace(state);
    }

    /// Run the worker to completion (shutdown signal or scenario channel
    /// closed and drained).
    pub async fn run(self) -> Result<WorkerStats> {
        let start = Instant::now();
        let mut stats = WorkerStats::default();
        let mut shutdown = self.shutdown.clone();

        self.transition(WorkerState::AwaitingModel);
        let spec = match self.await_model().await {
            Ok(spec) => spec,
            Err(SimError::Channel(ChannelError::Closed)) => {
                // Model channel torn down before any model arrived.
                self.transition(WorkerState::Draining);
                stats.runtime_secs = start.elapsed().as_secs_f64();
                return Ok(stats);
            }
            Err(e) => return Err(e),
        };

        self.transition(WorkerState::Ready);
        info!(
            worker = %self.id,
            expression = %spec.expression(),
            "model cached; consuming scenarios"
        );

        loop {
            tokio::select! {
                biased;
                // Shutdown interrupts only this blocking consume; an
                // evaluation already in flight below completes first.
                _ = shutdown.changed() => break,
                delivery = self.broker.scenarios().consume() => match delivery {
                    Ok(delivery) => self.handle_scenario(&spec, delivery, &mut stats).await?,
                    Err(SimError::Channel(ChannelError::Closed)) => break,
                    Err(e) => return Err(e),
                },
            }
        }

        self.transition(WorkerState::Draining);
        stats.runtime_secs = start.elapsed().as_secs_f64();
        info!(
            worker = %self.id,
            processed = stats.processed,
            failed = stats.failed,
            "worker drained"
        );
        Ok(stats)
    }

    /// Block until one model envelope is consumed and decoded. Called exactly
    /// once; the returned spec is cached for the rest of the process.
    async fn await_model(&self) -> Result<ModelSpec> {
        loop {
            let bytes = self.broker.model().consume().await?;
            match ModelEnvelope::from_bytes(&bytes).and_then(|e| e.into_spec()) {
                Ok(spec) => return Ok(spec),
                Err(e) => {
                    // The slot still holds the bad envelope; pace the retry
                    // while waiting for a republish.
                    warn!(
                        worker = %self.id,
                        error = %e,
                        "undecodable model envelope; waiting for a republish"
                    );
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn handle_scenario(
        &self,
        spec: &ModelSpec,
        delivery: Delivery,
        stats: &mut WorkerStats,
    ) -> Result<()> {
        let scenario = match Scenario::from_bytes(delivery.payload()) {
            Ok(scenario) => scenario,
            Err(e) => {
                warn!(worker = %self.id, error = %e, "rejecting malformed scenario payload");
                delivery.reject(false);
                return Ok(());
            }
        };

        match evaluate(spec.expression(), &scenario.values) {
            Ok(value) => {
                let payload = ResultMsg {
                    scenario_id: scenario.id,
                    worker_id: self.id.clone(),
                    value,
                }
                .to_bytes()?;

                let results = self.broker.results().clone();
                with_retry(self.max_retries, move || {
                    let results = results.clone();
                    let payload = payload.clone();
                    async move { results.publish(payload) }
                })
                .await?;

                delivery.ack();
                stats.processed += 1;
                stats.published += 1;
                if stats.processed % 10 == 0 {
                    debug!(worker = %self.id, processed = stats.processed, "progress");
                }
            }
            Err(e) => {
                // Not requeued: the scenario is permanently lost and the
                // loop continues with the next one.
                stats.failed += 1;
                warn!(
                    worker = %self.id,
                    scenario_id = scenario.id,
                    error = %e,
                    "evaluation failed; dropping scenario"
                );
                delivery.reject(false);
            }
        }

        Ok(())
    }
}
