//! monteq - Distributed Monte Carlo scenario simulation over message channels.
//!
//! ## Architecture
//!
//! One producer, N workers, one aggregator, coordinated only through three
//! logical channels:
//! - **Model channel**: single-slot, TTL-expiring, last-write-wins. Each
//!   worker consumes it exactly once and caches the model for life.
//! - **Scenario channel**: strict work queue; each scenario is evaluated by
//!   exactly one worker and settled with ack/reject.
//! - **Result channel**: the aggregator reduces every result into streaming
//!   statistics (Welford mean/variance, min/max, per-worker counts).
//!
//! ## Failure policy
//!
//! Structural errors (model format, config) are fatal to their role.
//! Transient channel errors retry with bounded backoff. Per-scenario
//! evaluation failures reject without requeue: that scenario is lost, the
//! worker keeps going.

pub mod broker;
pub mod models;
pub mod roles;
pub mod sim;

// Re-exports for convenience
pub use broker::{Broker, Delivery, ModelSlot, WorkQueue};
pub use models::{
    Config, Distribution, ModelEnvelope, ModelSpec, ResultMsg, Result, RunningStats, Scenario,
    SimError, StatsSnapshot, Variable,
};
pub use roles::{
    run_producer, Aggregator, AggregatorHandle, ModelSource, ProducerStats, Worker, WorkerState,
    WorkerStats,
};
pub use sim::{evaluate, parse_model, parse_model_file, sample};
