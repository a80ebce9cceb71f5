//! Producer role: load a model, publish it, then fan out scenarios.
//!
//! The producer owns the only RNG in the system. Every scenario gets one
//! independent draw per variable and the next monotonically increasing id.
//! Publishes are fire-and-forget; the producer never waits for consumption.

use crate::broker::{with_retry, Broker};
use crate::models::config::Config;
use crate::models::error::Result;
use crate::models::message::{ModelEnvelope, Scenario};
use crate::models::spec::ModelSpec;
use crate::sim::{parse_model, parse_model_file, sample};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where the model text comes from.
pub enum ModelSource {
    Path(PathBuf),
    Text(String),
}

impl ModelSource {
    /// Load and parse the model. Read and parse failures are fatal to the
    /// producer.
    pub fn load(&self) -> Result<ModelSpec> {
        match self {
            Self::Path(path) => parse_model_file(path),
            Self::Text(text) => parse_model(text),
        }
    }
}

/// Statistics for a producer run.
#[derive(Debug, Clone, Default)]
pub struct ProducerStats {
    /// Scenarios published
    pub published: u64,
    /// Total runtime in seconds
    pub runtime_secs: f64,
}

/// Run the producer to completion: publish the model, then `count`
/// scenarios, then close the scenario channel.
pub async fn run_producer(
    broker: &Broker,
    config: &Config,
    source: &ModelSource,
    count: u64,
) -> Result<ProducerStats> {
    let start = Instant::now();
    let max_retries = config.broker.max_retries;

    let spec = source.load()?;
    info!(
        expression = %spec.expression(),
        variables = ?spec.variables().iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        "model loaded"
    );

    let ttl = Duration::from_secs(config.model.ttl_secs);
    let envelope = ModelEnvelope::from_spec(&spec, ttl);
    let payload = envelope.to_bytes()?;
    {
        let model = broker.model().clone();
        let payload = payload.clone();
        with_retry(max_retries, move || {
            let model = model.clone();
            let payload = payload.clone();
            async move { model.publish(payload, ttl) }
        })
        .await?;
    }
    info!(ttl_secs = config.model.ttl_secs, "model published");

    let mut rng = match config.simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = ProgressBar::new(count);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut published = 0u64;
    for id in 1..=count {
        let mut values = BTreeMap::new();
        for var in spec.variables() {
            values.insert(var.name.clone(), sample(&var.distribution, &mut rng));
        }

        let payload = Scenario { id, values }.to_bytes()?;
        let scenarios = broker.scenarios().clone();
        with_retry(max_retries, move || {
            let scenarios = scenarios.clone();
            let payload = payload.clone();
            async move { scenarios.publish(payload) }
        })
        .await?;

        published += 1;
        pb.set_position(id);
        if id % 100 == 0 {
            debug!(published = id, total = count, "scenario progress");
        }
    }

    pb.finish_with_message("all scenarios published");
    broker.scenarios().close();

    let stats = ProducerStats {
        published,
        runtime_secs: start.elapsed().as_secs_f64(),
    };
    info!(
        published = stats.published,
        runtime_secs = format!("{:.1}", stats.runtime_secs),
        "producer finished"
    );
    Ok(stats)
}
