//! monteq CLI - distributed Monte Carlo scenario simulation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use monteq::{
    run_producer, Aggregator, Broker, Config, ModelSource, Worker,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "monteq")]
#[command(version)]
#[command(about = "Distributed Monte Carlo scenario simulation over message channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full simulation: producer, workers, and aggregator
    Run {
        /// Path to the model text file
        #[arg(short, long)]
        model: PathBuf,

        /// Number of scenarios to generate (config default when omitted)
        #[arg(short, long)]
        scenarios: Option<u64>,

        /// Number of workers to spawn (config default when omitted)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Validate the configuration and optionally a model file
    Validate {
        /// Path to a model text file to check
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Show example configuration and model text
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example() {
    let config = r#"# monteq configuration file

[broker]
endpoint = "inproc://montecarlo"
username = "guest"
# Supports ${ENV_VAR} expansion
password = "${BROKER_PASSWORD}"
max_retries = 3

[model]
# Seconds before a published model expires for new consumers
ttl_secs = 3600

[simulation]
default_scenarios = 1000
workers = 4
# seed = 42
"#;

    let model = r#"# Example model file

FUNCTION: x + y * sqrt(z)
VARIABLES:
x: normal(media=10, desviacion=2)
y: uniform(min=5, max=15)
z: exponential(lambda=0.5)
"#;

    println!("{config}");
    println!("{model}");
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}"))?,
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example();
            Ok(())
        }

        Commands::Validate { model } => {
            let config = load_config(cli.config.as_ref())?;
            info!("Configuration is valid");
            info!("  Broker endpoint: {}", config.broker.endpoint);
            info!("  Model TTL: {}s", config.model.ttl_secs);
            info!(
                "  Default scenarios: {}",
                config.simulation.default_scenarios
            );

            if let Some(path) = model {
                let spec = monteq::parse_model_file(&path)
                    .with_context(|| format!("Invalid model file {path:?}"))?;
                info!("Model is valid");
                info!("  Expression: {}", spec.expression());
                for var in spec.variables() {
                    info!("  Variable: {} ~ {}", var.name, var.distribution.kind());
                }
            }
            Ok(())
        }

        Commands::Run {
            model,
            scenarios,
            workers,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let scenarios = scenarios.unwrap_or(config.simulation.default_scenarios);
            let workers = workers.unwrap_or(config.simulation.workers).max(1);
            run_local(config, model, scenarios, workers).await
        }
    }
}

/// Wire all three roles over one in-process broker and run to completion.
async fn run_local(
    config: Config,
    model: PathBuf,
    scenarios: u64,
    workers: usize,
) -> Result<()> {
    let start = Instant::now();
    let run_id = Uuid::new_v4();
    info!(%run_id, scenarios, workers, "starting simulation run");

    let broker = Broker::connect(&config.broker)?;

    let (aggregator, handle) = Aggregator::new(broker.clone());
    let agg_task = tokio::spawn(aggregator.run());

    // Ctrl-C drains workers gracefully; in-flight evaluations finish first.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received; draining workers");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut worker_tasks = Vec::new();
    for i in 1..=workers {
        let (worker, _state) = Worker::new(
            broker.clone(),
            &config,
            format!("worker-{i}"),
            shutdown_rx.clone(),
        );
        worker_tasks.push(tokio::spawn(worker.run()));
    }

    // Live stats line once per second while the run progresses.
    let ticker = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await;
            loop {
                interval.tick().await;
                let s = handle.snapshot();
                if s.count > 0 {
                    info!(
                        count = s.count,
                        mean = format!("{:.4}", s.mean),
                        std_dev = format!("{:.4}", s.std_dev),
                        "running stats"
                    );
                }
            }
        })
    };

    let producer_stats =
        run_producer(&broker, &config, &ModelSource::Path(model), scenarios).await?;

    let mut processed = 0u64;
    let mut failed = 0u64;
    for task in worker_tasks {
        let worker_stats = task.await??;
        processed += worker_stats.processed;
        failed += worker_stats.failed;
    }

    broker.results().close();
    let stats = agg_task.await??;
    ticker.abort();

    println!("\n=== Simulation Complete ===");
    println!("Scenarios:   {}", producer_stats.published);
    println!("Evaluated:   {processed}");
    println!("Failed:      {failed}");
    println!("Results:     {}", stats.count());
    if stats.count() > 0 {
        println!("Mean:        {:.4}", stats.mean());
        println!("Std dev:     {:.4}", stats.std_dev());
        println!("Min:         {:.4}", stats.min().unwrap_or(f64::NAN));
        println!("Max:         {:.4}", stats.max().unwrap_or(f64::NAN));
    }
    println!("Workers:");
    for (id, count) in stats.per_worker() {
        println!("  {id}: {count}");
    }
    println!("Runtime:     {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}
