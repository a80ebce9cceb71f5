//! The three roles of the system.
//!
//! - **Producer**: parses the model, publishes it once, fans out scenarios.
//! - **Worker**: caches the model once, evaluates scenarios forever.
//! - **Aggregator**: reduces results into running statistics.
//!
//! Roles hold nothing in common but a `Broker` handle; all coordination is
//! message passing.

pub mod aggregator;
pub mod producer;
pub mod worker;

pub use aggregator::{Aggregator, AggregatorHandle};
pub use producer::{run_producer, ModelSource, ProducerStats};
pub use worker::{Worker, WorkerState, WorkerStats};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use crate::models::config::Config;
    use crate::models::message::{ModelEnvelope, Scenario, ResultMsg};
    use crate::models::spec::{Distribution, ModelSpec, Variable};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::sync::watch;

    fn broker() -> Broker {
        Broker::connect(&Config::default().broker).unwrap()
    }

    fn scenario_bytes(id: u64, pairs: &[(&str, f64)]) -> Vec<u8> {
        let values: BTreeMap<String, f64> =
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Scenario { id, values }.to_bytes().unwrap()
    }

    #[tokio::test]
    async fn constant_model_yields_exact_results() {
        let config = Config::default();
        let broker = broker();

        let (aggregator, _handle) = Aggregator::new(broker.clone());
        let agg_task = tokio::spawn(aggregator.run());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut workers = Vec::new();
        for i in 1..=2 {
            let (worker, _state) = Worker::new(
                broker.clone(),
                &config,
                format!("worker-{i}"),
                shutdown_rx.clone(),
            );
            workers.push(tokio::spawn(worker.run()));
        }

        let text = "FUNCTION: x + y\nVARIABLES:\n\
                    x: uniform(min=0, max=0)\ny: uniform(min=5, max=5)\n";
        let stats = run_producer(&broker, &config, &ModelSource::Text(text.to_string()), 10)
            .await
            .unwrap();
        assert_eq!(stats.published, 10);

        for task in workers {
            task.await.unwrap().unwrap();
        }
        broker.results().close();

        let final_stats = agg_task.await.unwrap().unwrap();
        assert_eq!(final_stats.count(), 10);
        assert_eq!(final_stats.mean(), 5.0);
        assert_eq!(final_stats.min(), Some(5.0));
        assert_eq!(final_stats.max(), Some(5.0));
        assert_eq!(final_stats.per_worker().values().sum::<u64>(), 10);

        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn producer_publishes_distinct_monotone_ids() {
        let config = Config::default();
        let broker = broker();

        let text = "FUNCTION: x\nVARIABLES:\nx: normal(media=0, desviacion=1)\n";
        let stats = run_producer(&broker, &config, &ModelSource::Text(text.to_string()), 50)
            .await
            .unwrap();
        assert_eq!(stats.published, 50);

        let mut ids = Vec::new();
        while let Ok(delivery) = broker.scenarios().consume().await {
            ids.push(Scenario::from_bytes(delivery.payload()).unwrap().id);
            delivery.ack();
        }
        assert_eq!(ids, (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn zero_scenarios_is_a_valid_run() {
        let config = Config::default();
        let broker = broker();

        let text = "FUNCTION: x\nVARIABLES:\nx: uniform(min=0, max=1)\n";
        let stats = run_producer(&broker, &config, &ModelSource::Text(text.to_string()), 0)
            .await
            .unwrap();
        assert_eq!(stats.published, 0);
        assert!(broker.scenarios().is_empty());
    }

    #[tokio::test]
    async fn seeded_runs_generate_identical_scenarios() {
        let mut config = Config::default();
        config.simulation.seed = Some(99);
        let text = "FUNCTION: x\nVARIABLES:\nx: normal(media=0, desviacion=1)\n";

        let mut runs = Vec::new();
        for _ in 0..2 {
            let broker = broker();
            run_producer(&broker, &config, &ModelSource::Text(text.to_string()), 5)
                .await
                .unwrap();
            let mut scenarios = Vec::new();
            while let Ok(delivery) = broker.scenarios().consume().await {
                scenarios.push(Scenario::from_bytes(delivery.payload()).unwrap());
                delivery.ack();
            }
            runs.push(scenarios);
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn worker_without_model_never_leaves_awaiting() {
        let config = Config::default();
        let broker = broker();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let (worker, state_rx) = Worker::new(broker.clone(), &config, "w-1", shutdown_rx);
        let task = tokio::spawn(worker.run());

        // A scenario is waiting, but no model ever arrives.
        broker.scenarios().publish(scenario_bytes(1, &[("x", 1.0)])).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*state_rx.borrow(), WorkerState::AwaitingModel);
        assert!(broker.results().is_empty());
        assert_eq!(broker.scenarios().len(), 1);

        task.abort();
    }

    #[tokio::test]
    async fn evaluation_failure_drops_scenario_and_continues() {
        let config = Config::default();
        let broker = broker();

        let spec = ModelSpec::new(
            "sqrt(x)",
            vec![Variable::new("x", Distribution::uniform(0.0, 1.0).unwrap())],
        )
        .unwrap();
        let envelope = ModelEnvelope::from_spec(&spec, Duration::from_secs(60));
        broker
            .model()
            .publish(envelope.to_bytes().unwrap(), envelope.ttl())
            .unwrap();

        // sqrt(-1) fails; sqrt(4) succeeds.
        broker.scenarios().publish(scenario_bytes(1, &[("x", -1.0)])).unwrap();
        broker.scenarios().publish(scenario_bytes(2, &[("x", 4.0)])).unwrap();
        broker.scenarios().close();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (worker, state_rx) = Worker::new(broker.clone(), &config, "w-1", shutdown_rx);
        let stats = worker.run().await.unwrap();

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(*state_rx.borrow(), WorkerState::Draining);

        let delivery = broker.results().consume().await.unwrap();
        let result = ResultMsg::from_bytes(delivery.payload()).unwrap();
        delivery.ack();
        assert_eq!(result.scenario_id, 2);
        assert_eq!(result.value, 2.0);
        assert!(broker.results().is_empty());
    }

    #[tokio::test]
    async fn shutdown_signal_drains_worker() {
        let config = Config::default();
        let broker = broker();

        let spec = ModelSpec::new(
            "x",
            vec![Variable::new("x", Distribution::uniform(0.0, 1.0).unwrap())],
        )
        .unwrap();
        let envelope = ModelEnvelope::from_spec(&spec, Duration::from_secs(60));
        broker
            .model()
            .publish(envelope.to_bytes().unwrap(), envelope.ttl())
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (worker, state_rx) = Worker::new(broker.clone(), &config, "w-1", shutdown_rx);
        let task = tokio::spawn(worker.run());

        // Wait until the worker has cached the model.
        let mut state_rx_wait = state_rx.clone();
        while *state_rx_wait.borrow() != WorkerState::Ready {
            state_rx_wait.changed().await.unwrap();
        }

        shutdown_tx.send(true).unwrap();
        let stats = task.await.unwrap().unwrap();
        assert_eq!(stats.processed, 0);
        assert_eq!(*state_rx.borrow(), WorkerState::Draining);
    }

    #[tokio::test]
    async fn cached_model_survives_republish() {
        let config = Config::default();
        let broker = broker();

        let publish_model = |expr: &str| {
            let spec = ModelSpec::new(
                expr,
                vec![Variable::new("x", Distribution::uniform(0.0, 1.0).unwrap())],
            )
            .unwrap();
            let envelope = ModelEnvelope::from_spec(&spec, Duration::from_secs(60));
            broker
                .model()
                .publish(envelope.to_bytes().unwrap(), envelope.ttl())
                .unwrap();
        };

        publish_model("x + 100");

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (worker, state_rx) = Worker::new(broker.clone(), &config, "w-1", shutdown_rx);
        let task = tokio::spawn(worker.run());

        let mut state_rx_wait = state_rx.clone();
        while *state_rx_wait.borrow() != WorkerState::Ready {
            state_rx_wait.changed().await.unwrap();
        }

        // Republish a different model, then send work. The worker must keep
        // evaluating with the copy it already cached.
        publish_model("x + 999");
        broker.scenarios().publish(scenario_bytes(1, &[("x", 1.0)])).unwrap();
        broker.scenarios().close();

        task.await.unwrap().unwrap();
        let delivery = broker.results().consume().await.unwrap();
        let result = ResultMsg::from_bytes(delivery.payload()).unwrap();
        delivery.ack();
        assert_eq!(result.value, 101.0);
    }
}
