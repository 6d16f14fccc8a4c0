//! offsets-tail
//!
//! Tails the Kafka `__consumer_offsets` topic and keeps the latest committed
//! offset of every consumer group in memory.
//!
//! # CLI Usage
//!
//! ```bash
//! # Replay the retained offsets topic and keep tailing it
//! offsets-tail --brokers kafka1:9092,kafka2:9092
//!
//! # Only watch new commits, writing the final state on Ctrl-C
//! offsets-tail --brokers kafka1:9092 --start-from newest --snapshot-path offsets.json
//! ```

pub mod config;
pub mod store;

pub use config::{Config, StartFrom};
pub use store::{OffsetStore, SharedStore, StoreSnapshot};

use anyhow::Context;
use chrono::Utc;
use offsets_source::{
    DiagnosticSink, KafkaTransport, OffsetTopicConsumer, TracingDiagnostics, Transport, WorkerExit,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Outcome of a finished pipeline run.
#[derive(Debug)]
pub struct RunSummary {
    /// Offset commits applied to the store
    pub applied: u64,
    /// How each partition worker exited
    pub worker_exits: Vec<(i32, WorkerExit)>,
}

/// Runs the tailer until `shutdown` resolves.
///
/// Commits flow from the partition workers through a bounded channel into
/// `store`. Every report interval, expired commits are evicted and the store
/// size is logged. On shutdown all workers are stopped, the channel is drained
/// into the store, and the snapshot is written if a path is configured.
pub async fn run_pipeline<T, F>(
    transport: T,
    config: &Config,
    store: SharedStore,
    diagnostics: Arc<dyn DiagnosticSink>,
    shutdown: F,
) -> anyhow::Result<RunSummary>
where
    T: Transport,
    F: Future<Output = ()>,
{
    anyhow::ensure!(
        !config.report_interval.is_zero(),
        "Report interval must be greater than zero"
    );
    anyhow::ensure!(config.sink_capacity > 0, "Sink capacity must be greater than zero");

    let (tx, rx) = mpsc::channel(config.sink_capacity);
    let drain_handle = tokio::spawn(store::drain(rx, Arc::clone(&store)));

    let mut consumer =
        OffsetTopicConsumer::new(transport, config.consumer_config(), tx, diagnostics);
    if let Err(e) = consumer.start().await {
        // The consumer released its sender, so the drain task ends on its own
        let _ = drain_handle.await;
        return Err(e).with_context(|| {
            format!("Failed to start tailing offsets topic '{}'", config.offsets_topic)
        });
    }
    info!(
        topic = %config.offsets_topic,
        partitions = consumer.partitions().len(),
        "Tailing offsets topic"
    );

    let mut ticker = tokio::time::interval(config.report_interval);
    // The first tick completes immediately
    ticker.tick().await;
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let mut store = store.lock().await;
                let evicted = store.evict_expired(Utc::now());
                info!(
                    groups = store.groups().len(),
                    offsets = store.len(),
                    evicted,
                    "Offset store status"
                );
            }
        }
    }

    let worker_exits = consumer
        .shutdown()
        .await
        .context("Failed to stop partition consumers")?;
    drop(consumer);

    let applied = drain_handle
        .await
        .context("Offset store task failed")?;
    info!(applied, "Offset store drained");

    if let Some(path) = &config.snapshot_path {
        let snapshot = store.lock().await.snapshot();
        store::write_snapshot(path, &snapshot)?;
        info!(path = %path.display(), offsets = snapshot.offsets.len(), "Wrote offset snapshot");
    }

    Ok(RunSummary {
        applied,
        worker_exits,
    })
}

/// Tails the configured cluster until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let transport =
        KafkaTransport::new(config.kafka_config()).context("Failed to create Kafka client")?;
    let store: SharedStore = Arc::new(Mutex::new(OffsetStore::new()));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C, shutting down: {e}");
        }
    };

    let summary = run_pipeline(
        transport,
        &config,
        Arc::clone(&store),
        Arc::new(TracingDiagnostics),
        shutdown,
    )
    .await?;

    let store = store.lock().await;
    info!(
        applied = summary.applied,
        groups = store.groups().len(),
        offsets = store.len(),
        "Stopped"
    );
    Ok(())
}
