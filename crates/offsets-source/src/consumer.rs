//! Orchestrates one [`PartitionWorker`] per partition of the offsets topic.

use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::transport::{StartPosition, Transport};
use crate::worker::{PartitionWorker, WorkerExit};
use offsets_types::{OffsetCommitEntry, DEFAULT_OFFSETS_TOPIC};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Configuration for the offsets topic consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Name of the offsets topic
    pub topic: String,
    /// Where every partition stream begins
    ///
    /// `Oldest` replays the compacted topic and rebuilds the full state of
    /// every group; `Newest` only observes commits made from now on.
    pub start_position: StartPosition,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_OFFSETS_TOPIC.to_string(),
            start_position: StartPosition::Oldest,
        }
    }
}

/// Lifecycle of an [`OffsetTopicConsumer`]. There is no way back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsumerState::Created => "created",
            ConsumerState::Running => "running",
            ConsumerState::ShuttingDown => "shutting down",
            ConsumerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Consumes every partition of the offsets topic and fans decoded offset
/// commits into a single bounded channel.
///
/// ```ignore
/// let (tx, mut rx) = tokio::sync::mpsc::channel(1000);
/// let mut consumer = OffsetTopicConsumer::new(
///     transport,
///     ConsumerConfig::default(),
///     tx,
///     Arc::new(TracingDiagnostics),
/// );
/// consumer.start().await?;
/// while let Some(entry) = rx.recv().await { /* ... */ }
/// consumer.shutdown().await?;
/// ```
pub struct OffsetTopicConsumer<T: Transport> {
    transport: T,
    config: ConsumerConfig,
    sink: Option<mpsc::Sender<OffsetCommitEntry>>,
    diagnostics: Arc<dyn DiagnosticSink>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<(i32, JoinHandle<WorkerExit>)>,
    state: ConsumerState,
}

impl<T: Transport> OffsetTopicConsumer<T> {
    pub fn new(
        transport: T,
        config: ConsumerConfig,
        sink: mpsc::Sender<OffsetCommitEntry>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            transport,
            config,
            sink: Some(sink),
            diagnostics,
            shutdown_tx,
            workers: Vec::new(),
            state: ConsumerState::Created,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Partitions with a spawned worker, in spawn order.
    pub fn partitions(&self) -> Vec<i32> {
        self.workers.iter().map(|(partition, _)| *partition).collect()
    }

    /// Discovers the partitions of the offsets topic and spawns one worker per partition.
    ///
    /// Only valid once, from `Created`. Any transport failure aborts startup:
    /// workers spawned so far are stopped, the consumer ends up `Stopped`, and
    /// the error is returned.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != ConsumerState::Created {
            return Err(Error::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        let Some(sink) = self.sink.clone() else {
            return Err(Error::InvalidState {
                operation: "start",
                state: self.state,
            });
        };

        let topic = self.config.topic.clone();
        let partitions = match self.transport.list_partitions(&topic).await {
            Ok(partitions) => partitions,
            Err(e) => {
                error!(topic = %topic, "Failed to get partition count: {e}");
                self.abort_startup().await;
                return Err(e);
            }
        };

        info!(topic = %topic, count = partitions.len(), "Starting consumers");
        for partition in partitions {
            let stream = match self
                .transport
                .open_partition_stream(&topic, partition, self.config.start_position)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    error!(topic = %topic, partition, "Could not start consumer: {e}");
                    self.abort_startup().await;
                    return Err(e);
                }
            };

            let worker = PartitionWorker::new(
                partition,
                stream,
                sink.clone(),
                self.shutdown_tx.subscribe(),
                Arc::clone(&self.diagnostics),
            );
            let handle = tokio::spawn(worker.run());
            self.workers.push((partition, handle));
        }

        self.state = ConsumerState::Running;
        info!(topic = %topic, count = self.workers.len(), "Started all consumers");
        Ok(())
    }

    /// Signals every worker to stop and waits until all of them have finished.
    ///
    /// Once this returns, no worker is running and no further entries will be
    /// sent. The consumer's own handle on the output channel is released, so
    /// the receiving side sees the channel close once it is drained.
    ///
    /// Returns how each partition's worker exited. Calling it on a consumer
    /// that was never started moves it straight to `Stopped`; calling it again
    /// after stopping is a no-op.
    pub async fn shutdown(&mut self) -> Result<Vec<(i32, WorkerExit)>> {
        match self.state {
            ConsumerState::Running => {
                self.state = ConsumerState::ShuttingDown;
                info!(topic = %self.config.topic, count = self.workers.len(), "Shutting down consumers");
                let exits = self.stop_workers().await;
                self.sink = None;
                self.state = ConsumerState::Stopped;
                info!(topic = %self.config.topic, "All consumers stopped");
                Ok(exits)
            }
            ConsumerState::Created => {
                self.sink = None;
                self.state = ConsumerState::Stopped;
                Ok(Vec::new())
            }
            ConsumerState::Stopped => Ok(Vec::new()),
            ConsumerState::ShuttingDown => Err(Error::InvalidState {
                operation: "shut down",
                state: self.state,
            }),
        }
    }

    async fn abort_startup(&mut self) {
        self.stop_workers().await;
        self.sink = None;
        self.state = ConsumerState::Stopped;
    }

    async fn stop_workers(&mut self) -> Vec<(i32, WorkerExit)> {
        // No receivers left just means every worker already returned
        let _ = self.shutdown_tx.send(());

        let mut exits = Vec::with_capacity(self.workers.len());
        for (partition, handle) in self.workers.drain(..) {
            match handle.await {
                Ok(exit) => exits.push((partition, exit)),
                Err(e) => warn!(partition, "Partition consumer task failed: {e}"),
            }
        }
        exits
    }
}
