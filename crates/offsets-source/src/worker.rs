//! Read loop for a single partition of the offsets topic.

use crate::decoder::decode;
use crate::diagnostics::DiagnosticSink;
use crate::transport::{RawRecord, RecordStream};
use futures::StreamExt;
use offsets_types::{OffsetCommitEntry, OffsetsRecord};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

/// Why a partition worker returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The shutdown signal was observed
    Cancelled,
    /// The partition stream finished
    StreamEnded,
    /// Nobody is draining the output channel anymore
    SinkClosed,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerExit::Cancelled => "cancelled",
            WorkerExit::StreamEnded => "stream ended",
            WorkerExit::SinkClosed => "sink closed",
        };
        f.write_str(s)
    }
}

/// Tails one partition and forwards decoded offset commits to the shared sink.
///
/// Records are handled strictly in stream order, so commits of one partition
/// reach the sink in the order they were written.
pub struct PartitionWorker {
    partition: i32,
    stream: RecordStream,
    sink: mpsc::Sender<OffsetCommitEntry>,
    shutdown: broadcast::Receiver<()>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl PartitionWorker {
    pub fn new(
        partition: i32,
        stream: RecordStream,
        sink: mpsc::Sender<OffsetCommitEntry>,
        shutdown: broadcast::Receiver<()>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            partition,
            stream,
            sink,
            shutdown,
            diagnostics,
        }
    }

    /// Runs until shutdown, end of stream, or the sink closing.
    ///
    /// Shutdown is observed both while waiting for a record and while blocked
    /// on a full sink; once observed, nothing more is sent.
    pub async fn run(mut self) -> WorkerExit {
        debug!(partition = self.partition, "Partition consumer started");

        let exit = loop {
            // An error from recv means the sender is gone, which is a shutdown too
            let next = tokio::select! {
                biased;
                _ = self.shutdown.recv() => break WorkerExit::Cancelled,
                next = self.stream.next() => next,
            };

            let record = match next {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    self.diagnostics.stream_error(self.partition, &e);
                    continue;
                }
                None => break WorkerExit::StreamEnded,
            };

            let Some(entry) = self.process(record) else {
                continue;
            };

            let sent = tokio::select! {
                biased;
                _ = self.shutdown.recv() => break WorkerExit::Cancelled,
                sent = self.sink.send(entry) => sent,
            };
            if sent.is_err() {
                break WorkerExit::SinkClosed;
            }
        };

        debug!(partition = self.partition, %exit, "Partition consumer stopped");
        exit
    }

    /// Decodes a record, returning the entry to forward if it is an offset commit.
    fn process(&self, record: RawRecord) -> Option<OffsetCommitEntry> {
        if record.is_tombstone() {
            trace!(
                partition = self.partition,
                offset = record.offset,
                "Dropped tombstone"
            );
            return None;
        }

        match decode(&record.key, &record.value) {
            Ok(OffsetsRecord::OffsetCommit(entry)) => {
                trace!(
                    group = %entry.group,
                    topic = %entry.topic,
                    partition = entry.partition,
                    offset = entry.offset,
                    "Decoded offset commit"
                );
                Some(entry)
            }
            Ok(OffsetsRecord::GroupMetadata(entry)) => {
                self.diagnostics
                    .group_metadata(self.partition, record.offset, entry);
                None
            }
            Err(failure) => {
                self.diagnostics
                    .decode_failure(self.partition, record.offset, &failure);
                None
            }
        }
    }
}
