//! Tailer for the Kafka consumer offsets topic.
//!
//! Features:
//!
//! - Versioned decoding of `__consumer_offsets` keys and values into
//!   offset commits and group metadata snapshots
//! - One concurrent worker per partition, fanned into a single bounded channel
//! - Coordinated shutdown that waits for every worker
//! - Pluggable transport, with a librdkafka implementation

/// Pure decoding of raw offsets records
pub mod decoder;

/// Sink for group metadata, decode failures and stream errors
pub mod diagnostics;

pub mod error;

/// librdkafka-backed transport
pub mod kafka;

/// Starts and stops the partition workers
pub mod consumer;
pub mod transport;
pub mod worker;

// Re-export main types for easy access
pub use consumer::{ConsumerConfig, ConsumerState, OffsetTopicConsumer};
pub use decoder::decode;
pub use diagnostics::{DiagnosticSink, TracingDiagnostics};
pub use error::{Error, Result};
pub use kafka::{KafkaConfig, KafkaTransport};
pub use transport::{RawRecord, RecordStream, StartPosition, Transport};
pub use worker::{PartitionWorker, WorkerExit};

pub use offsets_types::{
    DecodeFailure, FailureReason, GroupMetadataEntry, Member, OffsetCommitEntry, OffsetsRecord,
};
