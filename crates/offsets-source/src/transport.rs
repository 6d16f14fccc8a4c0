//! Seam between the tailer and the cluster client.
//!
//! The tailer only needs two things from a cluster: the partitions of a topic
//! and an ordered stream of raw records per partition. [`crate::KafkaTransport`]
//! implements this on top of librdkafka; tests use in-memory streams.

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A record as read from the offsets topic, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record key, empty when the record had none
    pub key: Vec<u8>,
    /// Record value, empty for tombstones
    pub value: Vec<u8>,
    /// Position of the record within its partition of the offsets topic
    pub offset: i64,
}

impl RawRecord {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, offset: i64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            offset,
        }
    }

    /// Compacted topics mark deleted keys with an empty value.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

/// Where a partition stream begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPosition {
    /// Oldest retained record, replaying the whole compacted state
    #[default]
    Oldest,
    /// Only records written after the stream is opened
    Newest,
}

/// Ordered records of one partition. Items are either records or transient
/// stream errors; the stream ending means the partition will deliver nothing more.
pub type RecordStream = BoxStream<'static, Result<RawRecord>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Lists the partition ids of `topic`.
    ///
    /// Fails when the cluster cannot be reached or the topic does not exist.
    async fn list_partitions(&self, topic: &str) -> Result<Vec<i32>>;

    /// Opens a stream over one partition of `topic`.
    async fn open_partition_stream(
        &self,
        topic: &str,
        partition: i32,
        start: StartPosition,
    ) -> Result<RecordStream>;
}
