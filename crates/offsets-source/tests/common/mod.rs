//! In-memory transport and recording diagnostics shared by the pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use offsets_fixtures::{offset_commit_key, offset_commit_value, sample_offset_commit};
use offsets_source::{
    DecodeFailure, DiagnosticSink, Error, GroupMetadataEntry, RawRecord, RecordStream, Result,
    StartPosition, Transport,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offsets_source=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Serves fixed records per partition.
///
/// With `keep_open`, streams stay pending after the last record like a live
/// topic; otherwise they end.
#[derive(Default)]
pub struct MemoryTransport {
    pub partitions: BTreeMap<i32, Vec<RawRecord>>,
    pub keep_open: bool,
    pub fail_listing: bool,
    pub fail_open: Option<i32>,
    pub opened: Arc<AtomicUsize>,
}

impl MemoryTransport {
    pub fn new(partitions: BTreeMap<i32, Vec<RawRecord>>) -> Self {
        Self {
            partitions,
            ..Default::default()
        }
    }

    pub fn live(partitions: BTreeMap<i32, Vec<RawRecord>>) -> Self {
        Self {
            partitions,
            keep_open: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn list_partitions(&self, topic: &str) -> Result<Vec<i32>> {
        if self.fail_listing {
            return Err(Error::Connectivity(format!("cluster unreachable for {topic}")));
        }
        Ok(self.partitions.keys().copied().collect())
    }

    async fn open_partition_stream(
        &self,
        _topic: &str,
        partition: i32,
        start: StartPosition,
    ) -> Result<RecordStream> {
        assert_eq!(start, StartPosition::Oldest);
        if self.fail_open == Some(partition) {
            return Err(Error::OpenStream {
                partition,
                reason: "leader not available".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let records: Vec<Result<RawRecord>> = self
            .partitions
            .get(&partition)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Ok)
            .collect();
        let stream = futures::stream::iter(records);
        if self.keep_open {
            Ok(stream.chain(futures::stream::pending()).boxed())
        } else {
            Ok(stream.boxed())
        }
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    pub failures: Mutex<Vec<(i32, i64, DecodeFailure)>>,
    pub groups: Mutex<Vec<(i32, GroupMetadataEntry)>>,
    pub stream_errors: Mutex<Vec<i32>>,
}

impl DiagnosticSink for RecordingDiagnostics {
    fn decode_failure(&self, partition: i32, offset: i64, failure: &DecodeFailure) {
        self.failures
            .lock()
            .unwrap()
            .push((partition, offset, failure.clone()));
    }

    fn group_metadata(&self, partition: i32, _offset: i64, entry: GroupMetadataEntry) {
        self.groups.lock().unwrap().push((partition, entry));
    }

    fn stream_error(&self, partition: i32, _error: &Error) {
        self.stream_errors.lock().unwrap().push(partition);
    }
}

/// An offset commit record for `partition` of topic "orders", tagged with its
/// position in the offsets partition.
pub fn commit_record(offsets_partition_offset: i64, group: &str, partition: i32, offset: i64) -> RawRecord {
    let entry = sample_offset_commit(group, "orders", partition, offset);
    RawRecord::new(
        offset_commit_key(1, group, "orders", partition),
        offset_commit_value(3, &entry),
        offsets_partition_offset,
    )
}

/// Polls `condition` until it holds, yielding to the spawned workers in between.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}
