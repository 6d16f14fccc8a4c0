//! Diagnostic sink for everything that is not an offset commit.
//!
//! Group metadata snapshots, decode failures and transient stream errors are
//! reported here instead of the output channel. The sink is injected so tests
//! and embedding applications can observe these events without scraping logs.

use crate::error::Error;
use offsets_types::{DecodeFailure, GroupMetadataEntry};
use tracing::{debug, error, warn};

pub trait DiagnosticSink: Send + Sync {
    /// A record could not be decoded and was skipped.
    fn decode_failure(&self, partition: i32, offset: i64, failure: &DecodeFailure);

    /// A group metadata snapshot was decoded.
    fn group_metadata(&self, partition: i32, offset: i64, entry: GroupMetadataEntry);

    /// The partition stream reported an error; tailing continues.
    fn stream_error(&self, partition: i32, error: &Error);
}

/// Default sink that turns diagnostics into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn decode_failure(&self, partition: i32, offset: i64, failure: &DecodeFailure) {
        warn!(
            offset_partition = partition,
            offset_offset = offset,
            reason = %failure.reason,
            key_version = ?failure.key_version,
            detail = %failure.detail,
            "Failed to decode offsets record"
        );
    }

    fn group_metadata(&self, partition: i32, offset: i64, entry: GroupMetadataEntry) {
        debug!(
            offset_partition = partition,
            offset_offset = offset,
            group = %entry.group,
            protocol_type = %entry.protocol_type,
            generation = entry.generation_id,
            protocol = %entry.protocol,
            leader = %entry.leader_id,
            members = entry.members.len(),
            "Group metadata"
        );
    }

    fn stream_error(&self, partition: i32, error: &Error) {
        error!(offset_partition = partition, "Consume error: {error}");
    }
}
