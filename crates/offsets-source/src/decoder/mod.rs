//! Versioned decoding of consumer offsets records.
//!
//! Every record key starts with a big-endian i16 key version that selects
//! the record kind; every value starts with its own i16 value version that
//! selects the field layout. Both are closed sets: anything unrecognised is
//! reported as a [`DecodeFailure`] and never guessed at.
//!
//! ```text
//! key v0/v1: version | group | topic | partition
//! key v2:    version | group
//! ```
//!
//! Decoding is pure. It allocates the decoded entry and nothing else, and
//! never panics on malformed input.

mod group_metadata;
mod offset_commit;
mod reader;

use offsets_types::{
    DecodeFailure, FailureReason, OffsetsRecord, KEY_VERSION_GROUP_METADATA,
    KEY_VERSION_OFFSET_COMMIT_V0, KEY_VERSION_OFFSET_COMMIT_V1,
};
use reader::{ReadError, Reader};

/// Decode one record of the consumer offsets topic.
///
/// Only defined for non-empty values: tombstones must be filtered out by the
/// caller before decoding.
pub fn decode(key: &[u8], value: &[u8]) -> Result<OffsetsRecord, DecodeFailure> {
    let mut key_reader = Reader::new(key);
    let key_version = key_reader.read_i16("key version").map_err(|_| {
        DecodeFailure::new(
            FailureReason::TruncatedKey,
            None,
            format!("key has {} byte(s), need 2 for the version", key.len()),
        )
    })?;

    match key_version {
        KEY_VERSION_OFFSET_COMMIT_V0 | KEY_VERSION_OFFSET_COMMIT_V1 => {
            offset_commit::decode(key_version, &mut key_reader, value)
                .map(OffsetsRecord::OffsetCommit)
        }
        KEY_VERSION_GROUP_METADATA => {
            group_metadata::decode(key_version, &mut key_reader, value)
                .map(OffsetsRecord::GroupMetadata)
        }
        other => Err(DecodeFailure::unknown_key_version(other)),
    }
}

/// Which half of the record a read error came from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Part {
    Key,
    Value,
}

pub(crate) fn failure(part: Part, key_version: i16, err: ReadError) -> DecodeFailure {
    let (reason, detail) = match (part, err) {
        (Part::Key, ReadError::Truncated(detail)) => (FailureReason::TruncatedKey, detail),
        (Part::Key, ReadError::Malformed(detail)) => (FailureReason::MalformedKey, detail),
        (Part::Value, ReadError::Truncated(detail)) => (FailureReason::TruncatedValue, detail),
        (Part::Value, ReadError::Malformed(detail)) => (FailureReason::MalformedValue, detail),
    };
    DecodeFailure::new(reason, Some(key_version), detail)
}

pub(crate) fn unsupported_value_version(key_version: i16, value_version: i16, kind: &str) -> DecodeFailure {
    DecodeFailure::new(
        FailureReason::MalformedValue,
        Some(key_version),
        format!("unsupported {kind} value version {value_version}"),
    )
}
