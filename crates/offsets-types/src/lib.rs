//! Domain types for the Kafka consumer offsets topic.
//!
//! Records in `__consumer_offsets` are binary and carry a leading key version
//! that selects between two kinds of entries:
//!
//! ```text
//! key version 0, 1  →  OffsetCommitEntry   (group, topic, partition → offset)
//! key version 2     →  GroupMetadataEntry  (group membership snapshot)
//! ```
//!
//! This crate only holds the decoded shapes and the decode failure taxonomy.
//! Decoding lives in `offsets-source`; encoding for tests lives in
//! `offsets-fixtures`.
//!
//! # Modules
//!
//! - [`record`] - Decoded entries and the [`OffsetsRecord`] sum type
//! - [`error`] - [`DecodeFailure`] and its [`FailureReason`]

pub mod error;
pub mod record;

pub use error::{DecodeFailure, FailureReason};
pub use record::{GroupMetadataEntry, Member, OffsetCommitEntry, OffsetsRecord};

/// Key version of an offset commit written by old (ZooKeeper era) brokers.
pub const KEY_VERSION_OFFSET_COMMIT_V0: i16 = 0;
/// Key version of an offset commit.
pub const KEY_VERSION_OFFSET_COMMIT_V1: i16 = 1;
/// Key version of a group metadata record.
pub const KEY_VERSION_GROUP_METADATA: i16 = 2;

/// Highest offset commit value version the decoder understands.
pub const MAX_OFFSET_COMMIT_VALUE_VERSION: i16 = 3;
/// Highest group metadata value version the decoder understands.
pub const MAX_GROUP_METADATA_VALUE_VERSION: i16 = 3;

/// Default name of the consumer offsets topic.
pub const DEFAULT_OFFSETS_TOPIC: &str = "__consumer_offsets";
