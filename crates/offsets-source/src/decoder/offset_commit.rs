use super::reader::Reader;
use super::{failure, unsupported_value_version, Part};
use offsets_types::{
    DecodeFailure, FailureReason, OffsetCommitEntry, MAX_OFFSET_COMMIT_VALUE_VERSION,
};

/// Decodes an offset commit. The key reader is positioned after the key version.
pub(super) fn decode(
    key_version: i16,
    key: &mut Reader<'_>,
    value: &[u8],
) -> Result<OffsetCommitEntry, DecodeFailure> {
    let key_err = |e| failure(Part::Key, key_version, e);
    let group = key.read_string("group").map_err(key_err)?;
    let topic = key.read_string("topic").map_err(key_err)?;
    let partition = key.read_i32("partition").map_err(key_err)?;

    if group.is_empty() {
        return Err(DecodeFailure::new(
            FailureReason::MalformedKey,
            Some(key_version),
            "group: empty group id",
        ));
    }
    if partition < 0 {
        return Err(DecodeFailure::new(
            FailureReason::MalformedKey,
            Some(key_version),
            format!("partition: negative partition {partition}"),
        ));
    }

    let value_err = |e| failure(Part::Value, key_version, e);
    let mut value = Reader::new(value);
    let value_version = value.read_i16("value version").map_err(value_err)?;
    if !(0..=MAX_OFFSET_COMMIT_VALUE_VERSION).contains(&value_version) {
        return Err(unsupported_value_version(
            key_version,
            value_version,
            "offset commit",
        ));
    }

    // v0 and v2 share a layout; v1 adds an expiry, v3 adds the leader epoch
    let (offset, leader_epoch, metadata, commit_timestamp, expire_timestamp) = match value_version {
        0 | 2 => {
            let offset = value.read_i64("offset").map_err(value_err)?;
            let metadata = value.read_string("metadata").map_err(value_err)?;
            let commit = value.read_timestamp("commit timestamp").map_err(value_err)?;
            (offset, None, metadata, commit, None)
        }
        1 => {
            let offset = value.read_i64("offset").map_err(value_err)?;
            let metadata = value.read_string("metadata").map_err(value_err)?;
            let commit = value.read_timestamp("commit timestamp").map_err(value_err)?;
            let expire = value
                .read_optional_timestamp("expire timestamp")
                .map_err(value_err)?;
            (offset, None, metadata, commit, expire)
        }
        // 3
        _ => {
            let offset = value.read_i64("offset").map_err(value_err)?;
            let epoch = value.read_i32("leader epoch").map_err(value_err)?;
            let metadata = value.read_string("metadata").map_err(value_err)?;
            let commit = value.read_timestamp("commit timestamp").map_err(value_err)?;
            (offset, (epoch >= 0).then_some(epoch), metadata, commit, None)
        }
    };

    Ok(OffsetCommitEntry {
        group,
        topic,
        partition,
        offset,
        leader_epoch,
        metadata,
        commit_timestamp,
        expire_timestamp,
    })
}
