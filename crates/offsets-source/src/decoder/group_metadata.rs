use super::reader::{ReadError, Reader};
use super::{failure, unsupported_value_version, Part};
use offsets_types::{DecodeFailure, GroupMetadataEntry, Member, MAX_GROUP_METADATA_VALUE_VERSION};

/// Decodes a group metadata snapshot. The key reader is positioned after the key version.
pub(super) fn decode(
    key_version: i16,
    key: &mut Reader<'_>,
    value: &[u8],
) -> Result<GroupMetadataEntry, DecodeFailure> {
    let group = key
        .read_string("group")
        .map_err(|e| failure(Part::Key, key_version, e))?;

    let value_err = |e| failure(Part::Value, key_version, e);
    let mut value = Reader::new(value);
    let value_version = value.read_i16("value version").map_err(value_err)?;
    if !(0..=MAX_GROUP_METADATA_VALUE_VERSION).contains(&value_version) {
        return Err(unsupported_value_version(
            key_version,
            value_version,
            "group metadata",
        ));
    }

    let protocol_type = value.read_string("protocol type").map_err(value_err)?;
    let generation_id = value.read_i32("generation").map_err(value_err)?;
    let protocol = value
        .read_nullable_string("protocol")
        .map_err(value_err)?
        .unwrap_or_default();
    let leader_id = value
        .read_nullable_string("leader")
        .map_err(value_err)?
        .unwrap_or_default();
    let state_timestamp = if value_version >= 2 {
        value
            .read_optional_timestamp("current state timestamp")
            .map_err(value_err)?
    } else {
        None
    };

    let count = value.read_array_len("members").map_err(value_err)?;
    // Every member takes at least 16 bytes, so a huge count cannot force a huge allocation
    let mut members = Vec::with_capacity(count.min(value.remaining() / 16));
    for index in 0..count {
        let member = read_member(&mut value, value_version, index).map_err(value_err)?;
        members.push(member);
    }

    Ok(GroupMetadataEntry {
        group,
        protocol_type,
        generation_id,
        protocol,
        leader_id,
        state_timestamp,
        members,
    })
}

fn read_member(value: &mut Reader<'_>, value_version: i16, index: usize) -> Result<Member, ReadError> {
    let field = |name: &str| format!("members[{index}].{name}");

    let member_id = value.read_string(&field("member id"))?;
    let group_instance_id = if value_version >= 3 {
        value.read_nullable_string(&field("group instance id"))?
    } else {
        None
    };
    let client_id = value.read_string(&field("client id"))?;
    let client_host = value.read_string(&field("client host"))?;
    let rebalance_timeout_ms = if value_version >= 1 {
        Some(value.read_i32(&field("rebalance timeout"))?)
    } else {
        None
    };
    let session_timeout_ms = value.read_i32(&field("session timeout"))?;
    let subscription = value.read_bytes(&field("subscription"))?;
    let assignment = value.read_bytes(&field("assignment"))?;

    Ok(Member {
        member_id,
        group_instance_id,
        client_id,
        client_host,
        rebalance_timeout_ms,
        session_timeout_ms,
        subscription,
        assignment,
    })
}
