//! Consumer offsets record encoder for tests.
//!
//! Produces key and value bytes in the layout brokers write to
//! `__consumer_offsets`, for every key and value version the decoder
//! supports. Only used as a dev-dependency.
//!
//! ```rust
//! use offsets_fixtures::{offset_commit_key, offset_commit_value, sample_offset_commit};
//!
//! let entry = sample_offset_commit("g1", "orders", 3, 42);
//! let key = offset_commit_key(1, &entry.group, &entry.topic, entry.partition);
//! let value = offset_commit_value(2, &entry);
//! assert_eq!(&key[..2], &[0, 1]);
//! assert_eq!(&value[..2], &[0, 2]);
//! ```

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, TimeZone, Utc};
use offsets_types::{GroupMetadataEntry, Member, OffsetCommitEntry, KEY_VERSION_GROUP_METADATA};

/// Commit timestamp used by the sample builders.
pub const SAMPLE_COMMIT_MILLIS: i64 = 1_700_000_000_000;

pub fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_i16(value.len() as i16);
    buf.put_slice(value.as_bytes());
}

pub fn put_nullable_string(buf: &mut BytesMut, value: Option<&str>) {
    match value {
        Some(value) => put_string(buf, value),
        None => buf.put_i16(-1),
    }
}

pub fn put_bytes(buf: &mut BytesMut, value: &[u8]) {
    buf.put_i32(value.len() as i32);
    buf.put_slice(value);
}

/// Key of an offset commit record (key version 0 or 1).
pub fn offset_commit_key(key_version: i16, group: &str, topic: &str, partition: i32) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_i16(key_version);
    put_string(&mut buf, group);
    put_string(&mut buf, topic);
    buf.put_i32(partition);
    buf.to_vec()
}

/// Value of an offset commit record in the given value version.
///
/// Fields the version does not carry are skipped; unknown versions get the
/// version tag followed by the v2 layout so decoders can be tested against them.
pub fn offset_commit_value(value_version: i16, entry: &OffsetCommitEntry) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_i16(value_version);
    buf.put_i64(entry.offset);
    if value_version == 3 {
        buf.put_i32(entry.leader_epoch.unwrap_or(-1));
    }
    put_string(&mut buf, &entry.metadata);
    buf.put_i64(entry.commit_timestamp.timestamp_millis());
    if value_version == 1 {
        let expire = entry
            .expire_timestamp
            .map(|t| t.timestamp_millis())
            .unwrap_or(-1);
        buf.put_i64(expire);
    }
    buf.to_vec()
}

/// Key of a group metadata record.
pub fn group_metadata_key(group: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_i16(KEY_VERSION_GROUP_METADATA);
    put_string(&mut buf, group);
    buf.to_vec()
}

/// Value of a group metadata record in the given value version.
pub fn group_metadata_value(value_version: i16, entry: &GroupMetadataEntry) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_i16(value_version);
    put_string(&mut buf, &entry.protocol_type);
    buf.put_i32(entry.generation_id);
    put_nullable_string(&mut buf, non_empty(&entry.protocol));
    put_nullable_string(&mut buf, non_empty(&entry.leader_id));
    if value_version >= 2 {
        let state = entry
            .state_timestamp
            .map(|t| t.timestamp_millis())
            .unwrap_or(-1);
        buf.put_i64(state);
    }
    buf.put_i32(entry.members.len() as i32);
    for member in &entry.members {
        put_member(&mut buf, value_version, member);
    }
    buf.to_vec()
}

fn put_member(buf: &mut BytesMut, value_version: i16, member: &Member) {
    put_string(buf, &member.member_id);
    if value_version >= 3 {
        put_nullable_string(buf, member.group_instance_id.as_deref());
    }
    put_string(buf, &member.client_id);
    put_string(buf, &member.client_host);
    if value_version >= 1 {
        buf.put_i32(member.rebalance_timeout_ms.unwrap_or(member.session_timeout_ms));
    }
    buf.put_i32(member.session_timeout_ms);
    put_bytes(buf, &member.subscription);
    put_bytes(buf, &member.assignment);
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Panics when `ms` is outside the range chrono can represent.
pub fn millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(|| panic!("fixture timestamp {ms}ms is out of range"))
}

/// An offset commit shaped like value version 0 and 2 records (no expiry, no epoch).
pub fn sample_offset_commit(group: &str, topic: &str, partition: i32, offset: i64) -> OffsetCommitEntry {
    OffsetCommitEntry {
        group: group.to_string(),
        topic: topic.to_string(),
        partition,
        offset,
        leader_epoch: None,
        metadata: String::new(),
        commit_timestamp: millis(SAMPLE_COMMIT_MILLIS),
        expire_timestamp: None,
    }
}

/// A member shaped like value version 1 and 2 records.
pub fn sample_member(member_id: &str) -> Member {
    Member {
        member_id: member_id.to_string(),
        group_instance_id: None,
        client_id: format!("{member_id}-client"),
        client_host: "/10.0.0.1".to_string(),
        rebalance_timeout_ms: Some(300_000),
        session_timeout_ms: 45_000,
        subscription: vec![0, 1, 0, 0, 0, 1, 0, 6, b'o', b'r', b'd', b'e', b'r', b's'],
        assignment: vec![0, 1, 0, 0, 0, 0],
    }
}

/// A stable consumer group with the given members, shaped like value version 1.
pub fn sample_group_metadata(group: &str, members: Vec<Member>) -> GroupMetadataEntry {
    let leader_id = members
        .first()
        .map(|m| m.member_id.clone())
        .unwrap_or_default();
    GroupMetadataEntry {
        group: group.to_string(),
        protocol_type: "consumer".to_string(),
        generation_id: 7,
        protocol: "range".to_string(),
        leader_id,
        state_timestamp: None,
        members,
    }
}
