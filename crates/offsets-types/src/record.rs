//! Entries decoded from consumer offsets records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One consumer group's committed offset for one topic partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCommitEntry {
    /// Consumer group that committed the offset
    pub group: String,
    /// Topic the offset refers to
    pub topic: String,
    /// Partition the offset refers to
    pub partition: i32,
    /// Committed offset (next record the group will read)
    pub offset: i64,
    /// Leader epoch at commit time, only carried by value version 3
    pub leader_epoch: Option<i32>,
    /// Free-form metadata supplied by the committing client
    pub metadata: String,
    pub commit_timestamp: DateTime<Utc>,
    /// Only value version 1 carries an explicit expiry
    pub expire_timestamp: Option<DateTime<Utc>>,
}

impl OffsetCommitEntry {
    /// Returns true when the entry carries an expiry that is at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_timestamp.is_some_and(|expire| expire <= now)
    }
}

/// A member of a consumer group as recorded in a group metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub member_id: String,
    /// Static membership id (value version 3 only)
    pub group_instance_id: Option<String>,
    pub client_id: String,
    pub client_host: String,
    /// Absent in value version 0
    pub rebalance_timeout_ms: Option<i32>,
    pub session_timeout_ms: i32,
    /// Protocol-specific subscription, not decoded further
    pub subscription: Vec<u8>,
    /// Protocol-specific assignment, not decoded further
    pub assignment: Vec<u8>,
}

/// Membership snapshot of a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMetadataEntry {
    pub group: String,
    /// Usually "consumer" for Kafka consumers, "connect" for Kafka Connect
    pub protocol_type: String,
    pub generation_id: i32,
    /// Selected assignment protocol, empty when the group has none yet
    pub protocol: String,
    /// Empty when the group has no leader
    pub leader_id: String,
    /// Time of the last state change (value version 2 and later)
    pub state_timestamp: Option<DateTime<Utc>>,
    pub members: Vec<Member>,
}

/// A successfully decoded consumer offsets record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetsRecord {
    OffsetCommit(OffsetCommitEntry),
    GroupMetadata(GroupMetadataEntry),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(expire: Option<DateTime<Utc>>) -> OffsetCommitEntry {
        OffsetCommitEntry {
            group: "g1".to_string(),
            topic: "orders".to_string(),
            partition: 3,
            offset: 42,
            leader_epoch: None,
            metadata: String::new(),
            commit_timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            expire_timestamp: expire,
        }
    }

    #[test]
    fn test_is_expired_without_expiry() {
        let now = Utc.timestamp_millis_opt(1_800_000_000_000).unwrap();
        assert!(!entry(None).is_expired(now));
    }

    #[test]
    fn test_is_expired_boundaries() {
        let expire = Utc.timestamp_millis_opt(1_700_000_100_000).unwrap();
        let e = entry(Some(expire));
        assert!(!e.is_expired(expire - chrono::Duration::milliseconds(1)));
        assert!(e.is_expired(expire));
        assert!(e.is_expired(expire + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_offset_commit_entry_serializes() {
        let json = serde_json::to_value(entry(None)).unwrap();
        assert_eq!(json["group"], "g1");
        assert_eq!(json["partition"], 3);
        assert_eq!(json["offset"], 42);
        assert!(json["expire_timestamp"].is_null());
    }
}
