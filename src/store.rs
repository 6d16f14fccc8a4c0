//! In-memory view of the latest committed offset per group and partition.
//!
//! Every commit of a group lands in the same partition of the offsets topic,
//! and partitions are delivered in order, so the most recently received
//! commit for a key is the current one.

use anyhow::Context;
use chrono::{DateTime, Utc};
use offsets_types::OffsetCommitEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Store shared between the drain task and readers.
pub type SharedStore = Arc<Mutex<OffsetStore>>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct OffsetKey {
    group: String,
    topic: String,
    partition: i32,
}

impl OffsetKey {
    fn of(entry: &OffsetCommitEntry) -> Self {
        Self {
            group: entry.group.clone(),
            topic: entry.topic.clone(),
            partition: entry.partition,
        }
    }
}

#[derive(Debug, Default)]
pub struct OffsetStore {
    entries: BTreeMap<OffsetKey, OffsetCommitEntry>,
}

/// Serialisable copy of the store at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub taken_at: DateTime<Utc>,
    pub groups: usize,
    /// Sorted by group, topic and partition
    pub offsets: Vec<OffsetCommitEntry>,
}

impl OffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a commit, returning the entry it replaced.
    pub fn apply(&mut self, entry: OffsetCommitEntry) -> Option<OffsetCommitEntry> {
        self.entries.insert(OffsetKey::of(&entry), entry)
    }

    pub fn get(&self, group: &str, topic: &str, partition: i32) -> Option<&OffsetCommitEntry> {
        self.entries.get(&OffsetKey {
            group: group.to_string(),
            topic: topic.to_string(),
            partition,
        })
    }

    /// Distinct groups with at least one committed offset, sorted.
    pub fn groups(&self) -> Vec<&str> {
        self.entries
            .keys()
            .map(|key| key.group.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All committed offsets of one group, sorted by topic and partition.
    pub fn group_offsets(&self, group: &str) -> Vec<&OffsetCommitEntry> {
        self.entries
            .iter()
            .filter(|(key, _)| key.group == group)
            .map(|(_, entry)| entry)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops commits whose expiry is at or before `now`, returning how many were dropped.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            taken_at: Utc::now(),
            groups: self.groups().len(),
            offsets: self.entries.values().cloned().collect(),
        }
    }
}

/// Applies every entry from `rx` to `store` until all senders are gone.
///
/// Returns how many entries were applied.
pub async fn drain(mut rx: mpsc::Receiver<OffsetCommitEntry>, store: SharedStore) -> u64 {
    let mut applied = 0u64;
    while let Some(entry) = rx.recv().await {
        debug!(
            group = %entry.group,
            topic = %entry.topic,
            partition = entry.partition,
            offset = entry.offset,
            "Storing offset"
        );
        store.lock().await.apply(entry);
        applied += 1;
    }
    applied
}

/// Writes the snapshot as pretty-printed JSON.
pub fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(snapshot).context("Failed to serialize offset snapshot")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write offset snapshot to {}", path.display()))?;
    Ok(())
}
