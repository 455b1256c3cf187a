//! Partition of candidate items into incorrect / correct / new buckets.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AttemptRecord, Bucket, ItemId, Outcome};

/// Disjoint item-id sets per bucket, plus the items left out because their
/// latest record is still pending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub incorrect: BTreeSet<ItemId>,
    pub correct: BTreeSet<ItemId>,
    pub new: BTreeSet<ItemId>,
    pub in_flight: BTreeSet<ItemId>,
}

impl Buckets {
    pub fn get(&self, bucket: Bucket) -> &BTreeSet<ItemId> {
        match bucket {
            Bucket::Incorrect => &self.incorrect,
            Bucket::Correct => &self.correct,
            Bucket::New => &self.new,
        }
    }

    /// Items selectable in this run.
    pub fn selectable(&self) -> usize {
        self.incorrect.len() + self.correct.len() + self.new.len()
    }
}

/// Latest record per item, by timestamp.
pub fn latest_per_item<'a>(
    history: impl IntoIterator<Item = &'a AttemptRecord>,
) -> BTreeMap<ItemId, &'a AttemptRecord> {
    let mut latest: BTreeMap<ItemId, &AttemptRecord> = BTreeMap::new();
    for record in history {
        latest
            .entry(record.item_id)
            .and_modify(|current| {
                if record.timestamp > current.timestamp {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest
}

/// Classify `candidates` by the latest record of each item in `history`.
pub fn bucketize(candidates: &BTreeSet<ItemId>, history: &[AttemptRecord]) -> Buckets {
    let latest = latest_per_item(history.iter().filter(|r| candidates.contains(&r.item_id)));

    let mut buckets = Buckets::default();
    for &item_id in candidates {
        let target = match latest.get(&item_id).map(|r| r.outcome) {
            None => &mut buckets.new,
            Some(Outcome::Wrong) => &mut buckets.incorrect,
            Some(Outcome::Right) => &mut buckets.correct,
            Some(Outcome::Pending) => &mut buckets.in_flight,
        };
        target.insert(item_id);
    }
    buckets
}
