//! Ordering of each bucket before allocation.

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{Bucket, ScoredItem, SetMode};

/// Descending by `key`, ties broken by ascending item id. `+inf` sorts first.
fn sort_desc_by(items: &mut [ScoredItem], key: impl Fn(&ScoredItem) -> f64) {
    items.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}

/// Order `items` of `bucket` for selection.
///
/// Incorrect items go by challenge value, correct items by memory value. New
/// items are shuffled with `rng`, after a stable sort so the result depends
/// only on the seed.
pub fn order_bucket<R: Rng + ?Sized>(bucket: Bucket, mut items: Vec<ScoredItem>, rng: &mut R) -> Vec<ScoredItem> {
    match bucket {
        Bucket::Incorrect => sort_desc_by(&mut items, |i| i.challenge_value),
        Bucket::Correct => sort_desc_by(&mut items, |i| i.memory_value),
        Bucket::New => {
            items.sort_by_key(|i| i.item_id);
            items.shuffle(rng);
        }
    }
    items
}

/// Ordered buckets ready for the allocator.
#[derive(Debug, Clone, Default)]
pub struct OrderedBuckets {
    pub incorrect: Vec<ScoredItem>,
    pub correct: Vec<ScoredItem>,
    pub new: Vec<ScoredItem>,
}

impl OrderedBuckets {
    /// Order all three buckets. Rocket mode leaves the correct bucket empty.
    pub fn build<R: Rng + ?Sized>(
        incorrect: Vec<ScoredItem>,
        correct: Vec<ScoredItem>,
        new: Vec<ScoredItem>,
        mode: SetMode,
        rng: &mut R,
    ) -> Self {
        let correct = match mode {
            SetMode::Balanced => order_bucket(Bucket::Correct, correct, rng),
            SetMode::Rocket => Vec::new(),
        };
        Self {
            incorrect: order_bucket(Bucket::Incorrect, incorrect, rng),
            correct,
            new: order_bucket(Bucket::New, new, rng),
        }
    }

    pub fn len(&self) -> usize {
        self.incorrect.len() + self.correct.len() + self.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
