//! Proportional allocation of a session budget across buckets.
//!
//! A single round splits the remaining budget by ratio, flooring each share
//! but granting at least one slot to every non-empty bucket with a positive
//! ratio. [`drain`] repeats rounds until the budget is spent or the eligible
//! buckets are empty, so shares left unused by a small bucket flow to the
//! others in later rounds.

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::model::Bucket;

/// Relative weight of each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    pub incorrect: f64,
    pub correct: f64,
    pub new: f64,
}

impl Ratios {
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Incorrect => self.incorrect,
            Bucket::Correct => self.correct,
            Bucket::New => self.new,
        }
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        for bucket in Bucket::ALL {
            let ratio = self.get(bucket);
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(ScheduleError::config(format!(
                    "{bucket} ratio must be a non-negative number, got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-bucket counts, indexed in [`Bucket::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts([usize; 3]);

impl Counts {
    pub fn new(incorrect: usize, correct: usize, new: usize) -> Self {
        Self([incorrect, correct, new])
    }

    pub fn get(&self, bucket: Bucket) -> usize {
        self.0[index(bucket)]
    }

    pub fn set(&mut self, bucket: Bucket, value: usize) {
        self.0[index(bucket)] = value;
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

fn index(bucket: Bucket) -> usize {
    match bucket {
        Bucket::Incorrect => 0,
        Bucket::Correct => 1,
        Bucket::New => 2,
    }
}

/// One allocation round: how many items each bucket should contribute.
///
/// `available` holds the remaining size of each bucket; it only decides the
/// minimum-one floor. Fails when the ratios are invalid, or all zero while
/// there is budget to spend.
pub fn allocate(total_budget: usize, available: Counts, ratios: &Ratios) -> Result<Counts, ScheduleError> {
    ratios.validate()?;
    let ratio_sum: f64 = Bucket::ALL.iter().map(|&b| ratios.get(b)).sum();
    if ratio_sum <= 0.0 {
        if total_budget == 0 {
            return Ok(Counts::default());
        }
        return Err(ScheduleError::config("all bucket ratios are zero"));
    }

    let mut counts = Counts::default();
    for bucket in Bucket::ALL {
        let ratio = ratios.get(bucket);
        if ratio <= 0.0 {
            continue;
        }
        let mut count = (total_budget as f64 * ratio / ratio_sum).floor() as usize;
        if count == 0 && available.get(bucket) > 0 {
            count = 1;
        }
        counts.set(bucket, count);
    }
    Ok(counts)
}

/// Draw up to `total_budget` items from the ordered buckets.
///
/// Items are taken from the front of each bucket in [`Bucket::ALL`] order.
/// Buckets with a zero ratio never contribute. Returns the taken items with
/// their bucket, in the order they were drawn.
pub fn drain<T>(
    total_budget: usize,
    mut incorrect: Vec<T>,
    mut correct: Vec<T>,
    mut new: Vec<T>,
    ratios: &Ratios,
) -> Result<Vec<(Bucket, T)>, ScheduleError> {
    let mut selected = Vec::with_capacity(total_budget);
    let mut remaining = total_budget;

    loop {
        let available = Counts::new(incorrect.len(), correct.len(), new.len());
        let eligible = Bucket::ALL
            .iter()
            .any(|&b| ratios.get(b) > 0.0 && available.get(b) > 0);
        if remaining == 0 || !eligible {
            // still reject a configuration that could never draw anything
            if remaining > 0 {
                allocate(remaining, available, ratios)?;
            }
            break;
        }

        let counts = allocate(remaining, available, ratios)?;
        let round_start = selected.len();
        for (bucket, items) in [
            (Bucket::Incorrect, &mut incorrect),
            (Bucket::Correct, &mut correct),
            (Bucket::New, &mut new),
        ] {
            let take = counts.get(bucket).min(items.len()).min(remaining);
            selected.extend(items.drain(..take).map(|item| (bucket, item)));
            remaining -= take;
        }
        tracing::trace!(
            round_taken = selected.len() - round_start,
            remaining,
            "allocation round"
        );
    }

    Ok(selected)
}
