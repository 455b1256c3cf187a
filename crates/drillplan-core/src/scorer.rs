//! Per-item scoring from attempt history.
//!
//! Two priority signals are derived:
//!
//! - **challenge value**: a recency-weighted sum over every answer, `+1/age`
//!   for a wrong answer and `-1/age` for a right one, where `age` is measured
//!   in half-days. Recent mistakes dominate.
//! - **memory value**: how close the learner is to a review checkpoint,
//!   counted in whole days since the first right answer. Being exactly on a
//!   checkpoint gives `+inf`.

use chrono::{DateTime, Utc};

use crate::model::{AttemptRecord, ItemId, LessonId, Outcome, ScoredItem};

/// Review checkpoints in days since the first right answer.
pub const MEMORY_CHECKPOINTS: [i64; 26] = [
    1, 2, 3, 5, 7, 10, 15, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150, 160, 170,
    180, 190, 200,
];

/// Smallest age used for challenge weighting: one minute, in half-days.
const MIN_AGE_HALF_DAYS: f64 = 1.0 / 720.0;

/// Score one item of `user_id` from its history.
///
/// Pending placeholders are not answers and are ignored. An item without any
/// answered record is new.
pub fn score(
    user_id: &str,
    item_id: ItemId,
    lesson: Option<LessonId>,
    history: &[AttemptRecord],
    now: DateTime<Utc>,
) -> ScoredItem {
    let answered: Vec<&AttemptRecord> = history
        .iter()
        .filter(|r| r.item_id == item_id && r.user_id == user_id && r.outcome.is_settled())
        .collect();

    if answered.is_empty() {
        return ScoredItem {
            item_id,
            num_attempts: 0,
            num_success: 0,
            latest_result: None,
            challenge_value: 0.0,
            memory_value: 0.0,
            lesson,
            is_new: true,
        };
    }

    let num_success = answered.iter().filter(|r| r.outcome == Outcome::Right).count() as u32;
    let latest_result = answered
        .iter()
        .max_by_key(|r| r.timestamp)
        .map(|r| r.outcome);

    ScoredItem {
        item_id,
        num_attempts: answered.len() as u32,
        num_success,
        latest_result,
        challenge_value: challenge_value(answered.iter().copied(), now),
        memory_value: memory_value(answered.iter().copied(), now),
        lesson,
        is_new: false,
    }
}

/// Age of `timestamp` in half-days, clamped away from zero.
fn age_half_days(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - timestamp).num_seconds() as f64 / 3600.0;
    (hours / 12.0).max(MIN_AGE_HALF_DAYS)
}

/// Recency-weighted balance of wrong over right answers.
pub fn challenge_value<'a>(
    records: impl IntoIterator<Item = &'a AttemptRecord>,
    now: DateTime<Utc>,
) -> f64 {
    records
        .into_iter()
        .filter(|r| r.outcome.is_settled())
        .map(|r| {
            let weight = 1.0 / age_half_days(r.timestamp, now);
            if r.outcome == Outcome::Right {
                -weight
            } else {
                weight
            }
        })
        .sum()
}

/// Distance in days from `days` to the nearest review checkpoint.
pub fn checkpoint_distance(days: i64) -> i64 {
    MEMORY_CHECKPOINTS
        .iter()
        .map(|c| (c - days).abs())
        .min()
        .unwrap_or(0)
}

/// Review due-ness from the earliest right answer.
///
/// Never answered right counts as due (`+inf`).
pub fn memory_value<'a>(
    records: impl IntoIterator<Item = &'a AttemptRecord>,
    now: DateTime<Utc>,
) -> f64 {
    let first_right = records
        .into_iter()
        .filter(|r| r.outcome == Outcome::Right)
        .map(|r| r.timestamp)
        .min();

    let Some(first_right) = first_right else {
        return f64::INFINITY;
    };

    let days = (now - first_right).num_days();
    match checkpoint_distance(days) {
        0 => f64::INFINITY,
        distance => 1.0 / distance as f64,
    }
}
