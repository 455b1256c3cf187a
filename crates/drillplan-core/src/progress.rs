//! Progress and achievement metrics.
//!
//! Two signals feed learner feedback:
//!
//! - the **win count**: how many sessions in the learner's history passed the
//!   pass threshold. This is a cumulative count over all history, not a streak
//!   ending at the latest session.
//! - the **mastery matrix**: per lesson, the share of cataloged items whose
//!   latest answer is right.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bucket::latest_per_item;
use crate::model::{AchievementSnapshot, AttemptRecord, ItemMeta, LessonId, Outcome};
use crate::profile::Settings;
use crate::range::Scope;
use crate::subject::Subject;
use crate::traits::{records_in_scope, ItemCatalog, RecordStore};

/// Guards the error allowance against float noise, e.g. `10 * (1 - 0.8)`.
const CEIL_EPSILON: f64 = 1e-9;

/// How a session's pass/fail is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassRule {
    /// `errors <= ceil(size * (1 - pass_ratio))`.
    #[default]
    MaxErrors,
    /// `right >= floor(size * pass_ratio)`.
    MinCorrect,
}

impl PassRule {
    /// Whether a session of `size` answers with `errors` wrong ones passes.
    pub fn passes(self, size: usize, errors: usize, pass_ratio: f64) -> bool {
        match self {
            PassRule::MaxErrors => {
                let allowed = (size as f64 * (1.0 - pass_ratio) - CEIL_EPSILON).ceil().max(0.0);
                errors as f64 <= allowed
            }
            PassRule::MinCorrect => {
                let needed = (size as f64 * pass_ratio + CEIL_EPSILON).floor();
                (size - errors.min(size)) as f64 >= needed
            }
        }
    }
}

impl fmt::Display for PassRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassRule::MaxErrors => write!(f, "max-errors"),
            PassRule::MinCorrect => write!(f, "min-correct"),
        }
    }
}

impl FromStr for PassRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max-errors" | "max_errors" => Ok(PassRule::MaxErrors),
            "min-correct" | "min_correct" => Ok(PassRule::MinCorrect),
            other => Err(format!("unknown pass rule: {other}")),
        }
    }
}

/// Settled answer counts of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionTally {
    pub size: usize,
    pub errors: usize,
}

/// Group settled records by session timestamp, oldest session first.
pub fn session_tallies(history: &[AttemptRecord]) -> BTreeMap<DateTime<Utc>, SessionTally> {
    let mut sessions: BTreeMap<DateTime<Utc>, SessionTally> = BTreeMap::new();
    for record in history.iter().filter(|r| r.outcome.is_settled()) {
        let tally = sessions.entry(record.timestamp).or_default();
        tally.size += 1;
        if record.outcome == Outcome::Wrong {
            tally.errors += 1;
        }
    }
    sessions
}

/// Number of passing sessions in `history`.
pub fn win_count(history: &[AttemptRecord], pass_ratio: f64, rule: PassRule) -> usize {
    session_tallies(history)
        .values()
        .filter(|t| rule.passes(t.size, t.errors, pass_ratio))
        .count()
}

/// Per-lesson mastery over the items of one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteryMatrix {
    pub lesson_ratios: BTreeMap<LessonId, f64>,
    pub mastered_count: usize,
}

/// Build the mastery matrix from `history` and the cataloged `scope_items`.
///
/// Lessons `1..=lesson_count` are always present, defaulting to `0`.
pub fn mastery_matrix(
    subject: &Subject,
    history: &[AttemptRecord],
    scope_items: &[ItemMeta],
    lesson_count: u32,
) -> MasteryMatrix {
    let mut lesson_ratios: BTreeMap<LessonId, f64> = (1..=lesson_count).map(|l| (l, 0.0)).collect();

    let mut lesson_of = BTreeMap::new();
    let mut lesson_size: BTreeMap<LessonId, usize> = BTreeMap::new();
    for item in scope_items {
        let lesson = subject.lesson_field.of(item);
        lesson_of.insert(item.item_id, lesson);
        *lesson_size.entry(lesson).or_default() += 1;
    }

    let latest = latest_per_item(
        history
            .iter()
            .filter(|r| r.outcome.is_settled() && lesson_of.contains_key(&r.item_id)),
    );

    let mut mastered: BTreeMap<LessonId, usize> = BTreeMap::new();
    let mut mastered_count = 0;
    for (item_id, record) in &latest {
        let lesson = lesson_of[item_id];
        let count = mastered.entry(lesson).or_default();
        if record.outcome == Outcome::Right {
            *count += 1;
            mastered_count += 1;
        }
    }

    for (lesson, right) in mastered {
        let total = lesson_size.get(&lesson).copied().unwrap_or(0);
        if total > 0 {
            lesson_ratios.insert(lesson, right as f64 / total as f64);
        }
    }

    MasteryMatrix {
        lesson_ratios,
        mastered_count,
    }
}

/// Computes achievement snapshots against the store and catalog.
pub struct ProgressEngine<'a> {
    store: &'a dyn RecordStore,
    catalog: &'a dyn ItemCatalog,
    rule: PassRule,
}

impl<'a> ProgressEngine<'a> {
    pub fn new(store: &'a dyn RecordStore, catalog: &'a dyn ItemCatalog) -> Self {
        Self {
            store,
            catalog,
            rule: PassRule::default(),
        }
    }

    pub fn with_rule(mut self, rule: PassRule) -> Self {
        self.rule = rule;
        self
    }

    /// Lesson count of `scope`, honoring the subject's override.
    pub fn lesson_count(&self, subject: &Subject, scope: Scope) -> Result<u32> {
        match subject.lesson_count_override {
            Some(count) => Ok(count),
            None => self.catalog.get_lesson_count(subject, scope.grade, scope.volume),
        }
    }

    /// Win count and mastery matrix for `user_id` in `scope`.
    pub fn snapshot(
        &self,
        subject: &Subject,
        user_id: &str,
        scope: Scope,
        settings: &Settings,
    ) -> Result<AchievementSnapshot> {
        let pass_ratio = settings.pass_ratio(subject)?;
        let history = records_in_scope(self.store, self.catalog, subject, user_id, scope.grade, scope.volume)?;
        let items = self.catalog.get_items_by_volume(subject, scope.grade, scope.volume)?;
        let lesson_count = self.lesson_count(subject, scope)?;

        let wins = win_count(&history, pass_ratio, self.rule);
        let matrix = mastery_matrix(subject, &history, &items, lesson_count);

        tracing::info!(
            subject = %subject,
            user_id,
            sessions = session_tallies(&history).len(),
            wins,
            mastered = matrix.mastered_count,
            "computed achievement snapshot"
        );

        Ok(AchievementSnapshot {
            lesson_ratios: matrix.lesson_ratios,
            win_count: wins,
            mastered_count: matrix.mastered_count,
            lesson_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeStore};
    use chrono::Duration;

    fn session(days_ago: i64, size: usize, errors: usize) -> Vec<AttemptRecord> {
        let ts = testing::now() - Duration::days(days_ago);
        (0..size)
            .map(|n| AttemptRecord {
                user_id: "kid".into(),
                item_id: 100 + n as u32,
                outcome: if n < errors { Outcome::Wrong } else { Outcome::Right },
                timestamp: ts,
                order: n as u32 + 1,
            })
            .collect()
    }

    #[test]
    fn win_count_over_three_sessions() {
        let history: Vec<_> = [session(3, 10, 0), session(2, 10, 1), session(1, 10, 5)].concat();
        assert_eq!(win_count(&history, 0.8, PassRule::MaxErrors), 2);
    }

    #[test]
    fn win_count_is_cumulative_not_a_streak() {
        let history: Vec<_> = [session(3, 10, 0), session(2, 10, 9), session(1, 10, 0)].concat();
        assert_eq!(win_count(&history, 0.8, PassRule::MaxErrors), 2);
    }

    #[test]
    fn win_count_empty_history() {
        assert_eq!(win_count(&[], 0.8, PassRule::MaxErrors), 0);
    }

    #[test]
    fn allowance_is_exact_at_float_boundary() {
        // 10 * (1 - 0.8) is 1.9999999999999996 in floating point
        assert!(PassRule::MaxErrors.passes(10, 2, 0.8));
        assert!(!PassRule::MaxErrors.passes(10, 3, 0.8));
        assert!(PassRule::MaxErrors.passes(7, 2, 0.8));
    }

    #[test]
    fn min_correct_rule() {
        assert!(PassRule::MinCorrect.passes(10, 2, 0.8));
        assert!(!PassRule::MinCorrect.passes(10, 3, 0.8));
        assert!("min-correct".parse::<PassRule>().is_ok());
    }

    #[test]
    fn pending_records_do_not_count() {
        let mut history = session(1, 4, 0);
        history[0].outcome = Outcome::Pending;
        let tallies = session_tallies(&history);
        assert_eq!(tallies.values().next().unwrap().size, 3);
    }

    #[test]
    fn mastery_uses_latest_answer_per_item() {
        let mut store = FakeStore::with_catalog(&[1, 2, 3], 2);
        store.answer(101, Outcome::Wrong, 5);
        store.answer(101, Outcome::Right, 1);
        store.answer(102, Outcome::Right, 5);
        store.answer(102, Outcome::Wrong, 1);
        store.answer(201, Outcome::Right, 2);
        store.answer(202, Outcome::Right, 2);

        let matrix = mastery_matrix(&Subject::chinese_zici(), &store.records, &store.items, 4);
        assert_eq!(matrix.lesson_ratios[&1], 0.5);
        assert_eq!(matrix.lesson_ratios[&2], 1.0);
        assert_eq!(matrix.lesson_ratios[&3], 0.0);
        assert_eq!(matrix.lesson_ratios[&4], 0.0);
        assert_eq!(matrix.mastered_count, 3);
    }

    #[test]
    fn snapshot_uses_override_lesson_count() {
        let mut store = FakeStore::with_catalog(&[1, 2], 1);
        store.answer(101, Outcome::Right, 1);
        let mut settings = Settings::new();
        settings.set("en_word_pass_ratio", 0.8);

        let engine = ProgressEngine::new(&store, &store);
        let snapshot = engine
            .snapshot(&Subject::english_word(), "kid", Scope { grade: 3, volume: 1 }, &settings)
            .unwrap();
        assert_eq!(snapshot.lesson_count, 12);
        assert_eq!(snapshot.lesson_ratios.len(), 12);
        assert_eq!(snapshot.lesson_ratios[&1], 1.0);
        assert_eq!(snapshot.win_count, 1);
        assert_eq!(snapshot.mastered_count, 1);
    }

    #[test]
    fn snapshot_without_pass_ratio_fails() {
        let store = FakeStore::with_catalog(&[1], 1);
        let engine = ProgressEngine::new(&store, &store);
        assert!(engine
            .snapshot(&Subject::chinese_zici(), "kid", Scope { grade: 3, volume: 1 }, &Settings::new())
            .is_err());
    }
}
