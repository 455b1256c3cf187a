//! Feedback shown alongside a session, driven by an achievement snapshot.
//!
//! Activators live in an explicit [`FeedbackRegistry`] with a priority each:
//!
//! - `0`: always shown.
//! - `> 0`: one activator is picked at random per priority level.
//! - `< 0`: disabled.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::model::{AchievementSnapshot, LessonId};
use crate::profile::Settings;
use crate::subject::Subject;

/// Kinds of feedback an activator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivatorKind {
    /// Number of passed sessions.
    TotalWins,
    /// Per-lesson mastery ratios.
    AchievementsMatrix,
}

impl ActivatorKind {
    /// Settings toggle name, prefixed by the subject (e.g. `ch_zici_total_wins`).
    pub fn toggle_name(self) -> &'static str {
        match self {
            ActivatorKind::TotalWins => "total_wins",
            ActivatorKind::AchievementsMatrix => "achievements_matrix",
        }
    }

    fn activate(self, snapshot: &AchievementSnapshot) -> Option<Feedback> {
        match self {
            ActivatorKind::TotalWins if snapshot.win_count == 0 => None,
            ActivatorKind::TotalWins => Some(Feedback::TotalWins {
                count: snapshot.win_count,
            }),
            ActivatorKind::AchievementsMatrix => Some(Feedback::AchievementsMatrix {
                lesson_ratios: snapshot.lesson_ratios.clone(),
                mastered_count: snapshot.mastered_count,
            }),
        }
    }
}

impl fmt::Display for ActivatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.toggle_name())
    }
}

/// Rendered feedback content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    TotalWins {
        count: usize,
    },
    AchievementsMatrix {
        lesson_ratios: BTreeMap<LessonId, f64>,
        mastered_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    kind: ActivatorKind,
    priority: i32,
}

/// Registered feedback activators and their priorities.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRegistry {
    entries: Vec<Entry>,
}

impl Default for FeedbackRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ActivatorKind::TotalWins, 0);
        registry.register(ActivatorKind::AchievementsMatrix, 0);
        registry
    }
}

impl FeedbackRegistry {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add or re-prioritize an activator.
    pub fn register(&mut self, kind: ActivatorKind, priority: i32) {
        match self.entries.iter_mut().find(|e| e.kind == kind) {
            Some(entry) => entry.priority = priority,
            None => self.entries.push(Entry { kind, priority }),
        }
    }

    pub fn priority(&self, kind: ActivatorKind) -> Option<i32> {
        self.entries.iter().find(|e| e.kind == kind).map(|e| e.priority)
    }

    /// Apply the user's `{subject}_{toggle}` switches: `true` makes an
    /// activator required, `false` disables it. Unset toggles keep the
    /// registered priority.
    pub fn apply_toggles(&mut self, subject: &Subject, settings: &Settings) {
        for entry in &mut self.entries {
            match settings.toggle(subject, entry.kind.toggle_name()) {
                Some(true) => entry.priority = 0,
                Some(false) => entry.priority = -1,
                None => {}
            }
        }
    }

    /// Feedback to show for `snapshot`.
    pub fn select<R: Rng + ?Sized>(&self, snapshot: &AchievementSnapshot, rng: &mut R) -> Vec<Feedback> {
        let mut shown: Vec<Feedback> = self
            .entries
            .iter()
            .filter(|e| e.priority == 0)
            .filter_map(|e| e.kind.activate(snapshot))
            .collect();

        let mut levels: BTreeMap<i32, Vec<Feedback>> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| e.priority > 0) {
            if let Some(feedback) = entry.kind.activate(snapshot) {
                levels.entry(entry.priority).or_default().push(feedback);
            }
        }
        for candidates in levels.values() {
            if let Some(choice) = candidates.choose(rng) {
                shown.push(choice.clone());
            }
        }

        tracing::debug!(shown = shown.len(), "selected feedback");
        shown
    }
}
