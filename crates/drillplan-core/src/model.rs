//! Core data model types for drillplan.
//!
//! These are the records, catalog entries, and derived per-run values that the
//! scheduling pipeline passes between its stages.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;

/// Catalog identifier of a practice item.
pub type ItemId = u32;

/// Identifier of a lesson or unit, depending on the subject's lesson field.
pub type LessonId = u32;

/// Result of one attempt, stored as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Outcome {
    Wrong,
    Right,
    /// Placed into a session but not scored yet.
    Pending,
}

impl Outcome {
    pub fn is_settled(self) -> bool {
        self != Outcome::Pending
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> u8 {
        match outcome {
            Outcome::Wrong => 0,
            Outcome::Right => 1,
            Outcome::Pending => 2,
        }
    }
}

impl TryFrom<u8> for Outcome {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Wrong),
            1 => Ok(Outcome::Right),
            2 => Ok(Outcome::Pending),
            other => Err(format!("invalid outcome value: {other}")),
        }
    }
}

/// One answer (or placeholder) in a user's history.
///
/// Identity is `(user_id, item_id, timestamp)`. A session shares one
/// timestamp across all of its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: String,
    pub item_id: ItemId,
    #[serde(rename = "correct")]
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    /// 1-based position of the item within its session.
    pub order: u32,
}

/// Fixed catalog metadata for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    pub item_id: ItemId,
    pub grade: u32,
    pub volume: u32,
    pub lesson: LessonId,
    #[serde(default)]
    pub unit: LessonId,
    /// Prompt shown to the learner (pinyin, translation, ...).
    pub prompt: String,
    /// Expected answer text.
    pub answer: String,
}

/// Selection bucket an item is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Incorrect,
    Correct,
    New,
}

impl Bucket {
    /// All buckets in allocation order.
    pub const ALL: [Bucket; 3] = [Bucket::Incorrect, Bucket::Correct, Bucket::New];
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Incorrect => write!(f, "incorrect"),
            Bucket::Correct => write!(f, "correct"),
            Bucket::New => write!(f, "new"),
        }
    }
}

/// How the correct bucket takes part in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetMode {
    /// Review correct items by spacing schedule alongside weak and new items.
    #[default]
    Balanced,
    /// Drop the correct bucket entirely.
    Rocket,
}

impl fmt::Display for SetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetMode::Balanced => write!(f, "balanced"),
            SetMode::Rocket => write!(f, "rocket"),
        }
    }
}

impl FromStr for SetMode {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" | "equalization" | "均衡" | "艾宾浩斯" => Ok(SetMode::Balanced),
            "rocket" | "火箭" => Ok(SetMode::Rocket),
            other => Err(ScheduleError::UnknownSetMode(other.to_string())),
        }
    }
}

/// Per-item metrics derived from history for one scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub num_attempts: u32,
    pub num_success: u32,
    pub latest_result: Option<Outcome>,
    /// Higher means more urgently needs practice.
    pub challenge_value: f64,
    /// Higher means more due for review; `+inf` at a checkpoint or when never
    /// answered correctly, `0` for new items.
    pub memory_value: f64,
    pub lesson: Option<LessonId>,
    pub is_new: bool,
}

/// An item chosen for a session, tagged with the bucket it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedItem {
    pub bucket: Bucket,
    #[serde(flatten)]
    pub item: ScoredItem,
}

/// The final ordered selection for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAllocation {
    /// Run identifier, used to correlate log lines.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub subject: String,
    /// Session size that was asked for.
    pub requested: usize,
    pub items: Vec<SelectedItem>,
    /// `requested - items.len()` when the eligible buckets ran dry.
    pub shortfall: usize,
}

impl SessionAllocation {
    /// Number of selected items that came from `bucket`.
    pub fn count_from(&self, bucket: Bucket) -> usize {
        self.items.iter().filter(|i| i.bucket == bucket).count()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.item.item_id).collect()
    }

    pub fn is_short(&self) -> bool {
        self.shortfall > 0
    }
}

/// One subject's share of a printed paper: `count` consecutive questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperEntry {
    pub subject: String,
    pub count: usize,
}

/// Progress signals for one user and scope, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementSnapshot {
    /// Pass ratio in `[0, 1]` per lesson, `1..=lesson_count`.
    pub lesson_ratios: BTreeMap<LessonId, f64>,
    /// Number of passing sessions in the whole history.
    pub win_count: usize,
    /// Items in scope whose latest attempt is right.
    pub mastered_count: usize,
    pub lesson_count: u32,
}
