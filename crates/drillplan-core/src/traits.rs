//! Collaborator traits for record storage, the item catalog, and class
//! registration.
//!
//! The scheduler only talks to persistence through these traits. The
//! `drillplan-store` crate provides in-memory / file-backed implementations.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::model::{AttemptRecord, ItemId, ItemMeta, LessonId, Outcome};
use crate::subject::Subject;

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// Restricts a record query. Empty fields do not filter.
///
/// Lesson restrictions are resolved to item ids through the catalog by the
/// caller (see [`records_in_scope`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub item_ids: Option<BTreeSet<ItemId>>,
    /// Half-open `[start, end)` timestamp window.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub exclude_outcome: Option<Outcome>,
}

impl RecordFilter {
    /// Every record of the user.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only answered records (placeholders excluded).
    pub fn settled() -> Self {
        Self {
            exclude_outcome: Some(Outcome::Pending),
            ..Self::default()
        }
    }

    pub fn with_items(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.item_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some((start, end));
        self
    }

    /// Whether `record` passes every restriction.
    pub fn matches(&self, record: &AttemptRecord) -> bool {
        if let Some(ids) = &self.item_ids {
            if !ids.contains(&record.item_id) {
                return false;
            }
        }
        if let Some((start, end)) = &self.date_range {
            if record.timestamp < *start || record.timestamp >= *end {
                return false;
            }
        }
        if let Some(excluded) = self.exclude_outcome {
            if record.outcome == excluded {
                return false;
            }
        }
        true
    }
}

/// Per-user, per-subject attempt history.
pub trait RecordStore {
    /// Records of `user_id` matching `filter`. No match is an empty vector.
    fn get_records(
        &self,
        subject: &Subject,
        user_id: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<AttemptRecord>>;

    /// All records of one session, ordered by `order`.
    fn session_records(
        &self,
        subject: &Subject,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<AttemptRecord>>;

    /// Create a not-yet-administered record for an item placed in a session.
    fn insert_placeholder(
        &mut self,
        subject: &Subject,
        user_id: &str,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
        order: u32,
    ) -> Result<()>;

    /// Settle the pending record at `(timestamp, order)`.
    ///
    /// A record is scored once; a settled record is left unchanged.
    fn update_score(
        &mut self,
        subject: &Subject,
        user_id: &str,
        timestamp: DateTime<Utc>,
        order: u32,
        outcome: Outcome,
    ) -> Result<ScoreUpdate>;
}

/// What [`RecordStore::update_score`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreUpdate {
    Scored,
    /// The record already holds a right or wrong answer.
    AlreadyScored,
    NotFound,
}

// ---------------------------------------------------------------------------
// Item catalog
// ---------------------------------------------------------------------------

/// Read-only catalog of practice items.
pub trait ItemCatalog {
    fn get_items_by_ids(&self, subject: &Subject, ids: &[ItemId]) -> Result<Vec<ItemMeta>>;

    /// Items of `grade`/`volume` whose lesson field (per `subject`) is in
    /// `lessons`.
    fn get_items_by_lesson(
        &self,
        subject: &Subject,
        grade: u32,
        volume: u32,
        lessons: &[LessonId],
    ) -> Result<Vec<ItemMeta>>;

    fn get_items_by_volume(&self, subject: &Subject, grade: u32, volume: u32)
        -> Result<Vec<ItemMeta>>;

    /// Number of distinct lessons cataloged for `grade`/`volume`.
    fn get_lesson_count(&self, subject: &Subject, grade: u32, volume: u32) -> Result<u32>;
}

// ---------------------------------------------------------------------------
// Class registry
// ---------------------------------------------------------------------------

/// Resolves a class registration to the grade and volume it studies.
pub trait ClassRegistry {
    fn grade_and_volume(&self, class_id: &str) -> Result<Option<(u32, u32)>>;
}

/// Settled records of `user_id` restricted to the items of `grade`/`volume`.
pub fn records_in_scope(
    store: &dyn RecordStore,
    catalog: &dyn ItemCatalog,
    subject: &Subject,
    user_id: &str,
    grade: u32,
    volume: u32,
) -> Result<Vec<AttemptRecord>> {
    let scope = catalog.get_items_by_volume(subject, grade, volume)?;
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let filter = RecordFilter::settled().with_items(scope.iter().map(|i| i.item_id));
    store.get_records(subject, user_id, &filter)
}
