//! Session scheduler.
//!
//! Runs the selection pipeline for one (user, subject) request: scope and
//! range resolution, bucketing, scoring, ordering, then proportional
//! allocation. Committing a plan writes one placeholder record per selected
//! item.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::allocator::drain;
use crate::bucket::bucketize;
use crate::model::{
    AttemptRecord, Bucket, ItemId, LessonId, PaperEntry, ScoredItem, SelectedItem, SessionAllocation, SetMode,
};
use crate::profile::Settings;
use crate::range::{resolve_scope, RangeResolver, Scope};
use crate::scorer::score;
use crate::sequencer::OrderedBuckets;
use crate::subject::{Subject, SubjectTable};
use crate::traits::{ClassRegistry, ItemCatalog, RecordFilter, RecordStore};

/// Configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Mode used when a request does not name one.
    pub default_mode: SetMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_mode: SetMode::Balanced,
        }
    }
}

/// What to plan.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub user_id: String,
    /// Subject register name.
    pub subject: String,
    /// Class registration used when grade or volume is not given.
    pub class_id: Option<String>,
    pub grade: Option<u32>,
    pub volume: Option<u32>,
    /// Lessons to draw from, bypassing the learning path.
    pub manual_range: Option<Vec<LessonId>>,
    pub set_mode: Option<SetMode>,
    /// Session size override; defaults to `{subject}_max_num`.
    pub max_num: Option<usize>,
}

/// Read-side collaborators of a planning run.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub store: &'a dyn RecordStore,
    pub catalog: &'a dyn ItemCatalog,
    pub registry: &'a dyn ClassRegistry,
}

/// The session scheduler.
pub struct Scheduler {
    subjects: SubjectTable,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(subjects: SubjectTable, config: SchedulerConfig) -> Self {
        Self { subjects, config }
    }

    pub fn subjects(&self) -> &SubjectTable {
        &self.subjects
    }

    pub fn subject(&self, register_name: &str) -> Result<&Subject> {
        Ok(self.subjects.get(register_name)?)
    }

    /// Select the items of one session.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        sources: Sources<'_>,
        request: &PlanRequest,
        settings: &Settings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<SessionAllocation> {
        let subject = self.subject(&request.subject)?;
        let user_id = request.user_id.as_str();
        let budget = match request.max_num {
            Some(n) => n,
            None => settings.max_num(subject)?,
        };
        let ratios = settings.ratios(subject)?;
        let mode = request.set_mode.unwrap_or(self.config.default_mode);

        let scope = resolve_scope(
            request.grade,
            request.volume,
            request.class_id.as_deref(),
            sources.registry,
        )?;
        let range = RangeResolver::new(sources.store, sources.catalog)
            .resolve(subject, user_id, scope, settings, request.manual_range.as_deref())
            .with_context(|| format!("failed to resolve the range of `{user_id}`"))?;

        let candidates = self.candidates(sources, subject, scope, &range)?;
        if candidates.is_empty() {
            tracing::warn!(
                subject = %subject,
                user_id,
                grade = scope.grade,
                volume = scope.volume,
                range = ?range,
                "no catalog items in range"
            );
        }

        let ids: BTreeSet<ItemId> = candidates.keys().copied().collect();
        let history = sources
            .store
            .get_records(subject, user_id, &RecordFilter::all().with_items(ids.iter().copied()))?;
        if history.is_empty() && !ids.is_empty() {
            tracing::info!(subject = %subject, user_id, "no history in range, every item is new");
        }
        let buckets = bucketize(&ids, &history);
        if !buckets.in_flight.is_empty() {
            tracing::debug!(in_flight = buckets.in_flight.len(), "skipping items awaiting a score");
        }

        let mut by_item: BTreeMap<ItemId, Vec<AttemptRecord>> = BTreeMap::new();
        for record in history {
            by_item.entry(record.item_id).or_default().push(record);
        }
        let scored = |bucket: Bucket| -> Vec<ScoredItem> {
            buckets
                .get(bucket)
                .iter()
                .map(|&id| {
                    let records = by_item.get(&id).map(Vec::as_slice).unwrap_or(&[]);
                    score(user_id, id, candidates.get(&id).copied(), records, now)
                })
                .collect()
        };

        let ordered = OrderedBuckets::build(
            scored(Bucket::Incorrect),
            scored(Bucket::Correct),
            scored(Bucket::New),
            mode,
            rng,
        );
        let drawn = drain(budget, ordered.incorrect, ordered.correct, ordered.new, &ratios)?;
        let items: Vec<SelectedItem> = drawn
            .into_iter()
            .map(|(bucket, item)| SelectedItem { bucket, item })
            .collect();

        let allocation = SessionAllocation {
            id: Uuid::new_v4(),
            created_at: now,
            user_id: user_id.to_string(),
            subject: subject.register_name.clone(),
            requested: budget,
            shortfall: budget.saturating_sub(items.len()),
            items,
        };

        if allocation.is_short() {
            tracing::warn!(
                run_id = %allocation.id,
                user_id,
                requested = budget,
                selected = allocation.items.len(),
                "not enough eligible items to fill the session"
            );
        }
        tracing::info!(
            run_id = %allocation.id,
            subject = %subject,
            user_id,
            mode = %mode,
            incorrect = allocation.count_from(Bucket::Incorrect),
            correct = allocation.count_from(Bucket::Correct),
            new = allocation.count_from(Bucket::New),
            "planned session"
        );
        Ok(allocation)
    }

    /// Catalog items of the resolved range, with their lesson.
    fn candidates(
        &self,
        sources: Sources<'_>,
        subject: &Subject,
        scope: Scope,
        range: &[LessonId],
    ) -> Result<BTreeMap<ItemId, LessonId>> {
        if range.is_empty() {
            return Ok(BTreeMap::new());
        }
        let items = sources
            .catalog
            .get_items_by_lesson(subject, scope.grade, scope.volume, range)?;
        Ok(items
            .iter()
            .map(|item| (item.item_id, subject.lesson_field.of(item)))
            .collect())
    }

    /// Record a planned session as placeholders at `timestamp`.
    ///
    /// Orders run `1..=n` in selection order. A failed write aborts the commit.
    pub fn commit(
        &self,
        store: &mut dyn RecordStore,
        allocation: &SessionAllocation,
        timestamp: DateTime<Utc>,
    ) -> Result<PaperEntry> {
        let subject = self.subject(&allocation.subject)?;
        for (idx, selected) in allocation.items.iter().enumerate() {
            let order = idx as u32 + 1;
            store
                .insert_placeholder(subject, &allocation.user_id, selected.item.item_id, timestamp, order)
                .with_context(|| {
                    format!(
                        "failed to record item {} for `{}`",
                        selected.item.item_id, allocation.user_id
                    )
                })?;
        }
        tracing::info!(
            run_id = %allocation.id,
            user_id = %allocation.user_id,
            count = allocation.items.len(),
            "committed session"
        );
        Ok(PaperEntry {
            subject: subject.register_name.clone(),
            count: allocation.items.len(),
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SubjectTable::default(), SchedulerConfig::default())
    }
}
