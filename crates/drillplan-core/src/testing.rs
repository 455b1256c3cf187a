//! In-crate fakes for the collaborator traits.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::model::{AttemptRecord, ItemId, ItemMeta, LessonId, Outcome};
use crate::subject::Subject;
use crate::traits::{ClassRegistry, ItemCatalog, RecordFilter, RecordStore, ScoreUpdate};

#[derive(Debug, Default)]
pub struct FakeStore {
    pub records: Vec<AttemptRecord>,
    pub items: Vec<ItemMeta>,
    pub classes: BTreeMap<String, (u32, u32)>,
}

pub fn now() -> DateTime<Utc> {
    "2024-06-01T12:00:00Z".parse().unwrap()
}

pub fn meta(item_id: ItemId, lesson: LessonId) -> ItemMeta {
    ItemMeta {
        item_id,
        grade: 3,
        volume: 1,
        lesson,
        unit: lesson,
        prompt: format!("p{item_id}"),
        answer: format!("a{item_id}"),
    }
}

impl FakeStore {
    /// Catalog with `per_lesson` items in each of `lessons` (grade 3, volume 1).
    /// Item ids are `lesson * 100 + n`.
    pub fn with_catalog(lessons: &[LessonId], per_lesson: u32) -> Self {
        let items = lessons
            .iter()
            .flat_map(|&l| (1..=per_lesson).map(move |n| meta(l * 100 + n, l)))
            .collect();
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn answer(&mut self, item_id: ItemId, outcome: Outcome, days_ago: i64) {
        self.records.push(AttemptRecord {
            user_id: "kid".into(),
            item_id,
            outcome,
            timestamp: now() - Duration::days(days_ago),
            order: 1,
        });
    }
}

impl RecordStore for FakeStore {
    fn get_records(&self, _: &Subject, user_id: &str, filter: &RecordFilter) -> Result<Vec<AttemptRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect())
    }

    fn session_records(&self, _: &Subject, user_id: &str, timestamp: DateTime<Utc>) -> Result<Vec<AttemptRecord>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp == timestamp)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.order);
        Ok(records)
    }

    fn insert_placeholder(
        &mut self,
        _: &Subject,
        user_id: &str,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
        order: u32,
    ) -> Result<()> {
        self.records.push(AttemptRecord {
            user_id: user_id.into(),
            item_id,
            outcome: Outcome::Pending,
            timestamp,
            order,
        });
        Ok(())
    }

    fn update_score(
        &mut self,
        _: &Subject,
        user_id: &str,
        timestamp: DateTime<Utc>,
        order: u32,
        outcome: Outcome,
    ) -> Result<ScoreUpdate> {
        match self
            .records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.timestamp == timestamp && r.order == order)
        {
            Some(record) if record.outcome.is_settled() => Ok(ScoreUpdate::AlreadyScored),
            Some(record) => {
                record.outcome = outcome;
                Ok(ScoreUpdate::Scored)
            }
            None => Ok(ScoreUpdate::NotFound),
        }
    }
}

impl ItemCatalog for FakeStore {
    fn get_items_by_ids(&self, _: &Subject, ids: &[ItemId]) -> Result<Vec<ItemMeta>> {
        Ok(self.items.iter().filter(|i| ids.contains(&i.item_id)).cloned().collect())
    }

    fn get_items_by_lesson(
        &self,
        subject: &Subject,
        grade: u32,
        volume: u32,
        lessons: &[LessonId],
    ) -> Result<Vec<ItemMeta>> {
        Ok(self
            .get_items_by_volume(subject, grade, volume)?
            .into_iter()
            .filter(|i| lessons.contains(&subject.lesson_field.of(i)))
            .collect())
    }

    fn get_items_by_volume(&self, _: &Subject, grade: u32, volume: u32) -> Result<Vec<ItemMeta>> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.grade == grade && i.volume == volume)
            .cloned()
            .collect())
    }

    fn get_lesson_count(&self, subject: &Subject, grade: u32, volume: u32) -> Result<u32> {
        let mut lessons: Vec<_> = self
            .get_items_by_volume(subject, grade, volume)?
            .iter()
            .map(|i| subject.lesson_field.of(i))
            .collect();
        lessons.sort_unstable();
        lessons.dedup();
        Ok(lessons.len() as u32)
    }
}

impl ClassRegistry for FakeStore {
    fn grade_and_volume(&self, class_id: &str) -> Result<Option<(u32, u32)>> {
        Ok(self.classes.get(class_id).copied())
    }
}
