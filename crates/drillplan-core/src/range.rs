//! Range resolution: which lessons a session may draw items from.
//!
//! In automatic mode the range is every lesson the learner has already been
//! exposed to in the current grade/volume, topped up from the learning path
//! until `learning_speed` lessons are open. A manual range overrides all of
//! that.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::error::ScheduleError;
use crate::model::LessonId;
use crate::profile::Settings;
use crate::subject::Subject;
use crate::traits::{ClassRegistry, ItemCatalog, RecordFilter, RecordStore};

/// Textbook grade and volume a request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub grade: u32,
    pub volume: u32,
}

/// Fill in grade/volume from the class registration when not given.
///
/// Explicit values win over the class's. Fails when either is still unknown.
pub fn resolve_scope(
    grade: Option<u32>,
    volume: Option<u32>,
    class_id: Option<&str>,
    registry: &dyn ClassRegistry,
) -> Result<Scope> {
    if let (Some(grade), Some(volume)) = (grade, volume) {
        return Ok(Scope { grade, volume });
    }

    let registered = match class_id {
        Some(class_id) => registry.grade_and_volume(class_id)?,
        None => None,
    };
    match (grade.or(registered.map(|r| r.0)), volume.or(registered.map(|r| r.1))) {
        (Some(grade), Some(volume)) => Ok(Scope { grade, volume }),
        _ => Err(ScheduleError::config(format!(
            "grade and volume are not set and class `{}` has no registration",
            class_id.unwrap_or("<none>")
        ))
        .into()),
    }
}

/// Resolves the lesson range of one request.
pub struct RangeResolver<'a> {
    store: &'a dyn RecordStore,
    catalog: &'a dyn ItemCatalog,
}

impl<'a> RangeResolver<'a> {
    pub fn new(store: &'a dyn RecordStore, catalog: &'a dyn ItemCatalog) -> Self {
        Self { store, catalog }
    }

    /// Lessons in `scope` where `user_id` has at least one answered record.
    /// Planned but unscored items do not open a lesson.
    pub fn seen_lessons(&self, subject: &Subject, user_id: &str, scope: Scope) -> Result<BTreeSet<LessonId>> {
        let items = self.catalog.get_items_by_volume(subject, scope.grade, scope.volume)?;
        if items.is_empty() {
            return Ok(BTreeSet::new());
        }
        let filter = RecordFilter::settled().with_items(items.iter().map(|i| i.item_id));
        let touched: BTreeSet<_> = self
            .store
            .get_records(subject, user_id, &filter)?
            .into_iter()
            .map(|r| r.item_id)
            .collect();

        Ok(items
            .iter()
            .filter(|i| touched.contains(&i.item_id))
            .map(|i| subject.lesson_field.of(i))
            .collect())
    }

    /// The lessons to draw from.
    ///
    /// A manual range is returned as given. Otherwise the seen lessons come
    /// first (ascending), followed by learning path entries not yet seen while
    /// fewer than `learning_speed` lessons are open.
    pub fn resolve(
        &self,
        subject: &Subject,
        user_id: &str,
        scope: Scope,
        settings: &Settings,
        manual_range: Option<&[LessonId]>,
    ) -> Result<Vec<LessonId>> {
        if let Some(manual) = manual_range {
            tracing::debug!(subject = %subject, user_id, range = ?manual, "using manual range");
            return Ok(manual.to_vec());
        }

        let speed = settings.learning_speed(subject)?;
        let path = settings.learning_path(subject)?;
        let seen = self.seen_lessons(subject, user_id, scope)?;

        let mut range: Vec<LessonId> = seen.iter().copied().collect();
        for lesson in path {
            if range.len() >= speed {
                break;
            }
            if !range.contains(&lesson) {
                range.push(lesson);
            }
        }

        tracing::debug!(
            subject = %subject,
            user_id,
            seen = seen.len(),
            opened = range.len() - seen.len(),
            "resolved automatic range"
        );
        Ok(range)
    }
}
