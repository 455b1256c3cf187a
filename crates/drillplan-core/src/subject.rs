//! Per-subject strategy table.
//!
//! Every subject shares the same scheduling algorithms; what differs is a
//! handful of parameters collected in [`Subject`]. The settings key prefix is
//! the subject's register name (e.g. `ch_zici_max_num`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::model::{ItemMeta, LessonId};

/// Which catalog field groups items into the units a learning path walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonField {
    Lesson,
    Unit,
}

impl LessonField {
    pub fn of(self, item: &ItemMeta) -> LessonId {
        match self {
            LessonField::Lesson => item.lesson,
            LessonField::Unit => item.unit,
        }
    }
}

impl fmt::Display for LessonField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonField::Lesson => write!(f, "lesson"),
            LessonField::Unit => write!(f, "unit"),
        }
    }
}

/// Strategy parameters for one practice subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Register name, also the settings key prefix.
    pub register_name: String,
    /// Field that defines a "lesson" for range resolution.
    pub lesson_field: LessonField,
    /// Fixed lesson count for catalogs that are known to be incomplete.
    #[serde(default)]
    pub lesson_count_override: Option<u32>,
}

impl Subject {
    pub fn new(register_name: impl Into<String>, lesson_field: LessonField) -> Self {
        Self {
            register_name: register_name.into(),
            lesson_field,
            lesson_count_override: None,
        }
    }

    pub fn with_lesson_count(mut self, count: u32) -> Self {
        self.lesson_count_override = Some(count);
        self
    }

    /// Chinese characters and words, grouped by lesson.
    pub fn chinese_zici() -> Self {
        Self::new("ch_zici", LessonField::Lesson)
    }

    /// English words, grouped by unit; the word catalog only covers 12 units.
    pub fn english_word() -> Self {
        Self::new("en_word", LessonField::Unit).with_lesson_count(12)
    }

    /// Settings key for `field`, e.g. `ch_zici_max_num`.
    pub fn key(&self, field: &str) -> String {
        format!("{}_{}", self.register_name, field)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.register_name)
    }
}

/// Registry of known subjects keyed by register name.
#[derive(Debug, Clone)]
pub struct SubjectTable {
    subjects: BTreeMap<String, Subject>,
}

impl SubjectTable {
    pub fn empty() -> Self {
        Self {
            subjects: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, subject: Subject) {
        self.subjects.insert(subject.register_name.clone(), subject);
    }

    pub fn get(&self, register_name: &str) -> Result<&Subject, ScheduleError> {
        self.subjects
            .get(register_name)
            .ok_or_else(|| ScheduleError::UnknownSubject(register_name.to_string()))
    }

    pub fn contains(&self, register_name: &str) -> bool {
        self.subjects.contains_key(register_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }
}

impl Default for SubjectTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(Subject::chinese_zici());
        table.register(Subject::english_word());
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(lesson: LessonId, unit: LessonId) -> ItemMeta {
        ItemMeta {
            item_id: 1,
            grade: 2,
            volume: 1,
            lesson,
            unit,
            prompt: "shān".into(),
            answer: "山".into(),
        }
    }

    #[test]
    fn lesson_field_selects_grouping() {
        let meta = item(4, 2);
        assert_eq!(LessonField::Lesson.of(&meta), 4);
        assert_eq!(LessonField::Unit.of(&meta), 2);
    }

    #[test]
    fn builtin_table() {
        let table = SubjectTable::default();
        let word = table.get("en_word").unwrap();
        assert_eq!(word.lesson_field, LessonField::Unit);
        assert_eq!(word.lesson_count_override, Some(12));
        assert_eq!(table.get("ch_zici").unwrap().key("max_num"), "ch_zici_max_num");
        assert_eq!(
            table.get("math").unwrap_err(),
            ScheduleError::UnknownSubject("math".into())
        );
    }
}
