//! TOML item catalog.
//!
//! A catalog file lists items per subject:
//!
//! ```toml
//! [[subjects]]
//! name = "ch_zici"
//!
//! [[subjects.items]]
//! item_id = 101
//! grade = 3
//! volume = 1
//! lesson = 1
//! prompt = "shān"
//! answer = "山"
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use drillplan_core::model::{ItemId, ItemMeta, LessonId};
use drillplan_core::subject::{Subject, SubjectTable};
use drillplan_core::traits::ItemCatalog;

#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    subjects: Vec<TomlSubject>,
}

#[derive(Debug, Deserialize)]
struct TomlSubject {
    name: String,
    #[serde(default)]
    items: Vec<TomlItem>,
}

#[derive(Debug, Deserialize)]
struct TomlItem {
    item_id: ItemId,
    grade: u32,
    volume: u32,
    #[serde(default)]
    lesson: LessonId,
    #[serde(default)]
    unit: LessonId,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    answer: String,
}

/// Items per subject register name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    subjects: BTreeMap<String, Vec<ItemMeta>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: &str, item: ItemMeta) {
        self.subjects.entry(subject.to_string()).or_default().push(item);
    }

    /// Merge another catalog into this one.
    pub fn extend(&mut self, other: Catalog) {
        for (subject, items) in other.subjects {
            self.subjects.entry(subject).or_default().extend(items);
        }
    }

    pub fn subject_names(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    pub fn items(&self, subject: &str) -> &[ItemMeta] {
        self.subjects.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item(&self, subject: &str, item_id: ItemId) -> Option<&ItemMeta> {
        self.items(subject).iter().find(|i| i.item_id == item_id)
    }

    pub fn len(&self) -> usize {
        self.subjects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scope<'a>(&'a self, subject: &Subject, grade: u32, volume: u32) -> impl Iterator<Item = &'a ItemMeta> {
        self.items(&subject.register_name)
            .iter()
            .filter(move |i| i.grade == grade && i.volume == volume)
    }
}

impl ItemCatalog for Catalog {
    fn get_items_by_ids(&self, subject: &Subject, ids: &[ItemId]) -> Result<Vec<ItemMeta>> {
        let wanted: HashSet<_> = ids.iter().collect();
        Ok(self
            .items(&subject.register_name)
            .iter()
            .filter(|i| wanted.contains(&i.item_id))
            .cloned()
            .collect())
    }

    fn get_items_by_lesson(
        &self,
        subject: &Subject,
        grade: u32,
        volume: u32,
        lessons: &[LessonId],
    ) -> Result<Vec<ItemMeta>> {
        Ok(self
            .scope(subject, grade, volume)
            .filter(|i| lessons.contains(&subject.lesson_field.of(i)))
            .cloned()
            .collect())
    }

    fn get_items_by_volume(&self, subject: &Subject, grade: u32, volume: u32) -> Result<Vec<ItemMeta>> {
        Ok(self.scope(subject, grade, volume).cloned().collect())
    }

    fn get_lesson_count(&self, subject: &Subject, grade: u32, volume: u32) -> Result<u32> {
        let lessons: BTreeSet<_> = self
            .scope(subject, grade, volume)
            .map(|i| subject.lesson_field.of(i))
            .collect();
        Ok(lessons.len() as u32)
    }
}

/// Parse a single catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;
    parse_catalog_str(&content, path)
}

/// Parse a catalog from a TOML string.
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut catalog = Catalog::new();
    for subject in parsed.subjects {
        for item in subject.items {
            catalog.insert(
                &subject.name,
                ItemMeta {
                    item_id: item.item_id,
                    grade: item.grade,
                    volume: item.volume,
                    lesson: item.lesson,
                    unit: item.unit,
                    prompt: item.prompt,
                    answer: item.answer,
                },
            );
        }
    }
    Ok(catalog)
}

/// Load a catalog file, or every `.toml` file below a directory.
pub fn load_catalog_path(path: &Path) -> Result<Catalog> {
    if !path.is_dir() {
        return load_catalog(path);
    }

    let mut catalog = Catalog::new();
    for entry in std::fs::read_dir(path).with_context(|| format!("failed to read directory: {}", path.display()))? {
        let entry = entry?;
        let file = entry.path();
        if file.is_dir() {
            catalog.extend(load_catalog_path(&file)?);
        } else if file.extension().is_some_and(|ext| ext == "toml") {
            match load_catalog(&file) {
                Ok(part) => catalog.extend(part),
                Err(e) => tracing::warn!("skipping {}: {:#}", file.display(), e),
            }
        }
    }
    Ok(catalog)
}

/// A warning from catalog validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub subject: String,
    /// The item ID (if applicable).
    pub item_id: Option<ItemId>,
    pub message: String,
}

/// Check a catalog for common issues.
pub fn validate_catalog(catalog: &Catalog, subjects: &SubjectTable) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (name, items) in &catalog.subjects {
        if !subjects.contains(name) {
            warnings.push(ValidationWarning {
                subject: name.clone(),
                item_id: None,
                message: format!("unknown subject: {name}"),
            });
        }

        let mut seen_ids = HashSet::new();
        for item in items {
            if !seen_ids.insert(item.item_id) {
                warnings.push(ValidationWarning {
                    subject: name.clone(),
                    item_id: Some(item.item_id),
                    message: format!("duplicate item ID: {}", item.item_id),
                });
            }
        }

        for item in items {
            if item.prompt.trim().is_empty() {
                warnings.push(ValidationWarning {
                    subject: name.clone(),
                    item_id: Some(item.item_id),
                    message: "prompt is empty".into(),
                });
            }
            if item.answer.trim().is_empty() {
                warnings.push(ValidationWarning {
                    subject: name.clone(),
                    item_id: Some(item.item_id),
                    message: "answer is empty".into(),
                });
            }
        }

        if let Ok(subject) = subjects.get(name) {
            for item in items {
                if subject.lesson_field.of(item) == 0 {
                    warnings.push(ValidationWarning {
                        subject: name.clone(),
                        item_id: Some(item.item_id),
                        message: format!("item has no {}", subject.lesson_field),
                    });
                }
            }
        }
    }

    warnings
}
