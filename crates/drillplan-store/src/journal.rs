//! JSON journal of attempt records and paper compositions.
//!
//! The journal is the record store of a drillplan workspace. Records are kept
//! per subject; each committed paper logs which subjects it holds so score
//! sheets can be split back into per-subject orders.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use drillplan_core::model::{AttemptRecord, ItemId, Outcome, PaperEntry};
use drillplan_core::subject::Subject;
use drillplan_core::traits::{RecordFilter, RecordStore, ScoreUpdate};

use crate::error::StoreError;

/// Subjects printed on one user's paper at one timestamp, in question order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperLog {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<PaperEntry>,
}

/// All records and papers of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    /// Records keyed by subject register name.
    #[serde(default)]
    pub records: BTreeMap<String, Vec<AttemptRecord>>,
    #[serde(default)]
    pub papers: Vec<PaperLog>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a journal; a missing file is an empty journal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("journal {} not found, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read journal: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse journal: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize journal")?;
        std::fs::write(path, json).with_context(|| format!("failed to write journal: {}", path.display()))?;
        Ok(())
    }

    /// Number of records across all subjects.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a subject's share to the paper at `(user_id, timestamp)`.
    pub fn log_paper(&mut self, user_id: &str, timestamp: DateTime<Utc>, entry: PaperEntry) {
        match self
            .papers
            .iter_mut()
            .find(|p| p.user_id == user_id && p.timestamp == timestamp)
        {
            Some(paper) => paper.entries.push(entry),
            None => self.papers.push(PaperLog {
                user_id: user_id.to_string(),
                timestamp,
                entries: vec![entry],
            }),
        }
    }

    pub fn paper(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<&PaperLog, StoreError> {
        self.papers
            .iter()
            .find(|p| p.user_id == user_id && p.timestamp == timestamp)
            .ok_or_else(|| StoreError::UnknownPaper {
                user_id: user_id.to_string(),
                timestamp,
            })
    }

    /// Most recent paper of `user_id`, if any.
    pub fn latest_paper(&self, user_id: &str) -> Option<&PaperLog> {
        self.papers
            .iter()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| p.timestamp)
    }

    fn subject_records(&self, subject: &Subject) -> &[AttemptRecord] {
        self.records
            .get(&subject.register_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl RecordStore for Journal {
    fn get_records(&self, subject: &Subject, user_id: &str, filter: &RecordFilter) -> Result<Vec<AttemptRecord>> {
        Ok(self
            .subject_records(subject)
            .iter()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect())
    }

    fn session_records(
        &self,
        subject: &Subject,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<AttemptRecord>> {
        let mut session: Vec<_> = self
            .subject_records(subject)
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp == timestamp)
            .cloned()
            .collect();
        session.sort_by_key(|r| r.order);
        Ok(session)
    }

    fn insert_placeholder(
        &mut self,
        subject: &Subject,
        user_id: &str,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
        order: u32,
    ) -> Result<()> {
        let records = self.records.entry(subject.register_name.clone()).or_default();
        if records
            .iter()
            .any(|r| r.user_id == user_id && r.item_id == item_id && r.timestamp == timestamp)
        {
            return Err(StoreError::DuplicateRecord {
                user_id: user_id.to_string(),
                item_id,
                timestamp,
            }
            .into());
        }
        records.push(AttemptRecord {
            user_id: user_id.to_string(),
            item_id,
            outcome: Outcome::Pending,
            timestamp,
            order,
        });
        Ok(())
    }

    fn update_score(
        &mut self,
        subject: &Subject,
        user_id: &str,
        timestamp: DateTime<Utc>,
        order: u32,
        outcome: Outcome,
    ) -> Result<ScoreUpdate> {
        let Some(records) = self.records.get_mut(&subject.register_name) else {
            return Ok(ScoreUpdate::NotFound);
        };
        match records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.timestamp == timestamp && r.order == order)
        {
            Some(record) if record.outcome.is_settled() => {
                tracing::debug!(user_id, order, "record already scored, keeping {:?}", record.outcome);
                Ok(ScoreUpdate::AlreadyScored)
            }
            Some(record) => {
                record.outcome = outcome;
                Ok(ScoreUpdate::Scored)
            }
            None => Ok(ScoreUpdate::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts() -> DateTime<Utc> {
        "2024-03-01T08:00:00Z".parse().unwrap()
    }

    #[test]
    fn placeholders_and_scores() {
        let subject = Subject::chinese_zici();
        let mut journal = Journal::new();
        journal.insert_placeholder(&subject, "kid", 7, ts(), 2).unwrap();
        journal.insert_placeholder(&subject, "kid", 5, ts(), 1).unwrap();

        let session = journal.session_records(&subject, "kid", ts()).unwrap();
        assert_eq!(session.iter().map(|r| r.item_id).collect::<Vec<_>>(), vec![5, 7]);

        assert_eq!(
            journal.update_score(&subject, "kid", ts(), 2, Outcome::Wrong).unwrap(),
            ScoreUpdate::Scored
        );
        assert_eq!(
            journal.update_score(&subject, "kid", ts(), 3, Outcome::Wrong).unwrap(),
            ScoreUpdate::NotFound
        );
        assert_eq!(
            journal
                .update_score(&Subject::english_word(), "kid", ts(), 1, Outcome::Right)
                .unwrap(),
            ScoreUpdate::NotFound
        );

        let settled = journal.get_records(&subject, "kid", &RecordFilter::settled()).unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].item_id, 7);
    }

    #[test]
    fn scored_records_are_not_rewritten() {
        let subject = Subject::chinese_zici();
        let mut journal = Journal::new();
        journal.insert_placeholder(&subject, "kid", 7, ts(), 1).unwrap();

        assert_eq!(
            journal.update_score(&subject, "kid", ts(), 1, Outcome::Right).unwrap(),
            ScoreUpdate::Scored
        );
        assert_eq!(
            journal.update_score(&subject, "kid", ts(), 1, Outcome::Wrong).unwrap(),
            ScoreUpdate::AlreadyScored
        );
        let session = journal.session_records(&subject, "kid", ts()).unwrap();
        assert_eq!(session[0].outcome, Outcome::Right);
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let subject = Subject::chinese_zici();
        let mut journal = Journal::new();
        journal.insert_placeholder(&subject, "kid", 7, ts(), 1).unwrap();
        let err = journal.insert_placeholder(&subject, "kid", 7, ts(), 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DuplicateRecord { item_id: 7, .. })
        ));
    }

    #[test]
    fn subjects_are_separate() {
        let mut journal = Journal::new();
        journal
            .insert_placeholder(&Subject::chinese_zici(), "kid", 1, ts(), 1)
            .unwrap();
        let words = journal
            .get_records(&Subject::english_word(), "kid", &RecordFilter::all())
            .unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn papers_accumulate_subjects() {
        let mut journal = Journal::new();
        journal.log_paper("kid", ts(), PaperEntry { subject: "ch_zici".into(), count: 10 });
        journal.log_paper("kid", ts(), PaperEntry { subject: "en_word".into(), count: 5 });
        let paper = journal.paper("kid", ts()).unwrap();
        assert_eq!(paper.entries.len(), 2);
        assert_eq!(journal.latest_paper("kid").unwrap().timestamp, ts());
        assert!(journal.paper("ann", ts()).unwrap_err().is_not_found());
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("journal.json");
        let mut journal = Journal::new();
        journal
            .insert_placeholder(&Subject::chinese_zici(), "kid", 3, ts(), 1)
            .unwrap();
        journal.save(&path).unwrap();

        let loaded = Journal::load(&path).unwrap();
        assert_eq!(loaded, journal);
        assert!(Journal::load(&dir.path().join("missing.json")).unwrap().is_empty());
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Journal::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse journal"));
    }
}
