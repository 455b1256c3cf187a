//! Marked score sheets.
//!
//! Each line of a sheet scores one learner's paper:
//!
//! ```text
//! username$ display-name + 1 4 7
//! ```
//!
//! `+` lists the right answers (all others are wrong), `-` lists the wrong
//! answers (all others are right), and a line without a sign marks the learner
//! absent. Question numbers run across the whole paper; the paper composition
//! splits them back into per-subject orders.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ScheduleError;
use crate::model::{Outcome, PaperEntry};
use crate::subject::SubjectTable;
use crate::traits::{RecordStore, ScoreUpdate};

const RIGHT_SIGNS: [char; 2] = ['+', '＋'];
const WRONG_SIGNS: [char; 2] = ['-', '－'];

/// The marks on one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marks {
    /// No sign: the learner did not sit the paper.
    Absent,
    /// Question numbers answered right.
    Right(Vec<u32>),
    /// Question numbers answered wrong.
    Wrong(Vec<u32>),
}

impl Marks {
    /// Outcomes of questions `1..=count`. Absent papers stay pending.
    pub fn outcomes(&self, count: usize) -> Vec<Outcome> {
        (1..=count as u32)
            .map(|n| match self {
                Marks::Absent => Outcome::Pending,
                Marks::Right(listed) if listed.contains(&n) => Outcome::Right,
                Marks::Right(_) => Outcome::Wrong,
                Marks::Wrong(listed) if listed.contains(&n) => Outcome::Wrong,
                Marks::Wrong(_) => Outcome::Right,
            })
            .collect()
    }

    /// Keep the numbers in `(offset, offset + count]`, re-based to start at 1.
    fn slice(&self, offset: u32, count: u32) -> Marks {
        let rebase = |listed: &[u32]| -> Vec<u32> {
            listed
                .iter()
                .filter(|&&n| n > offset && n <= offset + count)
                .map(|n| n - offset)
                .collect()
        };
        match self {
            Marks::Absent => Marks::Absent,
            Marks::Right(listed) => Marks::Right(rebase(listed)),
            Marks::Wrong(listed) => Marks::Wrong(rebase(listed)),
        }
    }
}

impl fmt::Display for Marks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |listed: &[u32]| {
            listed
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            Marks::Absent => write!(f, "absent"),
            Marks::Right(listed) => write!(f, "+ {}", join(listed)),
            Marks::Wrong(listed) => write!(f, "- {}", join(listed)),
        }
    }
}

/// One parsed sheet line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub username: String,
    pub display_name: String,
    pub marks: Marks,
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '，' | ';' | '；')
}

fn parse_numbers(line_no: usize, text: &str) -> Result<Vec<u32>, ScheduleError> {
    text.split(is_separator)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<u32>().map_err(|_| ScheduleError::ScoreSheet {
                line: line_no,
                message: format!("invalid question number `{token}`"),
            })
        })
        .collect()
}

/// Parse one line. Blank lines yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<SheetEntry>, ScheduleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (username, rest) = line.split_once('$').ok_or_else(|| ScheduleError::ScoreSheet {
        line: line_no,
        message: "missing `$` after the username".into(),
    })?;
    let username = username.trim();
    if username.is_empty() {
        return Err(ScheduleError::ScoreSheet {
            line: line_no,
            message: "empty username".into(),
        });
    }

    let sign = find_sign(rest);
    let (display_name, marks) = match sign {
        None => (rest.trim(), Marks::Absent),
        Some(at) => {
            let sign_char = rest[at..].chars().next().unwrap_or('+');
            let numbers = parse_numbers(line_no, &rest[at + sign_char.len_utf8()..])?;
            let marks = if RIGHT_SIGNS.contains(&sign_char) {
                Marks::Right(numbers)
            } else {
                Marks::Wrong(numbers)
            };
            (rest[..at].trim(), marks)
        }
    };

    Ok(Some(SheetEntry {
        username: username.to_string(),
        display_name: display_name.to_string(),
        marks,
    }))
}

/// Locate the sign that opens the marks. Display names may carry hyphens or
/// plus signs, so the last sign followed only by numbers wins. A sign followed
/// by anything starting with a digit is still taken so bad numbers surface.
fn find_sign(rest: &str) -> Option<usize> {
    let signs: Vec<(usize, char)> = rest
        .char_indices()
        .filter(|(_, c)| RIGHT_SIGNS.contains(c) || WRONG_SIGNS.contains(c))
        .collect();
    let tail = |at: usize, c: char| &rest[at + c.len_utf8()..];

    signs
        .iter()
        .rev()
        .find(|&&(at, c)| {
            tail(at, c)
                .chars()
                .all(|t| t.is_ascii_digit() || is_separator(t))
        })
        .or_else(|| {
            signs.iter().rev().find(|&&(at, c)| {
                tail(at, c)
                    .trim_start()
                    .starts_with(|t: char| t.is_ascii_digit())
            })
        })
        .map(|&(at, _)| at)
}

/// Parse a whole sheet. Line numbers in errors are 1-based.
pub fn parse_sheet(text: &str) -> Result<Vec<SheetEntry>, ScheduleError> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(entry) = parse_line(idx + 1, line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Paper timestamp from a sheet file name like `score_liyu_20240301080000.txt`.
///
/// Returns the uploading user and the timestamp.
pub fn parse_sheet_filename(name: &str) -> Option<(String, DateTime<Utc>)> {
    let stem = name.strip_suffix(".txt").unwrap_or(name);
    let rest = stem.strip_prefix("score_")?;
    let (user, stamp) = rest.rsplit_once('_')?;
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;
    Some((user.to_string(), naive.and_utc()))
}

/// Split paper-wide marks into per-subject marks with orders starting at 1.
pub fn split_by_paper(marks: &Marks, composition: &[PaperEntry]) -> Vec<(PaperEntry, Marks)> {
    let mut offset = 0u32;
    composition
        .iter()
        .map(|entry| {
            let count = entry.count as u32;
            let part = marks.slice(offset, count);
            offset += count;
            (entry.clone(), part)
        })
        .collect()
}

/// What applying one sheet entry changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub updated: usize,
    /// Orders without a matching record.
    pub missing: usize,
    /// Questions left pending.
    pub skipped: usize,
    /// Orders whose record was scored by an earlier sheet.
    pub already_scored: usize,
}

/// Write the outcomes of `entry` for the paper at `timestamp`.
pub fn apply_entry(
    store: &mut dyn RecordStore,
    subjects: &SubjectTable,
    entry: &SheetEntry,
    composition: &[PaperEntry],
    timestamp: DateTime<Utc>,
) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();
    for (part, marks) in split_by_paper(&entry.marks, composition) {
        let subject = subjects.get(&part.subject)?;
        for (idx, outcome) in marks.outcomes(part.count).into_iter().enumerate() {
            if !outcome.is_settled() {
                summary.skipped += 1;
                continue;
            }
            let order = idx as u32 + 1;
            match store.update_score(subject, &entry.username, timestamp, order, outcome)? {
                ScoreUpdate::Scored => summary.updated += 1,
                ScoreUpdate::AlreadyScored => {
                    tracing::warn!(
                        subject = %subject,
                        username = %entry.username,
                        order,
                        "question already scored, keeping the first result"
                    );
                    summary.already_scored += 1;
                }
                ScoreUpdate::NotFound => {
                    tracing::warn!(
                        subject = %subject,
                        username = %entry.username,
                        order,
                        "no session record for scored question"
                    );
                    summary.missing += 1;
                }
            }
        }
    }
    tracing::debug!(
        username = %entry.username,
        updated = summary.updated,
        skipped = summary.skipped,
        "applied score sheet entry"
    );
    Ok(summary)
}
