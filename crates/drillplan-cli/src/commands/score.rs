//! The `drillplan score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use drillplan_core::scoresheet::{apply_entry, parse_sheet, parse_sheet_filename, ApplySummary, Marks};
use drillplan_core::subject::SubjectTable;

use super::{timestamp_or_now, Workspace};

pub fn execute(sheet: PathBuf, timestamp: Option<String>, dry_run: bool, config: Option<PathBuf>) -> Result<()> {
    let mut ws = Workspace::load(config.as_deref())?;
    let subjects = SubjectTable::default();

    let file_name = sheet
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = match (timestamp, parse_sheet_filename(&file_name)) {
        (Some(ts), _) => timestamp_or_now(Some(&ts))?,
        (None, Some((uploader, ts))) => {
            tracing::debug!(uploader = %uploader, "timestamp taken from sheet name");
            ts
        }
        (None, None) => anyhow::bail!(
            "cannot read a timestamp from `{file_name}`; name it score_<user>_<YYYYMMDDhhmmss>.txt or pass --timestamp"
        ),
    };

    let text =
        std::fs::read_to_string(&sheet).with_context(|| format!("failed to read score sheet: {}", sheet.display()))?;
    let entries = parse_sheet(&text).with_context(|| format!("invalid score sheet: {}", sheet.display()))?;

    let mut table = Table::new();
    table.set_header(vec!["Student", "Marks", "Updated", "Pending", "Kept", "Missing"]);
    let mut total = ApplySummary::default();

    for entry in &entries {
        if entry.marks == Marks::Absent {
            table.add_row(vec![
                Cell::new(&entry.username),
                Cell::new("absent"),
                Cell::new(0),
                Cell::new("-"),
                Cell::new(0),
                Cell::new(0),
            ]);
            continue;
        }
        let composition = ws
            .journal
            .paper(&entry.username, timestamp)
            .with_context(|| format!("line for `{}` has no committed paper", entry.username))?
            .entries
            .clone();
        let summary = apply_entry(&mut ws.journal, &subjects, entry, &composition, timestamp)?;
        table.add_row(vec![
            Cell::new(&entry.username),
            Cell::new(&entry.marks),
            Cell::new(summary.updated),
            Cell::new(summary.skipped),
            Cell::new(summary.already_scored),
            Cell::new(summary.missing),
        ]);
        total.updated += summary.updated;
        total.skipped += summary.skipped;
        total.missing += summary.missing;
        total.already_scored += summary.already_scored;
    }

    println!("{table}");
    println!(
        "{} line(s), {} answer(s) scored for the paper of {}",
        entries.len(),
        total.updated,
        timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
    if total.already_scored > 0 {
        println!(
            "{} question(s) were already scored and kept their earlier result.",
            total.already_scored
        );
    }
    if total.missing > 0 {
        println!("{} question(s) had no session record.", total.missing);
    }

    if dry_run {
        println!("Dry run: journal not saved.");
    } else {
        ws.save_journal()?;
    }
    Ok(())
}
