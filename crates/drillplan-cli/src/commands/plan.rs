//! The `drillplan plan` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use drillplan_core::engine::{PlanRequest, Scheduler, Sources};
use drillplan_core::model::{SessionAllocation, SetMode};
use drillplan_core::profile::Identity;
use drillplan_store::Catalog;

use super::{parse_lessons, timestamp_or_now, Workspace};

pub struct PlanArgs {
    pub user: String,
    pub subject: Option<String>,
    pub targets: Option<String>,
    pub role: Option<String>,
    pub class: Option<String>,
    pub grade: Option<u32>,
    pub volume: Option<u32>,
    pub range: Option<String>,
    pub mode: Option<String>,
    pub size: Option<usize>,
    pub seed: Option<u64>,
    pub at: Option<String>,
    pub commit: bool,
    pub format: String,
    pub config: Option<PathBuf>,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    committed: bool,
    sessions: &'a [SessionAllocation],
}

pub fn execute(args: PlanArgs) -> Result<()> {
    let mut ws = Workspace::load(args.config.as_deref())?;
    let scheduler = Scheduler::default();
    let subject = ws.subject_name(args.subject);
    let now = timestamp_or_now(args.at.as_deref())?;
    let set_mode = args.mode.as_deref().map(str::parse::<SetMode>).transpose()?;
    let manual_range = args.range.as_deref().map(parse_lessons).transpose()?;
    let mut rng = ws.rng(args.seed);

    let requester = ws.profiles.user(&args.user)?;
    let bound = requester.bind_role(args.role.as_deref(), args.class.as_deref())?;
    let requested: Vec<String> = args
        .targets
        .as_deref()
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let targets = requester.authorize_targets(&requested, &ws.profiles.roster(&bound.class_id))?;
    if targets.is_empty() {
        anyhow::bail!("class `{}` has no students", bound.class_id);
    }

    let sources = Sources {
        store: &ws.journal,
        catalog: &ws.catalog,
        registry: &ws.profiles,
    };
    let mut sessions = Vec::with_capacity(targets.len());
    for target in &targets {
        let learner = ws.profiles.user(target)?;
        // A learner plans with their own settings; anyone else borrows the requester's.
        let (settings, class_id) = match learner.identity {
            Identity::Student => {
                let own = learner.bind_role(None, None)?;
                (&own.settings, own.class_id.clone())
            }
            Identity::Teacher => (&bound.settings, bound.class_id.clone()),
        };
        let request = PlanRequest {
            user_id: target.clone(),
            subject: subject.clone(),
            class_id: Some(class_id),
            grade: args.grade,
            volume: args.volume,
            manual_range: manual_range.clone(),
            set_mode,
            max_num: args.size,
        };
        let session = scheduler
            .plan(sources, &request, settings, now, &mut rng)
            .with_context(|| format!("failed to plan a session for `{target}`"))?;
        sessions.push(session);
    }

    if args.commit {
        for session in &sessions {
            let entry = scheduler.commit(&mut ws.journal, session, now)?;
            ws.journal.log_paper(&session.user_id, now, entry);
        }
        ws.save_journal()?;
    }

    match args.format.as_str() {
        "json" => {
            let output = PlanOutput {
                committed: args.commit,
                sessions: &sessions,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "text" => {
            for session in &sessions {
                print_session(session, &ws.catalog);
            }
            if args.commit {
                println!(
                    "Committed {} session(s) at {}",
                    sessions.len(),
                    now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
                );
            }
        }
        other => anyhow::bail!("unknown format: {other} (expected text or json)"),
    }

    Ok(())
}

fn print_session(session: &SessionAllocation, catalog: &Catalog) {
    use comfy_table::{Cell, Table};

    println!(
        "\n{} / {}: {} of {} item(s)",
        session.user_id,
        session.subject,
        session.items.len(),
        session.requested
    );

    let mut table = Table::new();
    table.set_header(vec![
        "#",
        "Item",
        "Prompt",
        "Lesson",
        "Bucket",
        "Attempts",
        "Challenge",
        "Memory",
    ]);
    for (idx, selected) in session.items.iter().enumerate() {
        let item = &selected.item;
        let prompt = catalog
            .item(&session.subject, item.item_id)
            .map(|meta| meta.prompt.as_str())
            .unwrap_or("");
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(item.item_id),
            Cell::new(prompt),
            Cell::new(item.lesson.map(|l| l.to_string()).unwrap_or_default()),
            Cell::new(selected.bucket),
            Cell::new(item.num_attempts),
            Cell::new(format!("{:.3}", item.challenge_value)),
            Cell::new(format_memory(item.memory_value)),
        ]);
    }
    println!("{table}");

    if session.is_short() {
        println!("Short by {} item(s): not enough eligible items in range.", session.shortfall);
    }
}

fn format_memory(value: f64) -> String {
    if value.is_infinite() {
        "due".to_string()
    } else {
        format!("{value:.3}")
    }
}
