//! The `drillplan progress` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use drillplan_core::feedback::{Feedback, FeedbackRegistry};
use drillplan_core::progress::{PassRule, ProgressEngine};
use drillplan_core::range::resolve_scope;
use drillplan_core::subject::SubjectTable;

use super::Workspace;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    user: String,
    subject: Option<String>,
    grade: Option<u32>,
    volume: Option<u32>,
    rule: String,
    seed: Option<u64>,
    format: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let ws = Workspace::load(config.as_deref())?;
    let subjects = SubjectTable::default();
    let subject = subjects.get(&ws.subject_name(subject))?;
    let rule = rule.parse::<PassRule>().map_err(anyhow::Error::msg)?;
    let mut rng = ws.rng(seed);

    let learner = ws.profiles.user(&user)?;
    let role = learner.bind_role(None, None)?;
    let class_id = learner.class_id.as_deref().unwrap_or(&role.class_id);
    let scope = resolve_scope(grade, volume, Some(class_id), &ws.profiles)?;

    let snapshot = ProgressEngine::new(&ws.journal, &ws.catalog)
        .with_rule(rule)
        .snapshot(subject, &user, scope, &role.settings)?;

    let mut registry = FeedbackRegistry::default();
    registry.apply_toggles(subject, &role.settings);
    let feedback = registry.select(&snapshot, &mut rng);

    match format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "user_id": user,
                "subject": subject.register_name,
                "grade": scope.grade,
                "volume": scope.volume,
                "snapshot": snapshot,
                "feedback": feedback,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "text" => {
            println!(
                "{} / {} (grade {}, volume {})",
                user, subject, scope.grade, scope.volume
            );
            if feedback.is_empty() {
                println!("No feedback yet.");
            }
            for item in &feedback {
                print_feedback(item);
            }
        }
        other => anyhow::bail!("unknown format: {other} (expected text or json)"),
    }
    Ok(())
}

fn print_feedback(feedback: &Feedback) {
    match feedback {
        Feedback::TotalWins { count } => println!("Wins: {count}"),
        Feedback::AchievementsMatrix {
            lesson_ratios,
            mastered_count,
        } => {
            println!("Mastered items: {mastered_count}");
            let mut table = Table::new();
            table.set_header(vec!["Lesson", "Mastery"]);
            for (lesson, ratio) in lesson_ratios {
                table.add_row(vec![Cell::new(lesson), Cell::new(format!("{:.0}%", ratio * 100.0))]);
            }
            println!("{table}");
        }
    }
}
