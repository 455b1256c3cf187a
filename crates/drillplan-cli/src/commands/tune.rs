//! The `drillplan tune` command.

use std::path::PathBuf;

use anyhow::Result;

use drillplan_core::subject::SubjectTable;
use drillplan_core::traits::ClassRegistry;
use drillplan_core::tuning::tune;

use super::Workspace;

pub fn execute(
    user: Option<String>,
    class: Option<String>,
    subject: Option<String>,
    window: usize,
    write: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut ws = Workspace::load(config.as_deref())?;
    let subjects = SubjectTable::default();
    let subject = subjects.get(&ws.subject_name(subject))?;

    let learners = match (user, class) {
        (Some(user), _) => vec![user],
        (None, Some(class)) => {
            if ws.profiles.grade_and_volume(&class)?.is_none() {
                anyhow::bail!("class `{class}` is not registered");
            }
            let roster = ws.profiles.roster(&class);
            if roster.is_empty() {
                anyhow::bail!("class `{class}` has no students");
            }
            roster
        }
        (None, None) => anyhow::bail!("pass --user or --class"),
    };

    let mut changed = 0;
    for user in &learners {
        let max_num = ws.profiles.user(user)?.bind_role(None, None)?.settings.max_num(subject)?;
        let outcome = tune(&ws.journal, subject, user, max_num, window)?;

        match outcome.pass_rate {
            Some(rate) => println!(
                "{user} / {subject}: {:.1}% right over the last {} session(s)",
                rate * 100.0,
                outcome.sessions
            ),
            None => println!("{user} / {subject}: no scored sessions yet"),
        }

        if !outcome.changed() {
            println!("Session size stays at {max_num}.");
            continue;
        }
        println!("Session size {} -> {}", outcome.previous, outcome.tuned);

        if write {
            ws.profiles
                .user_mut(user)?
                .bind_role_mut(None, None)?
                .settings
                .set(subject.key("max_num"), outcome.tuned);
            changed += 1;
        }
    }

    if changed > 0 {
        ws.save_profiles()?;
        println!("Saved {changed} learner(s) to {}", ws.config.profiles.display());
    }
    Ok(())
}
