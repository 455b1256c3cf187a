//! Session-size tuning from recent pass rates.

use anyhow::Result;
use serde::Serialize;

use crate::model::AttemptRecord;
use crate::progress::session_tallies;
use crate::subject::Subject;
use crate::traits::{RecordFilter, RecordStore};

/// Sessions looked at by default.
pub const DEFAULT_WINDOW: usize = 2;

/// Session size never tuned below this.
pub const MIN_SESSION_SIZE: usize = 5;

/// Session size never grown beyond this.
pub const MAX_SESSION_SIZE: usize = 20;

const SHRINK_BELOW: f64 = 0.8;
const GROW_ABOVE: f64 = 0.93;

/// Result of one tuning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneOutcome {
    pub previous: usize,
    pub tuned: usize,
    /// Right / settled over the window, `None` without history.
    pub pass_rate: Option<f64>,
    pub sessions: usize,
}

impl TuneOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.tuned
    }
}

/// New session size for a learner at `pass_rate`.
pub fn tune_max_num(max_num: usize, pass_rate: f64) -> usize {
    if pass_rate < SHRINK_BELOW && max_num > MIN_SESSION_SIZE {
        let shrunk = ((max_num as f64 * pass_rate).floor() as usize).max(MIN_SESSION_SIZE);
        shrunk.min(max_num)
    } else if pass_rate > GROW_ABOVE && max_num < MAX_SESSION_SIZE {
        max_num + 1
    } else {
        max_num
    }
}

/// Pass rate over the last `window` sessions of `history`.
pub fn recent_pass_rate(history: &[AttemptRecord], window: usize) -> (Option<f64>, usize) {
    let tallies = session_tallies(history);
    let recent: Vec<_> = tallies.values().rev().take(window).collect();
    let settled: usize = recent.iter().map(|t| t.size).sum();
    if settled == 0 {
        return (None, recent.len());
    }
    let right: usize = recent.iter().map(|t| t.size - t.errors).sum();
    (Some(right as f64 / settled as f64), recent.len())
}

/// Tune the session size of `user_id` from their stored history.
pub fn tune(
    store: &dyn RecordStore,
    subject: &Subject,
    user_id: &str,
    max_num: usize,
    window: usize,
) -> Result<TuneOutcome> {
    let history = store.get_records(subject, user_id, &RecordFilter::settled())?;
    let (pass_rate, sessions) = recent_pass_rate(&history, window);
    let tuned = pass_rate.map_or(max_num, |rate| tune_max_num(max_num, rate));

    let outcome = TuneOutcome {
        previous: max_num,
        tuned,
        pass_rate,
        sessions,
    };
    if outcome.changed() {
        tracing::info!(
            subject = %subject,
            user_id,
            previous = max_num,
            tuned,
            "adjusted session size"
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Outcome;
    use crate::testing::FakeStore;

    #[test]
    fn shrinks_on_low_pass_rate() {
        assert_eq!(tune_max_num(15, 0.5), 7);
        assert_eq!(tune_max_num(8, 0.5), 5);
        assert_eq!(tune_max_num(5, 0.1), 5);
    }

    #[test]
    fn grows_on_high_pass_rate() {
        assert_eq!(tune_max_num(10, 1.0), 11);
        assert_eq!(tune_max_num(20, 1.0), 20);
    }

    #[test]
    fn keeps_size_in_between() {
        assert_eq!(tune_max_num(10, 0.85), 10);
        assert_eq!(tune_max_num(10, 0.93), 10);
    }

    #[test]
    fn uses_last_two_sessions_only() {
        let mut store = FakeStore::default();
        // old session, all wrong
        for item in 1..=4 {
            store.answer(item, Outcome::Wrong, 10);
        }
        for item in 1..=4 {
            store.answer(item, Outcome::Right, 2);
            store.answer(item, Outcome::Right, 1);
        }
        let outcome = tune(&store, &Subject::chinese_zici(), "kid", 10, DEFAULT_WINDOW).unwrap();
        assert_eq!(outcome.sessions, 2);
        assert_eq!(outcome.pass_rate, Some(1.0));
        assert_eq!(outcome.tuned, 11);
    }

    #[test]
    fn no_history_keeps_size() {
        let store = FakeStore::default();
        let outcome = tune(&store, &Subject::chinese_zici(), "kid", 10, DEFAULT_WINDOW).unwrap();
        assert_eq!(outcome.pass_rate, None);
        assert!(!outcome.changed());
    }
}
