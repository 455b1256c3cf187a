//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FIXTURE_CONFIG: &str = "../../fixtures/drillplan.toml";
const PLAN_AT: &str = "2024-06-01T08:00:00Z";

fn drillplan() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("drillplan").unwrap()
}

/// Copy the fixture workspace into a temp dir for commands that write.
fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    for name in ["drillplan.toml", "catalog.toml", "profiles.toml", "journal.json"] {
        std::fs::copy(Path::new("../../fixtures").join(name), dir.path().join(name)).unwrap();
    }
    let config = dir.path().join("drillplan.toml");
    (dir, config)
}

fn plan_json(args: &[&str]) -> serde_json::Value {
    let output = drillplan()
        .args(["plan", "--config", FIXTURE_CONFIG, "--at", PLAN_AT, "--format", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn help_lists_commands() {
    drillplan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("score"))
        .stdout(predicate::str::contains("progress"))
        .stdout(predicate::str::contains("tune"));
}

#[test]
fn version_flag() {
    drillplan()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("drillplan"));
}

#[test]
fn validate_fixture_workspace() {
    drillplan()
        .args(["validate", "--config", FIXTURE_CONFIG])
        .assert()
        .success()
        .stdout(predicate::str::contains("Subject: ch_zici (16 items)"))
        .stdout(predicate::str::contains("Subject: en_word (6 items)"))
        .stdout(predicate::str::contains("Profiles: 1 classes, 3 users"))
        .stdout(predicate::str::contains("All files valid."));
}

#[test]
fn validate_reports_catalog_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        "[[subjects]]\nname = \"math\"\n\n[[subjects.items]]\nitem_id = 1\ngrade = 1\nvolume = 1\nlesson = 1\nprompt = \"1+1\"\nanswer = \"\"\n",
    )
    .unwrap();

    drillplan()
        .arg("validate")
        .arg("--catalog")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown subject: math"))
        .stdout(predicate::str::contains("[math:1] WARNING: answer is empty"))
        .stdout(predicate::str::contains("2 warning(s) found."));
}

#[test]
fn validate_nonexistent_file() {
    drillplan()
        .args(["validate", "--catalog", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn plan_for_student_as_json() {
    let plan = plan_json(&["--user", "kid"]);
    assert_eq!(plan["committed"], false);

    let sessions = plan["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session["user_id"], "kid");
    assert_eq!(session["requested"], 6);
    assert_eq!(session["shortfall"], 0);

    let items = session["items"].as_array().unwrap();
    assert_eq!(items.len(), 6);
    // the only item whose latest answer is wrong
    assert_eq!(items[0]["item_id"], 201);
    assert_eq!(items[0]["bucket"], "incorrect");
    // lessons 1 and 2 are already open, so nothing from 3 or 4
    assert!(items.iter().all(|i| i["lesson"] == 1 || i["lesson"] == 2));
}

#[test]
fn same_seed_same_plan() {
    let ids = |plan: serde_json::Value| -> Vec<u64> {
        plan["sessions"][0]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["item_id"].as_u64().unwrap())
            .collect()
    };
    assert_eq!(
        ids(plan_json(&["--user", "kid", "--seed", "7"])),
        ids(plan_json(&["--user", "kid", "--seed", "7"]))
    );
}

#[test]
fn plan_rocket_mode_skips_review() {
    let plan = plan_json(&["--user", "kid", "--mode", "rocket"]);
    let items = plan["sessions"][0]["items"].as_array().unwrap();
    assert!(items.iter().all(|i| i["bucket"] != "correct"));
}

#[test]
fn plan_manual_range_reports_shortfall() {
    let plan = plan_json(&["--user", "kid", "--range", "4", "--size", "10"]);
    let session = &plan["sessions"][0];
    assert_eq!(session["items"].as_array().unwrap().len(), 4);
    assert_eq!(session["shortfall"], 6);
}

#[test]
fn plan_text_table() {
    drillplan()
        .args(["plan", "--config", FIXTURE_CONFIG, "--at", PLAN_AT, "--user", "kid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kid / ch_zici: 6 of 6 item(s)"))
        .stdout(predicate::str::contains("incorrect"));
}

#[test]
fn student_cannot_plan_for_others() {
    drillplan()
        .args(["plan", "--config", FIXTURE_CONFIG, "--user", "kid", "--targets", "ann"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));
}

#[test]
fn unknown_mode_is_rejected() {
    drillplan()
        .args(["plan", "--config", FIXTURE_CONFIG, "--user", "kid", "--mode", "turbo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown set mode: turbo"));
}

#[test]
fn unknown_user_is_rejected() {
    drillplan()
        .args(["plan", "--config", FIXTURE_CONFIG, "--user", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown user: ghost"));
}

#[test]
fn teacher_plans_for_whole_class() {
    let plan = plan_json(&["--user", "liyu"]);
    let users: Vec<_> = plan["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["user_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(users, vec!["kid", "ann"]);

    // ann has no history and a single open lesson of four items
    let ann = &plan["sessions"][1];
    assert_eq!(ann["requested"], 5);
    assert_eq!(ann["shortfall"], 1);
    assert!(ann["items"].as_array().unwrap().iter().all(|i| i["bucket"] == "new"));
}

#[test]
fn commit_then_score() {
    let (dir, config) = workspace();

    drillplan()
        .arg("plan")
        .arg("--config")
        .arg(&config)
        .args(["--user", "liyu", "--at", PLAN_AT, "--commit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed 2 session(s) at 2024-06-01T08:00:00Z"));

    let journal: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("journal.json")).unwrap()).unwrap();
    let pending = journal["records"]["ch_zici"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["correct"] == 2)
        .count();
    assert_eq!(pending, 6 + 4);
    assert_eq!(journal["papers"].as_array().unwrap().len(), 4);

    let sheet = dir.path().join("score_liyu_20240601080000.txt");
    std::fs::write(&sheet, "kid$ 小明 + 1 2 3\nann$ Ann\n").unwrap();

    drillplan()
        .arg("score")
        .arg("--config")
        .arg(&config)
        .arg("--sheet")
        .arg(&sheet)
        .assert()
        .success()
        .stdout(predicate::str::contains("absent"))
        .stdout(predicate::str::contains("2 line(s), 6 answer(s) scored"));

    let journal: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("journal.json")).unwrap()).unwrap();
    let session: Vec<_> = journal["records"]["ch_zici"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["user_id"] == "kid" && r["timestamp"] == PLAN_AT)
        .map(|r| (r["order"].as_u64().unwrap(), r["correct"].as_u64().unwrap()))
        .collect();
    assert_eq!(session.len(), 6);
    for (order, outcome) in session {
        assert_eq!(outcome, u64::from(order <= 3), "order {order}");
    }
}

#[test]
fn score_dry_run_leaves_journal_untouched() {
    let (dir, config) = workspace();
    let before = std::fs::read_to_string(dir.path().join("journal.json")).unwrap();

    let sheet = dir.path().join("score_liyu_20240508080000.txt");
    std::fs::write(&sheet, "kid$ 小明 - 1 2 3 4\n").unwrap();

    drillplan()
        .arg("score")
        .arg("--config")
        .arg(&config)
        .arg("--sheet")
        .arg(&sheet)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    let after = std::fs::read_to_string(dir.path().join("journal.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn rescoring_a_paper_keeps_first_results() {
    let (dir, config) = workspace();
    let sheet = dir.path().join("score_liyu_20240508080000.txt");
    std::fs::write(&sheet, "kid$ 小明 - 1 2 3 4
").unwrap();

    drillplan()
        .arg("score")
        .arg("--config")
        .arg(&config)
        .arg("--sheet")
        .arg(&sheet)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 answer(s) scored"))
        .stdout(predicate::str::contains("4 question(s) were already scored"));

    let journal: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("journal.json")).unwrap()).unwrap();
    let outcomes: Vec<_> = journal["records"]["ch_zici"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["timestamp"] == "2024-05-08T08:00:00Z")
        .map(|r| r["correct"].as_u64().unwrap())
        .collect();
    assert_eq!(outcomes, vec![1, 1, 0, 1]);
}

#[test]
fn score_sheet_with_hyphenated_name() {
    let (dir, config) = workspace();
    drillplan()
        .arg("plan")
        .arg("--config")
        .arg(&config)
        .args(["--user", "kid", "--at", PLAN_AT, "--commit"])
        .assert()
        .success();

    let sheet = dir.path().join("score_liyu_20240601080000.txt");
    std::fs::write(&sheet, "kid$ Mary-Jane + 1 2
").unwrap();
    drillplan()
        .arg("score")
        .arg("--config")
        .arg(&config)
        .arg("--sheet")
        .arg(&sheet)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 line(s), "));
}

#[test]
fn score_without_paper_fails() {
    let (dir, config) = workspace();
    let sheet = dir.path().join("score_liyu_20240301080000.txt");
    std::fs::write(&sheet, "kid$ 小明 + 1\n").unwrap();

    drillplan()
        .arg("score")
        .arg("--config")
        .arg(&config)
        .arg("--sheet")
        .arg(&sheet)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no committed paper"));
}

#[test]
fn score_needs_a_timestamp() {
    let (dir, config) = workspace();
    let sheet = dir.path().join("scores.txt");
    std::fs::write(&sheet, "kid$ 小明 + 1\n").unwrap();

    drillplan()
        .arg("score")
        .arg("--config")
        .arg(&config)
        .arg("--sheet")
        .arg(&sheet)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timestamp"));
}

#[test]
fn progress_shows_wins_and_mastery() {
    drillplan()
        .args(["progress", "--config", FIXTURE_CONFIG, "--user", "kid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wins: 2"))
        .stdout(predicate::str::contains("Mastered items: 5"))
        .stdout(predicate::str::contains("100%"))
        .stdout(predicate::str::contains("25%"));
}

#[test]
fn progress_json_snapshot() {
    let output = drillplan()
        .args(["progress", "--config", FIXTURE_CONFIG, "--user", "kid", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let progress: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(progress["snapshot"]["win_count"], 2);
    assert_eq!(progress["snapshot"]["lesson_count"], 4);
    assert_eq!(progress["snapshot"]["lesson_ratios"]["2"], 0.25);
    assert_eq!(progress["feedback"].as_array().unwrap().len(), 2);
}

#[test]
fn progress_honors_feedback_toggles() {
    // ann turned total wins off and has no wins anyway
    drillplan()
        .args(["progress", "--config", FIXTURE_CONFIG, "--user", "ann"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wins:").not())
        .stdout(predicate::str::contains("Mastered items: 0"));
}

#[test]
fn tune_shrinks_after_weak_sessions() {
    let (dir, config) = workspace();

    drillplan()
        .arg("tune")
        .arg("--config")
        .arg(&config)
        .args(["--user", "kid", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("75.0% right over the last 2 session(s)"))
        .stdout(predicate::str::contains("Session size 6 -> 5"));

    let profiles = std::fs::read_to_string(dir.path().join("profiles.toml")).unwrap();
    assert!(profiles.contains("ch_zici_max_num = 5"));
}

#[test]
fn tune_without_history_keeps_size() {
    drillplan()
        .args(["tune", "--config", FIXTURE_CONFIG, "--user", "ann"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no scored sessions yet"))
        .stdout(predicate::str::contains("Session size stays at 5."));
}

#[test]
fn tune_whole_class() {
    let (dir, config) = workspace();

    drillplan()
        .arg("tune")
        .arg("--config")
        .arg(&config)
        .args(["--class", "lychee", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kid / ch_zici: 75.0% right"))
        .stdout(predicate::str::contains("Session size 6 -> 5"))
        .stdout(predicate::str::contains("ann / ch_zici: no scored sessions yet"))
        .stdout(predicate::str::contains("Saved 1 learner(s)"));

    let profiles = std::fs::read_to_string(dir.path().join("profiles.toml")).unwrap();
    assert!(profiles.contains("ch_zici_max_num = 5"));
}

#[test]
fn tune_unknown_class_fails() {
    drillplan()
        .args(["tune", "--config", FIXTURE_CONFIG, "--class", "dandelion"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("class `dandelion` is not registered"));
}

#[test]
fn tune_needs_user_or_class() {
    drillplan()
        .args(["tune", "--config", FIXTURE_CONFIG])
        .assert()
        .failure();
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    drillplan()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created drillplan.toml"))
        .stdout(predicate::str::contains("Created catalog.toml"))
        .stdout(predicate::str::contains("Created profiles.toml"));

    assert!(dir.path().join("drillplan.toml").exists());

    drillplan()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All files valid."));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("drillplan.toml"), "# existing").unwrap();

    drillplan()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));
}
