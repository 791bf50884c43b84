#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn mission(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mission").unwrap();
    cmd.current_dir(dir.path()).env("MISSION_ROOT", dir.path());
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--json").output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo(dir: &TempDir) {
    git(dir.path(), &["init", "--quiet"]);
    git(dir.path(), &["config", "user.name", "Test"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    std::fs::write(dir.path().join("README.md"), "# repo\n").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "--quiet", "-m", "initial"]);
}

fn write_mission(dir: &TempDir, id: &str) {
    std::fs::create_dir_all(dir.path().join(".mission")).unwrap();
    std::fs::write(
        dir.path().join(".mission/mission.md"),
        format!("---\nid: {id}\nstatus: active\nintent: Add login\n---\n# Mission\n"),
    )
    .unwrap();
}

// ---------------------------------------------------------------------------
// mission backlog
// ---------------------------------------------------------------------------

#[test]
fn backlog_add_creates_document() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "add", "Ship", "v1", "--type", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added feature item: Ship v1"));

    let content = read(&dir, ".mission/backlog.md");
    assert!(content.starts_with("---\n"));
    assert!(content.contains("## FEATURES"));
    assert!(content.contains("- [ ] Ship v1"));
}

#[test]
fn backlog_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "add", "x", "--type", "chore"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid backlog item type"));
}

#[test]
fn backlog_rejects_multi_line_description() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "add", "Ship v1\n## BUGFIXES", "--type", "feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("description must be a single line"));
}

#[test]
fn backlog_rejects_completed_type_on_add() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "add", "x", "--type", "completed"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: failed to add backlog item"));
}

#[test]
fn backlog_pattern_escalates() {
    let dir = TempDir::new().unwrap();
    for _ in 0..3 {
        mission(&dir)
            .args(["backlog", "add", "Extract X", "--type", "refactor", "--pattern", "ex"])
            .assert()
            .success();
    }
    let v = json_output(mission(&dir).args(["backlog", "pattern-count", "ex"]));
    assert_eq!(v["count"], 4);
    assert_eq!(read(&dir, ".mission/backlog.md").matches("[PATTERN:ex]").count(), 1);
}

#[test]
fn backlog_complete_list_and_cleanup() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "add-many", "--type", "bugfix", "Fix login", "Fix logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 2 bugfix items"));
    mission(&dir)
        .args(["backlog", "complete", "login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- [x] Fix login (Completed: "));

    let open = json_output(mission(&dir).args(["backlog", "list"]));
    assert_eq!(open, serde_json::json!(["- [ ] Fix logout"]));

    let done = json_output(mission(&dir).args(["backlog", "list", "--include", "completed"]));
    assert_eq!(done.as_array().unwrap().len(), 1);

    let v = json_output(mission(&dir).args(["backlog", "cleanup"]));
    assert_eq!(v["removed"], 1);
    let v = json_output(mission(&dir).args(["backlog", "cleanup"]));
    assert_eq!(v["removed"], 0);
}

#[test]
fn backlog_complete_unknown_item_fails() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "complete", "nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("backlog item not found"));
}

#[test]
fn backlog_list_include_and_exclude_conflict() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "list", "--include", "feature", "--exclude", "bugfix"])
        .assert()
        .failure();
}

#[test]
fn backlog_list_exclude_filters() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["backlog", "add", "a", "--type", "feature"])
        .assert()
        .success();
    mission(&dir)
        .args(["backlog", "add", "b", "--type", "future"])
        .assert()
        .success();
    let v = json_output(mission(&dir).args(["backlog", "list", "--exclude", "feature,bugfix"]));
    assert_eq!(v, serde_json::json!(["- [ ] b"]));
}

// ---------------------------------------------------------------------------
// mission diagnosis
// ---------------------------------------------------------------------------

#[test]
fn diagnosis_happy_path() {
    let dir = TempDir::new().unwrap();
    let meta = json_output(mission(&dir).args(["diagnosis", "create", "500", "on", "login"]));
    assert_eq!(meta["status"], "investigating");
    assert_eq!(meta["confidence"], "low");

    mission(&dir)
        .args([
            "diagnosis",
            "update-frontmatter",
            "--status",
            "confirmed",
            "--confidence",
            "high",
        ])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "update-section", "RECOMMENDED-FIX", "init", "session"])
        .assert()
        .success();

    let report = json_output(mission(&dir).args(["diagnosis", "finalize"]));
    assert_eq!(
        report,
        serde_json::json!({"valid": true, "message": "Diagnosis validated successfully"})
    );
}

#[test]
fn diagnosis_finalize_reports_missing_sections() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["diagnosis", "create", "X"])
        .assert()
        .success();
    let path = dir.path().join(".mission/diagnosis.md");
    let text = std::fs::read_to_string(&path)
        .unwrap()
        .replace("## HYPOTHESES\n1. **[UNKNOWN]** Investigation not yet started\n\n", "")
        .replace("## AFFECTED FILES\n- TBD\n\n", "");
    std::fs::write(&path, text).unwrap();

    mission(&dir)
        .args(["diagnosis", "finalize"])
        .assert()
        .success()
        .stdout("Missing required sections: HYPOTHESES, AFFECTED FILES\n");
}

#[test]
fn diagnosis_cannot_reopen() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["diagnosis", "create", "X"])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "update-frontmatter", "--status", "inconclusive"])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "update-frontmatter", "--status", "investigating"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid transition"));
}

#[test]
fn diagnosis_frontmatter_needs_a_flag() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["diagnosis", "create", "X"])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "update-frontmatter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one of status or confidence"));
}

#[test]
fn diagnosis_exists() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["diagnosis", "exists"])
        .assert()
        .success()
        .stdout("false\n");
    mission(&dir)
        .args(["diagnosis", "create", "X"])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "exists"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn diagnosis_update_without_document_fails() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["diagnosis", "update-section", "ROOT-CAUSE", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no diagnosis found"));
}

// ---------------------------------------------------------------------------
// mission validate
// ---------------------------------------------------------------------------

#[test]
fn validate_plain_intent() {
    let dir = TempDir::new().unwrap();
    let v = json_output(mission(&dir).args(["validate", "add", "a", "login", "page"]));
    assert_eq!(
        v,
        serde_json::json!({
            "is_valid": true,
            "message": "Input is valid",
            "next_step": "PROCEED with execution"
        })
    );
}

#[test]
fn validate_empty_and_placeholder() {
    let dir = TempDir::new().unwrap();
    let v = json_output(mission(&dir).arg("validate"));
    assert_eq!(v["is_valid"], false);
    assert_eq!(v["message"], "Input is empty or whitespace");

    let v = json_output(mission(&dir).args(["validate", "$ARGUMENTS"]));
    assert_eq!(v["message"], "Input is a placeholder - no intent provided");
    assert_eq!(
        v["next_step"],
        "ASK_USER: What is your intent or goal for this task?"
    );
}

#[test]
fn validate_redirects_to_diagnosis() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["diagnosis", "create", "500 on login"])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "update-section", "ROOT CAUSE", "session not init"])
        .assert()
        .success();
    mission(&dir)
        .args(["diagnosis", "update-list", "AFFECTED FILES", "auth.go"])
        .assert()
        .success();

    let v = json_output(mission(&dir).args(["validate", "anything"]));
    assert_eq!(v["is_valid"], true);
    assert_eq!(v["next_step"], "DIAGNOSIS_DETECTED");
    assert_eq!(v["diagnosis"]["root_cause"], "session not init");
    assert_eq!(v["diagnosis"]["affected_files"], serde_json::json!(["auth.go"]));
}

// ---------------------------------------------------------------------------
// mission checkpoint
// ---------------------------------------------------------------------------

#[test]
fn checkpoint_create_and_revert() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    init_repo(&dir);
    let a = dir.path().join("a.txt");
    std::fs::write(&a, "v1").unwrap();

    mission(&dir)
        .args(["checkpoint", "create", "--mission", "m1"])
        .assert()
        .success()
        .stdout("m1-1\n");

    std::fs::write(&a, "v2").unwrap();
    mission(&dir)
        .args(["checkpoint", "revert", "m1-1"])
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&a).unwrap(), "v1");

    mission(&dir)
        .args(["checkpoint", "revert", "m1-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("checkpoint not found: m1-1"));
}

#[test]
fn checkpoint_revert_rejects_revision_syntax() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    init_repo(&dir);
    mission(&dir)
        .args(["checkpoint", "create", "--mission", "m1"])
        .assert()
        .success();
    let readme = dir.path().join("README.md");
    std::fs::write(&readme, "tracked edit\n").unwrap();

    mission(&dir)
        .args(["checkpoint", "revert", "m1-1^"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must look like <mission>-<N>"));
    assert_eq!(std::fs::read_to_string(&readme).unwrap(), "tracked edit\n");
}

#[test]
fn checkpoint_uses_active_mission() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    init_repo(&dir);
    write_mission(&dir, "a3f9c2");

    mission(&dir)
        .args(["checkpoint", "create"])
        .assert()
        .success()
        .stdout("a3f9c2-1\n");
    mission(&dir)
        .args(["checkpoint", "create"])
        .assert()
        .success()
        .stdout("a3f9c2-2\n");

    let list = json_output(mission(&dir).args(["checkpoint", "list"]));
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a3f9c2-1", "a3f9c2-2"]);

    let v = json_output(mission(&dir).args(["checkpoint", "clear"]));
    assert_eq!(v["deleted"], 2);
}

#[test]
fn checkpoint_without_mission_fails() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .args(["checkpoint", "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no --mission given"));
}

// ---------------------------------------------------------------------------
// mission status
// ---------------------------------------------------------------------------

#[test]
fn status_without_mission() {
    let dir = TempDir::new().unwrap();
    mission(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:  unknown"));
}

#[test]
fn status_reports_mission_and_backlog() {
    let dir = TempDir::new().unwrap();
    write_mission(&dir, "m1");
    mission(&dir)
        .args(["backlog", "add", "a", "--type", "feature"])
        .assert()
        .success();
    let v = json_output(mission(&dir).arg("status"));
    assert_eq!(v["mission"]["id"], "m1");
    assert_eq!(v["status"], "active");
    assert_eq!(v["open_backlog_items"], 1);
    assert_eq!(v["diagnosis"], false);
}
