//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gradebook() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("gradebook").unwrap();
    cmd.env_remove("GRADEBOOK_STORE_URL")
        .env_remove("GRADEBOOK_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// A temp dir holding a config that points at a file store inside it.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("data").join("evaluations.json");
    let config = format!(
        "default_task_weight_fraction = 0.5\n\n[store]\ntype = \"file\"\npath = {:?}\n",
        store.display().to_string()
    );
    std::fs::write(dir.path().join("gradebook.toml"), config).unwrap();
    dir
}

fn created_id(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .find_map(|l| l.strip_prefix("Created evaluation "))
        .map(|id| id.trim().to_string())
        .expect("no created id in output")
}

fn save(dir: &Path, user: &str, args: &[&str]) -> std::process::Output {
    gradebook()
        .current_dir(dir)
        .args(["save", "--user-id", user])
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn evaluate_tasks_only_passes() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--policy", "tasks-only", "--student", "Ana"])
        .args(["--tasks", "8,6,10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Average: 8.00"))
        .stdout(predicate::str::contains("PASS"))
        .stdout(predicate::str::contains(
            "Congratulations Ana! You passed with an average of 8.00.",
        ));
}

#[test]
fn evaluate_mixed_uses_task_weight() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--policy", "tasks+exam", "--student", "Luis"])
        .args(["--tasks", "7", "--exams", "5", "--task-weight", "0.4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Average: 5.80"))
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("Sorry Luis, you did not pass."));
}

#[test]
fn evaluate_ignores_placeholder_scores() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--policy", "tasks-only", "--tasks", "6,,0,6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Average: 6.00"))
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn evaluate_json_output() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--policy", "exam-only", "--exams", "4,6"])
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"average\": 5.0"))
        .stdout(predicate::str::contains("\"passed\": false"));
}

#[test]
fn evaluate_exam_only_without_exams_fails() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--policy", "exam-only", "--tasks", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("exam score"));
}

#[test]
fn evaluate_requires_policy_or_draft() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--tasks", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--policy"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created gradebook.toml"))
        .stdout(predicate::str::contains("Created drafts/example.toml"));

    assert!(dir.path().join("gradebook.toml").exists());
    assert!(dir.path().join("drafts/example.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_example_draft_validates_and_evaluates() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    gradebook()
        .current_dir(dir.path())
        .args(["validate", "--draft", "drafts/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Math / Ana (tasks+exam, 2 tasks, 1 exams)"))
        .stdout(predicate::str::contains("All drafts valid."));

    gradebook()
        .current_dir(dir.path())
        .args(["evaluate", "--draft", "drafts/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Average: 5.80"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("draft.toml");
    std::fs::write(
        &path,
        r#"
[evaluation]
subject = "Math"
policy = "exam-only"

[[tasks]]
score = 9.0
"#,
    )
    .unwrap();

    gradebook()
        .arg("validate")
        .arg("--draft")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING"))
        .stdout(predicate::str::contains("1 warning(s) found."));
}

#[test]
fn validate_nonexistent_file() {
    gradebook()
        .args(["validate", "--draft", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn save_merges_into_existing_record() {
    let dir = workspace();

    let first = save(
        dir.path(),
        "ana",
        &["--policy", "tasks-only", "--subject", "Math", "--tasks", "8,6"],
    );
    assert!(first.status.success());
    let id = created_id(&first.stdout);

    gradebook()
        .current_dir(dir.path())
        .args(["save", "--user-id", "ana", "--policy", "tasks-only"])
        .args(["--subject", "math ", "--tasks", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Merged into evaluation {id}")))
        .stdout(predicate::str::contains("3 tasks"))
        .stdout(predicate::str::contains("Average: 8.00"));

    gradebook()
        .current_dir(dir.path())
        .args(["history", "--user-id", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("1 evaluation(s)"));
}

#[test]
fn save_with_new_creates_separate_record() {
    let dir = workspace();
    let args = ["--policy", "exam-only", "--subject", "Art", "--exams", "7"];

    assert!(save(dir.path(), "ana", &args).status.success());

    gradebook()
        .current_dir(dir.path())
        .args(["save", "--user-id", "ana", "--on-duplicate", "new"])
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created evaluation"));

    gradebook()
        .current_dir(dir.path())
        .args(["history", "--user-id", "ana", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"subject_name\": \"Art\"").count(2));
}

#[test]
fn history_is_scoped_to_the_student() {
    let dir = workspace();
    let args = ["--policy", "exam-only", "--subject", "Art", "--exams", "7"];
    assert!(save(dir.path(), "ana", &args).status.success());

    gradebook()
        .current_dir(dir.path())
        .args(["history", "--user-id", "luis"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No evaluations found."));

    gradebook()
        .current_dir(dir.path())
        .args(["history", "--user-id", "prof", "--role", "teacher"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Art"));
}

#[test]
fn student_cannot_save_for_someone_else() {
    let dir = workspace();

    gradebook()
        .current_dir(dir.path())
        .args(["save", "--user-id", "ana", "--owner", "luis"])
        .args(["--policy", "exam-only", "--subject", "Art", "--exams", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden"));
}

#[test]
fn rollup_for_teacher_only() {
    let dir = workspace();
    let math = ["--policy", "tasks-only", "--subject", "Math"];

    let mut ana = math.to_vec();
    ana.extend(["--student", "Ana", "--tasks", "5"]);
    let mut luis = math.to_vec();
    luis.extend(["--student", "Luis", "--tasks", "7"]);
    assert!(save(dir.path(), "ana", &ana).status.success());
    assert!(save(dir.path(), "luis", &luis).status.success());

    gradebook()
        .current_dir(dir.path())
        .args(["rollup", "--user-id", "ana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden"));

    gradebook()
        .current_dir(dir.path())
        .args(["rollup", "--user-id", "prof", "--role", "teacher"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6.00"))
        .stdout(predicate::str::contains("Failing in Math (tasks-only):"))
        .stdout(predicate::str::contains("Ana 5.00"));
}

#[test]
fn edit_replaces_scores_and_bumps_version() {
    let dir = workspace();
    let out = save(
        dir.path(),
        "ana",
        &["--policy", "tasks-only", "--subject", "Math", "--tasks", "5"],
    );
    let id = created_id(&out.stdout);

    gradebook()
        .current_dir(dir.path())
        .args(["edit", "--user-id", "ana", "--id", &id, "--tasks", "9,7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("version 2"))
        .stdout(predicate::str::contains("Average: 8.00"));

    gradebook()
        .current_dir(dir.path())
        .args(["edit", "--user-id", "luis", "--id", &id, "--tasks", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden"));
}

#[test]
fn delete_removes_record() {
    let dir = workspace();
    let out = save(
        dir.path(),
        "ana",
        &["--policy", "exam-only", "--subject", "Art", "--exams", "7"],
    );
    let id = created_id(&out.stdout);

    gradebook()
        .current_dir(dir.path())
        .args(["delete", "--user-id", "ana", "--id", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted evaluation"));

    gradebook()
        .current_dir(dir.path())
        .args(["delete", "--user-id", "ana", "--id", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn help_output() {
    gradebook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Grade evaluation and aggregation engine"));
}

#[test]
fn version_output() {
    gradebook()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gradebook"));
}
