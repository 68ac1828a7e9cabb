use aimeter_core::{DailyStore, SqliteStore, TrackedSite};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("aimeter/usage.db")
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(PathBuf::from(assert_cmd::cargo::cargo_bin!("aimeter")));
        command
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_DATA_HOME", &self.xdg_data)
            .env("XDG_CONFIG_HOME", &self.xdg_config)
            .env("XDG_STATE_HOME", &self.xdg_state)
            .env_remove("RUST_LOG");
        command
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    env.command(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute aimeter: {e}"))
}

fn run_bin_with_stdin(env: &CliTestEnv, args: &[&str], stdin: &str) -> Output {
    let mut child = env
        .command(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("failed to spawn aimeter: {e}"));

    child
        .stdin
        .take()
        .expect("missing child stdin")
        .write_all(stdin.as_bytes())
        .expect("failed to write stdin");

    child.wait_with_output().expect("failed to wait for aimeter")
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "aimeter {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn today_json(env: &CliTestEnv) -> serde_json::Value {
    let output = run_bin(env, &["today", "--json"]);
    assert_success(&["today", "--json"], &output);
    serde_json::from_slice(&output.stdout).expect("today --json should print JSON")
}

#[test]
fn today_initializes_zero_record() {
    let env = CliTestEnv::new();

    let record = today_json(&env);
    assert_eq!(record["total"]["time"], 0);
    assert_eq!(record["claude"]["questions"], 0);
    assert!(env.db_path().exists(), "database should be created");

    let output = run_bin(&env, &["today"]);
    assert_success(&["today"], &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ChatGPT"));
    assert!(stdout.contains("Most used: -"));
}

#[test]
fn show_and_reset_a_past_day() {
    let env = CliTestEnv::new();

    {
        let kv = SqliteStore::open(&env.db_path()).expect("failed to open db");
        kv.migrate().expect("failed to migrate db");
        let store = DailyStore::new(Arc::new(kv));
        store
            .increment_time("2025-06-11", TrackedSite::Claude, 3_725)
            .expect("failed to seed time");
        store
            .increment_questions("2025-06-11", TrackedSite::Claude, 4)
            .expect("failed to seed questions");
    }

    let output = run_bin(&env, &["show", "2025-06-11"]);
    assert_success(&["show", "2025-06-11"], &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1h 2m"), "expected formatted time, got:\n{stdout}");
    assert!(stdout.contains("Most used: Claude"));

    let output = run_bin(&env, &["reset", "2025-06-11"]);
    assert_success(&["reset", "2025-06-11"], &output);

    let output = run_bin(&env, &["show", "2025-06-11", "--json"]);
    assert_success(&["show", "2025-06-11", "--json"], &output);
    let record: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(record["claude"]["time"], 0);
    assert_eq!(record["total"]["questions"], 0);
}

#[test]
fn show_rejects_invalid_date() {
    let env = CliTestEnv::new();
    let output = run_bin(&env, &["show", "June 11"]);
    assert!(!output.status.success());
}

#[test]
fn run_records_questions_from_stdin() {
    let env = CliTestEnv::new();

    let input = concat!(
        "{\"event\":\"startup\"}\n",
        "not json at all\n",
        "{\"type\":\"QUESTION_ASKED\",\"site\":\"claude\"}\n",
        "{\"type\":\"QUESTION_ASKED\",\"site\":\"claude\"}\n",
        "{\"type\":\"QUESTION_ASKED\",\"site\":\"gemini\"}\n",
    );
    let output = run_bin_with_stdin(&env, &["run"], input);
    assert_success(&["run"], &output);

    let record = today_json(&env);
    // The second claude notification falls inside the per-site debounce
    assert_eq!(record["claude"]["questions"], 1);
    assert_eq!(record["gemini"]["questions"], 1);
    assert_eq!(record["total"]["questions"], 2);
}

#[test]
fn week_lists_seven_days() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["week", "--json"]);
    assert_success(&["week", "--json"], &output);
    let days: Vec<serde_json::Value> =
        serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["weekday"], "Sun");
}
