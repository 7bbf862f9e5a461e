use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, contents: &str) {
        let config_dir = self.xdg_config.join("microticks");
        fs::create_dir_all(&config_dir).expect("failed to create config dir");
        fs::write(config_dir.join("config.toml"), contents).expect("failed to write config");
    }

    fn command(&self, args: &[&str]) -> Command {
        let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("microticks"));
        let mut command = Command::new(bin_path);
        command
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", &self.xdg_config)
            .env("XDG_STATE_HOME", &self.xdg_state);
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .unwrap_or_else(|e| panic!("failed to execute microticks {:?}: {}", args, e))
    }
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "microticks {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        output.status,
        stdout,
        stderr
    );
}

#[test]
fn status_reports_unconfigured_tracker() {
    let env = CliTestEnv::new();

    let output = env.run(&["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Microticks Tracker Configuration"));
    assert!(stdout.contains("Status: Not ready"));
    assert!(stdout.contains("consumer_key"));
}

#[test]
fn status_reads_config_file() {
    let env = CliTestEnv::new();
    env.write_config(
        "[tracker]\nhost = \"http://localhost:5000\"\nconsumer_key = \"key-1\"\n",
    );

    let output = env.run(&["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("http://localhost:5000"));
    assert!(stdout.contains("Consumer key:  <set>"));
    assert!(stdout.contains("Status: Ready"));
}

#[test]
fn status_flags_dummy_mode() {
    let env = CliTestEnv::new();

    let output = env.run(&["--host", "dummy", "status"]);
    assert_success(&["--host", "dummy", "status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("offline dummy mode"));
}

#[test]
fn send_tracks_event_against_dummy_host() {
    let env = CliTestEnv::new();

    let args = ["--host", "dummy", "send", "click", "--data", "{\"target\":\"save\"}"];
    let output = env.run(&args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Tracked 'click'"));
}

#[test]
fn debug_flag_logs_dispatched_requests() {
    let env = CliTestEnv::new();

    let args = ["--host", "dummy", "--debug", "send", "click"];
    let output = env
        .command(&args)
        // The flag must raise the filter on its own
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute microticks send");
    assert_success(&args, &output);

    let log_dir = env.xdg_state.join("microticks");
    let mut logged = String::new();
    for entry in fs::read_dir(&log_dir).expect("log dir should exist") {
        let path = entry.expect("failed to read log dir entry").path();
        logged.push_str(&fs::read_to_string(&path).expect("failed to read log file"));
    }

    assert!(logged.contains("POST"), "missing request line in:\n{}", logged);
    assert!(
        logged.contains("\"action\":\"click\""),
        "missing payload in:\n{}",
        logged
    );
}

#[test]
fn send_rejects_malformed_data() {
    let env = CliTestEnv::new();

    let args = ["--host", "dummy", "send", "click", "--data", "not json"];
    let output = env.run(&args);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("JSON"));
}

#[test]
fn pipe_tracks_lines_and_skips_garbage() {
    let env = CliTestEnv::new();

    let mut child = env
        .command(&["--host", "dummy", "pipe"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn microticks pipe");

    child
        .stdin
        .as_mut()
        .expect("stdin should be piped")
        .write_all(b"{\"action\":\"click\",\"data\":{\"x\":1}}\nnot json\n{\"action\":\"scroll\"}\n")
        .expect("failed to write stdin");

    let output = child.wait_with_output().expect("failed to wait for pipe");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Tracked 2 event(s), skipped 1"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Skipping malformed event line"));
}
