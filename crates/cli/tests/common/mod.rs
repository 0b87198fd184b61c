//! Common utilities for integration tests
//!
//! Wraps the `dirwatch` binary with an isolated config home so a user's
//! own config file never leaks into test runs.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// CLI command builder
pub struct DirwatchCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    /// Keeps the fake config home alive as long as the command
    _home: TempDir,
}

impl DirwatchCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        let home = TempDir::new().expect("Failed to create temp home");
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), home.path().display().to_string());
        env.insert(
            "XDG_CONFIG_HOME".to_string(),
            home.path().join(".config").display().to_string(),
        );

        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env,
            _home: home,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_dirwatch"));
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env);
        command
    }

    /// Run to completion
    pub fn execute(&self) -> CommandResult {
        let output = self.command().output().expect("Failed to execute dirwatch");
        CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        }
    }

    pub fn assert_success(&self) -> CommandResult {
        let result = self.execute();
        assert!(
            result.success(),
            "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
            result.exit_code,
            self.args,
            result.stdout,
            result.stderr
        );
        result
    }

    pub fn assert_failure(&self) -> CommandResult {
        let result = self.execute();
        assert!(
            !result.success(),
            "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
            self.args,
            result.stdout
        );
        result
    }

    /// Start a long-running watcher, streaming stdout lines
    pub fn spawn(&self) -> RunningWatcher {
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn dirwatch");

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");

        RunningWatcher {
            child,
            lines: stream_lines(stdout),
            log_lines: stream_lines(stderr),
        }
    }
}

/// Forward lines from a child pipe into a channel on a reader thread
fn stream_lines(pipe: impl Read + Send + 'static) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// A spawned `dirwatch` process; killed on drop
pub struct RunningWatcher {
    child: Child,
    /// Events on stdout
    lines: mpsc::Receiver<String>,
    /// Banner and logs on stderr
    log_lines: mpsc::Receiver<String>,
}

impl RunningWatcher {
    pub fn next_line(&self, timeout: Duration) -> Option<String> {
        self.lines.recv_timeout(timeout).ok()
    }

    /// Wait until a stderr line containing `text` shows up
    pub fn wait_for_log(&self, text: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match self.log_lines.recv_timeout(left) {
                Ok(line) if line.contains(text) => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
        false
    }
}

impl Drop for RunningWatcher {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Convenient command construction
///
/// ```ignore
/// dirwatch!(dir, "--print-config").assert_success();
/// ```
#[macro_export]
macro_rules! dirwatch {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::DirwatchCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
