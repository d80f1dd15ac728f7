//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// A throwaway workspace: `config/`, `scenarios/`, and a base directory for
/// challenges under the same temp root.
pub struct KitFixture {
    pub root: TempDir,
}

/// Exit status and captured streams from one `htbkit` run.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl KitFixture {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create temp root");
        let fixture = Self { root };
        let base = format!(
            r#"{{"base_directory": {}}}"#,
            serde_json::to_string(&fixture.challenges_dir().display().to_string())
                .expect("encode path")
        );
        fixture.write("config/base.json", &base);
        std::fs::create_dir_all(fixture.root.path().join("scenarios")).expect("scenarios dir");
        fixture
    }

    pub fn challenges_dir(&self) -> PathBuf {
        self.root.path().join("challenges")
    }

    pub fn challenge_dir(&self, name: &str) -> PathBuf {
        self.challenges_dir().join(name)
    }

    pub fn write(&self, relative: &str, contents: &str) -> &Self {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        self
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path)
            .unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_htbkit"));
        command
            .arg("--root")
            .arg(self.root.path())
            .args(args)
            .env_remove("HTBKIT_HOME")
            .env_remove("HTBKIT_LOG");
        command
    }

    pub fn run(&self, args: &[&str]) -> RunResult {
        self.command(args)
            .stdin(Stdio::null())
            .output()
            .expect("spawn htbkit")
            .into()
    }

    /// Run with `input` piped to stdin.
    pub fn run_with_input(&self, args: &[&str], input: &str) -> RunResult {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn htbkit");
        child
            .stdin
            .take()
            .expect("piped stdin")
            .write_all(input.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for htbkit").into()
    }
}
