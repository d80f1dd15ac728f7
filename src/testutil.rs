//! Shared fixtures for unit tests.
use crate::config::ConfigStore;
use crate::metadata::{save_metadata, ChallengeMetadata};
use crate::paths::{ChallengeContext, WorkspacePaths};
use crate::runner::process::{Invocation, ProcessLauncher, ProcessOutcome};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::Path;

/// A temp workspace with `config/`, `scenarios/`, and one challenge directory.
pub struct Workspace {
    pub root: tempfile::TempDir,
    pub paths: WorkspacePaths,
    pub challenge: ChallengeContext,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp root");
        let paths = WorkspacePaths::new(root.path().to_path_buf());
        std::fs::create_dir_all(paths.config_dir()).expect("create config dir");
        std::fs::create_dir_all(paths.scenarios_dir()).expect("create scenarios dir");
        let challenge = ChallengeContext::new(root.path().join("challenges").join("Lame"));
        std::fs::create_dir_all(challenge.path()).expect("create challenge dir");
        Self {
            root,
            paths,
            challenge,
        }
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.paths.clone())
    }

    pub fn tool(&self, name: &str, json: &str) -> &Self {
        write_file(&self.paths.config_path(name), json);
        self
    }

    pub fn scenario(&self, name: &str, json: &str) -> &Self {
        write_file(&self.paths.scenario_path(name), json);
        self
    }

    pub fn metadata(&self, ip: &str) -> &Self {
        save_metadata(&self.challenge, &ChallengeMetadata::new("Lame", ip)).expect("save metadata");
        self
    }

    pub fn log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.challenge.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, contents.as_bytes()).expect("write file");
}

/// Records invocations and replays scripted results in order. Once the
/// script is exhausted every launch succeeds.
#[derive(Default)]
pub struct FakeLauncher {
    pub invocations: RefCell<Vec<Invocation>>,
    script: RefCell<VecDeque<io::Result<ProcessOutcome>>>,
}

impl FakeLauncher {
    pub fn then(self, result: io::Result<ProcessOutcome>) -> Self {
        self.script.borrow_mut().push_back(result);
        self
    }

    pub fn exit(code: i32, stderr: &str) -> io::Result<ProcessOutcome> {
        Ok(ProcessOutcome {
            exit_code: Some(code),
            stderr: stderr.to_string(),
            ..ProcessOutcome::default()
        })
    }

    pub fn programs(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|invocation| invocation.program.clone())
            .collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        self.invocations.borrow_mut().push(invocation.clone());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| FakeLauncher::exit(0, ""))
    }
}

impl ProcessLauncher for &FakeLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        (**self).launch(invocation)
    }
}
