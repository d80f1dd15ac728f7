//! Typed paths into the workspace and challenge layouts.
//!
//! Centralizing path construction keeps file access consistent across the
//! config store, scenario loader, and challenge helpers.
use std::path::{Path, PathBuf};

/// Environment variable that overrides the workspace root.
pub const HOME_ENV: &str = "HTBKIT_HOME";

const CHALLENGE_LOG_FILE: &str = "challenge.log";
const METADATA_FILE: &str = "metadata.json";
const REPORT_FILE: &str = "report.md";

/// Locates `config/` and `scenarios/` under a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve the root from an explicit flag, then `HTBKIT_HOME`, then the cwd.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(root) = explicit {
            return Self::new(root.to_path_buf());
        }
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Self::new(PathBuf::from(home));
        }
        Self::new(PathBuf::from("."))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `config/` directory path.
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Return the `config/<name>.json` path.
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.config_dir().join(format!("{name}.json"))
    }

    /// Return the `scenarios/` directory path.
    pub fn scenarios_dir(&self) -> PathBuf {
        self.root.join("scenarios")
    }

    /// Return the `scenarios/<name>.json` path.
    pub fn scenario_path(&self, name: &str) -> PathBuf {
        self.scenarios_dir().join(format!("{name}.json"))
    }
}

/// A challenge working directory passed explicitly to every core call.
///
/// The path is made absolute on construction, so output paths handed to
/// tools stay valid when the child runs inside the challenge directory.
#[derive(Debug, Clone)]
pub struct ChallengeContext {
    path: PathBuf,
}

impl ChallengeContext {
    pub fn new(path: PathBuf) -> Self {
        let path = std::path::absolute(&path).unwrap_or(path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name, used as the challenge name when metadata is absent.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn log_path(&self) -> PathBuf {
        self.path.join(CHALLENGE_LOG_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.path.join(REPORT_FILE)
    }

    pub fn output_path(&self, output_file: &str) -> PathBuf {
        self.path.join(output_file)
    }
}

/// Expand a leading `~` using the current user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
