//! Error taxonomy for the core operations.
//!
//! Every failure path in the config, runner, scenario, and challenge modules
//! maps onto exactly one [`ErrorKind`]. Command handlers wrap these in
//! `anyhow` for reporting.
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by callers to decide how far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Structural,
    Execution,
    Resource,
    Unexpected,
}

#[derive(Debug, Error)]
pub enum KitError {
    #[error("Configuration file for tool '{tool}' not found.")]
    ConfigFileNotFound { tool: String },

    #[error("config {} is not valid JSON: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("metadata {} is not valid JSON: {source}", .path.display())]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Preset '{preset}' is not valid for tool '{tool}'.")]
    InvalidPreset { tool: String, preset: String },

    #[error("preset '{preset}' of tool '{tool}' targets {{ip}} but the challenge has no IP recorded")]
    MissingTarget { tool: String, preset: String },

    #[error("preset '{preset}' of tool '{tool}' has an unparsable command: {message}")]
    InvalidCommandTemplate {
        tool: String,
        preset: String,
        message: String,
    },

    #[error("Scenario file '{}' not found.", .path.display())]
    ScenarioFileNotFound { path: PathBuf },

    #[error("scenario {} is not valid JSON: {source}", .path.display())]
    ScenarioParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Scenario '{scenario}' is missing required keys: {}", .missing_keys.join(", "))]
    InvalidScenarioStructure {
        scenario: String,
        missing_keys: Vec<String>,
    },

    #[error("task '{task}' has malformed command {command:?} (expected \"<tool> <preset>\")")]
    MalformedTaskCommand { task: String, command: String },

    #[error("invalid challenge name {name:?}")]
    InvalidChallengeName { name: String },

    #[error("Error executing tool '{tool}': {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Error executing tool '{tool}': timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("VPN connection error: {message}")]
    VpnConnection { message: String },

    #[error("Challenge directory '{}' does not exist.", .path.display())]
    ChallengeNotFound { path: PathBuf },

    #[error("Metadata file not found in challenge directory '{}'.", .path.display())]
    MetadataNotFound { path: PathBuf },

    #[error("Log file not found in challenge directory '{}'.", .path.display())]
    LogNotFound { path: PathBuf },

    #[error("No .ovpn files found in the directory '{}'.", .path.display())]
    NoVpnFiles { path: PathBuf },

    #[error("tool '{tool}' is not installed or not on PATH")]
    ToolNotInstalled { tool: String },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl KitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KitError::ConfigFileNotFound { .. }
            | KitError::ConfigParse { .. }
            | KitError::InvalidPreset { .. }
            | KitError::MissingTarget { .. }
            | KitError::InvalidCommandTemplate { .. } => ErrorKind::Configuration,
            KitError::ScenarioFileNotFound { .. }
            | KitError::ScenarioParse { .. }
            | KitError::InvalidScenarioStructure { .. }
            | KitError::MalformedTaskCommand { .. }
            | KitError::InvalidChallengeName { .. } => ErrorKind::Structural,
            KitError::ToolExecution { .. }
            | KitError::ToolTimeout { .. }
            | KitError::VpnConnection { .. } => ErrorKind::Execution,
            KitError::ChallengeNotFound { .. }
            | KitError::MetadataNotFound { .. }
            | KitError::MetadataParse { .. }
            | KitError::LogNotFound { .. }
            | KitError::NoVpnFiles { .. }
            | KitError::ToolNotInstalled { .. }
            | KitError::Io { .. } => ErrorKind::Resource,
            KitError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KitError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type KitResult<T> = Result<T, KitError>;
