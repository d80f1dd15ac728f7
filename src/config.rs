//! Config store for tool presets and the base workspace settings.
//!
//! Configs are plain JSON documents under `config/`. Nothing is cached: each
//! lookup re-reads the file so edits between runs are visible immediately.
use crate::error::{KitError, KitResult};
use crate::paths::{expand_home, WorkspacePaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

/// Name of the base config document (`config/base.json`).
pub const BASE_CONFIG_NAME: &str = "base";
const DEFAULT_BASE_DIRECTORY: &str = "~/HTB";
const DEFAULT_OUTPUT_FLAG: &str = "-o";
const DEFAULT_VPN_COMMAND: &str = "sudo openvpn --config";

/// One external tool and its named presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Populated from the config file stem, not the document body.
    #[serde(skip)]
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub presets: Vec<Preset>,
}

impl ToolConfig {
    /// Output file relative to the challenge directory.
    pub fn output_file(&self) -> String {
        self.output_file
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.txt", self.tool_name))
    }

    pub fn output_flag(&self) -> &str {
        self.output_flag
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_OUTPUT_FLAG)
    }

    /// Exact, case-sensitive lookup by preset name.
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.name == name)
    }
}

/// A named flag combination for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Tool flags without output redirection.
    pub command: String,
}

/// Workspace-wide settings from `config/base.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    #[serde(default = "default_base_directory")]
    pub base_directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_seconds: Option<u64>,
    /// Command prefix for the VPN client; the `.ovpn` path is appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_command: Option<String>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
            tool_timeout_seconds: None,
            vpn_command: None,
        }
    }
}

impl BaseConfig {
    /// Base directory with `~` expanded.
    pub fn base_path(&self) -> PathBuf {
        expand_home(self.base_directory.trim())
    }

    pub fn vpn_command(&self) -> &str {
        self.vpn_command
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_VPN_COMMAND)
    }
}

fn default_base_directory() -> String {
    DEFAULT_BASE_DIRECTORY.to_string()
}

/// Lookup-by-name access to the `config/` namespace.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: WorkspacePaths,
}

impl ConfigStore {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }

    /// Load `config/<tool>.json`, failing with `ConfigFileNotFound` when absent.
    pub fn load_tool(&self, tool: &str) -> KitResult<ToolConfig> {
        let path = self.paths.config_path(tool);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                return Err(KitError::ConfigFileNotFound {
                    tool: tool.to_string(),
                })
            }
            Err(err) => return Err(KitError::io("read config", path, err)),
        };
        let mut config: ToolConfig = serde_json::from_slice(&bytes)
            .map_err(|source| KitError::ConfigParse { path, source })?;
        config.tool_name = tool.to_string();
        Ok(config)
    }

    /// Load `config/base.json`, falling back to defaults when the file is absent.
    pub fn load_base(&self) -> KitResult<BaseConfig> {
        let path = self.paths.config_path(BASE_CONFIG_NAME);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "base config missing; using defaults");
                return Ok(BaseConfig::default());
            }
            Err(err) => return Err(KitError::io("read config", path, err)),
        };
        serde_json::from_slice(&bytes).map_err(|source| KitError::ConfigParse { path, source })
    }

    /// Names of every tool config present, sorted. `base.json` is excluded.
    pub fn list_tools(&self) -> KitResult<Vec<String>> {
        let dir = self.paths.config_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(KitError::io("read config dir", dir, err)),
        };
        let mut tools = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| KitError::io("read config dir", &dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem != BASE_CONFIG_NAME {
                tools.push(stem.to_string());
            }
        }
        tools.sort();
        Ok(tools)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
