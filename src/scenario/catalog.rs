//! Scenario discovery, loading, and the whole-directory validation report.
use super::{parse_task_command, ScenarioDocument, Task};
use crate::config::ConfigStore;
use crate::error::{KitError, KitResult};
use crate::paths::WorkspacePaths;
use crate::validate::validate_command;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

const INVALID_SCENARIO_NAME: &str = "Invalid Scenario";
const INVALID_SCENARIO_DESCRIPTION: &str = "Error reading JSON.";
const UNNAMED_SCENARIO: &str = "Unnamed Scenario";
const NO_DESCRIPTION: &str = "No description available.";

/// Menu entry for one `scenarios/*.json` file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScenarioSummary {
    /// File stem; pass this to `load_scenario`.
    pub id: String,
    pub file: String,
    pub name: String,
    pub description: String,
    pub task_count: usize,
    pub readable: bool,
}

/// Validation findings for one scenario file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScenarioValidation {
    pub file: String,
    pub issues: Vec<String>,
}

impl ScenarioValidation {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Load `scenarios/<name>.json`.
pub fn load_scenario(paths: &WorkspacePaths, name: &str) -> KitResult<ScenarioDocument> {
    let path = paths.scenario_path(name);
    load_scenario_file(&path)
}

pub fn load_scenario_file(path: &Path) -> KitResult<ScenarioDocument> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == IoErrorKind::NotFound => {
            return Err(KitError::ScenarioFileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(KitError::io("read scenario", path, err)),
    };
    serde_json::from_slice(&bytes).map_err(|source| KitError::ScenarioParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Every `*.json` under `scenarios/`, sorted by file name.
pub fn scenario_files(paths: &WorkspacePaths) -> KitResult<Vec<PathBuf>> {
    let dir = paths.scenarios_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(KitError::io("read scenarios dir", dir, err)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| KitError::io("read scenarios dir", &dir, err))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Summaries for the scenario menu. Unreadable files are listed, not skipped.
pub fn list_scenarios(paths: &WorkspacePaths) -> KitResult<Vec<ScenarioSummary>> {
    let mut summaries = Vec::new();
    for path in scenario_files(paths)? {
        let id = file_stem(&path);
        let file = file_name(&path);
        let summary = match load_scenario_file(&path) {
            Ok(document) => ScenarioSummary {
                id,
                file,
                name: non_blank(document.name).unwrap_or_else(|| UNNAMED_SCENARIO.to_string()),
                description: non_blank(document.description)
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                task_count: document.tasks.map(|tasks| tasks.len()).unwrap_or(0),
                readable: true,
            },
            Err(err) => {
                tracing::debug!(file = %path.display(), error = %err, "unreadable scenario");
                ScenarioSummary {
                    id,
                    file,
                    name: INVALID_SCENARIO_NAME.to_string(),
                    description: INVALID_SCENARIO_DESCRIPTION.to_string(),
                    task_count: 0,
                    readable: false,
                }
            }
        };
        summaries.push(summary);
    }
    Ok(summaries)
}

/// Check every scenario file for missing keys, malformed task commands, and
/// `(tool, preset)` references that do not resolve.
pub fn validate_scenarios(
    paths: &WorkspacePaths,
    store: &ConfigStore,
) -> KitResult<Vec<ScenarioValidation>> {
    let mut report = Vec::new();
    for path in scenario_files(paths)? {
        let issues = match fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        {
            Some(value) => validate_document_value(&value, store),
            None => vec!["Invalid JSON format.".to_string()],
        };
        report.push(ScenarioValidation {
            file: file_name(&path),
            issues,
        });
    }
    Ok(report)
}

fn validate_document_value(value: &Value, store: &ConfigStore) -> Vec<String> {
    let mut issues = Vec::new();
    let Some(object) = value.as_object() else {
        return vec!["Scenario must be a JSON object.".to_string()];
    };
    for key in ["name", "description", "tasks"] {
        if !object.contains_key(key) {
            issues.push(format!("Missing key: {key}"));
        }
    }
    let tasks = match object.get("tasks") {
        None => return issues,
        Some(Value::Array(tasks)) => tasks,
        Some(_) => {
            issues.push("tasks must be a list".to_string());
            return issues;
        }
    };
    for (idx, raw) in tasks.iter().enumerate() {
        let name = raw.get("name").and_then(Value::as_str);
        let command = raw.get("command").and_then(Value::as_str);
        let (Some(name), Some(command)) = (name, command) else {
            issues.push(format!("Task {} missing required keys: {raw}", idx + 1));
            continue;
        };
        let task = Task {
            name: name.to_string(),
            command: command.to_string(),
        };
        match parse_task_command(&task) {
            Ok(parsed) => {
                if !validate_command(store, &parsed.tool, &parsed.preset) {
                    issues.push(format!("Invalid command: {command}"));
                }
            }
            Err(err) => issues.push(err.to_string()),
        }
    }
    issues
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Workspace;

    const RECON: &str = r#"{
        "name": "Recon",
        "description": "Performs reconnaissance tasks.",
        "tasks": [
            {"name": "Nmap Scan", "command": "nmap stealth"},
            {"name": "Gobuster Scan", "command": "gobuster directory"}
        ]
    }"#;

    #[test]
    fn lists_scenarios_including_unreadable_files() {
        let ws = Workspace::new();
        ws.scenario("recon", RECON)
            .scenario("broken", "{")
            .scenario("bare", r#"{"tasks":[]}"#);

        let summaries = list_scenarios(&ws.paths).expect("list");
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Unnamed Scenario", "Invalid Scenario", "Recon"]);
        assert_eq!(summaries[0].description, "No description available.");
        assert!(!summaries[1].readable);
        assert_eq!(summaries[2].id, "recon");
        assert_eq!(summaries[2].task_count, 2);
    }

    #[test]
    fn load_reports_missing_and_invalid_files() {
        let ws = Workspace::new();
        ws.scenario("broken", "{");
        let err = load_scenario(&ws.paths, "absent").expect_err("missing");
        assert!(matches!(err, KitError::ScenarioFileNotFound { .. }));
        let err = load_scenario(&ws.paths, "broken").expect_err("broken");
        assert!(matches!(err, KitError::ScenarioParse { .. }));
    }

    #[test]
    fn validation_report_flags_each_problem() {
        let ws = Workspace::new();
        ws.tool(
            "nmap",
            r#"{"presets":[{"name":"stealth","command":"-sS"}]}"#,
        )
        .scenario("recon", RECON)
        .scenario(
            "invalid",
            r#"{"description":"Missing required keys.","tasks":[{"command":"nmap normal"},{"name":"x","command":"nmap"}]}"#,
        )
        .scenario("garbage", "not json");

        let report = validate_scenarios(&ws.paths, &ws.store()).expect("validate");
        let by_file = |file: &str| {
            report
                .iter()
                .find(|entry| entry.file == file)
                .unwrap_or_else(|| panic!("missing {file}"))
        };

        assert_eq!(by_file("garbage.json").issues, vec!["Invalid JSON format."]);
        assert_eq!(
            by_file("recon.json").issues,
            vec!["Invalid command: gobuster directory"]
        );
        let invalid = &by_file("invalid.json").issues;
        assert_eq!(invalid[0], "Missing key: name");
        assert!(invalid[1].starts_with("Task 1 missing required keys"));
        assert!(invalid[2].contains("malformed command"));
        assert_eq!(invalid.len(), 3);
    }
}
