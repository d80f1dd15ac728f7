//! Scenario JSON model and validation rules.
//!
//! A scenario is an ordered list of `tool preset` tasks. Documents are parsed
//! leniently so missing keys can be reported by name instead of failing in
//! the JSON layer.
pub mod catalog;
pub mod engine;

use crate::error::{KitError, KitResult};
use serde::{Deserialize, Serialize};

/// Top-level scenario document parsed from `scenarios/<name>.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
}

/// One scenario step: a label plus a `tool preset` reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
}

/// The two tokens of a task command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCommand {
    pub tool: String,
    pub preset: String,
}

/// A scenario that passed structural validation.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub name: String,
    pub description: Option<String>,
    pub tasks: Vec<(Task, TaskCommand)>,
}

/// Split `"<tool> <preset>"` on whitespace; exactly two tokens are accepted.
pub fn parse_task_command(task: &Task) -> KitResult<TaskCommand> {
    let mut tokens = task.command.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(tool), Some(preset), None) => Ok(TaskCommand {
            tool: tool.to_string(),
            preset: preset.to_string(),
        }),
        _ => Err(KitError::MalformedTaskCommand {
            task: task.name.clone(),
            command: task.command.clone(),
        }),
    }
}

/// Required keys (`name`, `tasks`) that are absent or blank in `document`.
pub fn missing_keys(document: &ScenarioDocument) -> Vec<String> {
    let mut missing = Vec::new();
    if document
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .is_none()
    {
        missing.push("name".to_string());
    }
    if document.tasks.is_none() {
        missing.push("tasks".to_string());
    }
    missing
}

/// Validate structure and every task command before anything runs.
///
/// `label` names the scenario in errors when the document has no usable name.
pub fn plan_scenario(document: &ScenarioDocument, label: &str) -> KitResult<ScenarioPlan> {
    let missing = missing_keys(document);
    if !missing.is_empty() {
        let scenario = document
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(label)
            .to_string();
        return Err(KitError::InvalidScenarioStructure {
            scenario,
            missing_keys: missing,
        });
    }
    let name = document.name.clone().unwrap_or_default();
    let tasks = document.tasks.as_deref().unwrap_or_default();
    let mut planned = Vec::with_capacity(tasks.len());
    for task in tasks {
        let command = parse_task_command(task)?;
        planned.push((task.clone(), command));
    }
    Ok(ScenarioPlan {
        name,
        description: document.description.clone(),
        tasks: planned,
    })
}
