//! Scenario execution engine.
//!
//! Runs a scenario's tasks strictly in document order, one blocking tool run
//! at a time. A failing task is recorded and logged; it never stops the
//! tasks after it. Only a structurally invalid scenario aborts, and it does
//! so before any task runs.
use super::catalog::load_scenario;
use super::{plan_scenario, ScenarioDocument};
use crate::challenge_log::log_action;
use crate::error::KitResult;
use crate::paths::{ChallengeContext, WorkspacePaths};
use crate::runner::TaskExecutor;
use serde::Serialize;

/// Where the scenario document comes from.
#[derive(Debug, Clone)]
pub enum ScenarioSource {
    /// Resolved to `scenarios/<name>.json`.
    Named(String),
    /// Already loaded; skips the file lookup.
    Document(ScenarioDocument),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Validating,
    Running(usize),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub task_name: String,
    pub status: TaskStatus,
    /// Present iff `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl TaskOutcome {
    fn success(task_name: &str) -> Self {
        Self {
            task_name: task_name.to_string(),
            status: TaskStatus::Success,
            error_detail: None,
        }
    }

    fn failed(task_name: &str, detail: String) -> Self {
        Self {
            task_name: task_name.to_string(),
            status: TaskStatus::Failed,
            error_detail: Some(detail),
        }
    }
}

/// Per-task outcomes in execution order. `completed` is set once every task
/// has been attempted, regardless of how many failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub outcomes: Vec<TaskOutcome>,
    pub completed: bool,
}

impl ScenarioResult {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == TaskStatus::Success)
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

pub struct ScenarioEngine<'a, E> {
    paths: &'a WorkspacePaths,
    executor: &'a E,
}

impl<'a, E: TaskExecutor> ScenarioEngine<'a, E> {
    pub fn new(paths: &'a WorkspacePaths, executor: &'a E) -> Self {
        Self { paths, executor }
    }

    /// Load, validate, and run every task of a scenario against `challenge`.
    ///
    /// Errors only for load or structural failures; task failures are
    /// reported through the returned [`ScenarioResult`].
    pub fn run(
        &self,
        source: ScenarioSource,
        challenge: &ChallengeContext,
    ) -> KitResult<ScenarioResult> {
        let mut phase = Phase::Loading;
        tracing::debug!(?phase, "scenario");
        let (document, label) = match source {
            ScenarioSource::Named(name) => (load_scenario(self.paths, &name)?, name),
            ScenarioSource::Document(document) => {
                let label = document.name.clone().unwrap_or_default();
                (document, label)
            }
        };

        phase = Phase::Validating;
        tracing::debug!(?phase, scenario = %label, "scenario");
        let plan = plan_scenario(&document, &label)?;

        tracing::info!(
            scenario = %plan.name,
            description = plan.description.as_deref().unwrap_or_default(),
            tasks = plan.tasks.len(),
            "running scenario"
        );
        let mut outcomes = Vec::with_capacity(plan.tasks.len());
        for (idx, (task, command)) in plan.tasks.iter().enumerate() {
            phase = Phase::Running(idx);
            tracing::info!(
                ?phase,
                task = %task.name,
                tool = %command.tool,
                preset = %command.preset,
                "executing task"
            );
            let outcome = match self
                .executor
                .execute(&command.tool, &command.preset, challenge)
            {
                Ok(()) => {
                    log_action(
                        challenge,
                        &format!("Task '{}' executed successfully.", task.name),
                        &[],
                    );
                    TaskOutcome::success(&task.name)
                }
                Err(err) => {
                    let detail = err.to_string();
                    tracing::warn!(task = %task.name, kind = ?err.kind(), error = %detail, "task failed");
                    log_action(
                        challenge,
                        &format!("Task '{}' failed with error: {detail}", task.name),
                        &[],
                    );
                    TaskOutcome::failed(&task.name, detail)
                }
            };
            outcomes.push(outcome);
        }

        phase = Phase::Completed;
        let result = ScenarioResult {
            scenario_name: plan.name,
            outcomes,
            completed: true,
        };
        log_action(
            challenge,
            &format!(
                "Scenario '{}' completed: {} succeeded, {} failed.",
                result.scenario_name,
                result.success_count(),
                result.failure_count()
            ),
            &[],
        );
        tracing::info!(
            ?phase,
            scenario = %result.scenario_name,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "scenario completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
