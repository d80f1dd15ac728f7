//! Tool runner.
//!
//! Resolves a `(tool, preset)` pair against the config store, appends the
//! output redirect, and runs the tool as a blocking child process inside the
//! challenge directory.
pub mod process;

use crate::challenge_log::log_action;
use crate::config::{ConfigStore, Preset, ToolConfig};
use crate::error::{KitError, KitResult};
use crate::metadata::load_metadata;
use crate::paths::ChallengeContext;
use process::{Invocation, ProcessLauncher, ProcessOutcome, SystemLauncher};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

const IP_PLACEHOLDER: &str = "{ip}";
const CHALLENGE_PLACEHOLDER: &str = "{challenge}";

/// Executes one `tool preset` pair for a scenario task.
pub trait TaskExecutor {
    fn execute(&self, tool: &str, preset: &str, challenge: &ChallengeContext) -> KitResult<()>;
}

pub struct ToolRunner<L = SystemLauncher> {
    store: ConfigStore,
    launcher: L,
    default_timeout_seconds: Option<u64>,
}

impl ToolRunner<SystemLauncher> {
    pub fn new(store: ConfigStore) -> Self {
        Self::with_launcher(store, SystemLauncher)
    }
}

impl<L: ProcessLauncher> ToolRunner<L> {
    pub fn with_launcher(store: ConfigStore, launcher: L) -> Self {
        Self {
            store,
            launcher,
            default_timeout_seconds: None,
        }
    }

    /// Fallback timeout for tools whose config does not set `timeout_seconds`.
    pub fn default_timeout(mut self, seconds: Option<u64>) -> Self {
        self.default_timeout_seconds = seconds.filter(|value| *value > 0);
        self
    }

    /// Run `tool` with `preset`, returning the output file path on success.
    ///
    /// Unexpected failures are logged to the challenge log and returned as
    /// `KitError::Unexpected`, so callers see a single error contract.
    pub fn run(&self, tool: &str, preset: &str, challenge: &ChallengeContext) -> KitResult<PathBuf> {
        match self.run_inner(tool, preset, challenge) {
            Err(KitError::Unexpected(message)) => {
                log_action(
                    challenge,
                    &format!("Unexpected error while running tool '{tool}': {message}"),
                    &[],
                );
                tracing::error!(tool, preset, error = %message, "unexpected tool runner failure");
                Err(KitError::Unexpected(message))
            }
            other => other,
        }
    }

    fn run_inner(
        &self,
        tool: &str,
        preset_name: &str,
        challenge: &ChallengeContext,
    ) -> KitResult<PathBuf> {
        if !challenge.path().is_dir() {
            return Err(KitError::ChallengeNotFound {
                path: challenge.path().to_path_buf(),
            });
        }
        let config = self.store.load_tool(tool)?;
        let preset = config
            .preset(preset_name)
            .ok_or_else(|| KitError::InvalidPreset {
                tool: tool.to_string(),
                preset: preset_name.to_string(),
            })?;

        let output_path = challenge.output_path(&config.output_file());
        let invocation = self.build_invocation(&config, preset, challenge, &output_path)?;
        let command_line = invocation.command_line();

        log_action(
            challenge,
            &format!("Running tool '{tool}' with preset '{preset_name}': {command_line}"),
            &[],
        );
        tracing::info!(tool, preset = preset_name, command = %command_line, "running tool");

        let outcome = self
            .launcher
            .launch(&invocation)
            .map_err(|err| launch_error(tool, err))?;
        check_outcome(tool, &invocation, &outcome)?;

        log_action(
            challenge,
            &format!(
                "Tool '{tool}' completed successfully. Output saved to {}.",
                output_path.display()
            ),
            &[],
        );
        tracing::info!(tool, duration_ms = outcome.duration_ms as u64, "tool completed");
        Ok(output_path)
    }

    fn build_invocation(
        &self,
        config: &ToolConfig,
        preset: &Preset,
        challenge: &ChallengeContext,
        output_path: &std::path::Path,
    ) -> KitResult<Invocation> {
        let template_args =
            shell_words::split(&preset.command).map_err(|err| KitError::InvalidCommandTemplate {
                tool: config.tool_name.clone(),
                preset: preset.name.clone(),
                message: err.to_string(),
            })?;

        let target = if preset.command.contains(IP_PLACEHOLDER) {
            Some(resolve_target(config, preset, challenge)?)
        } else {
            None
        };
        let challenge_name = challenge.name();
        let mut args: Vec<String> = template_args
            .into_iter()
            .map(|arg| {
                let arg = match target.as_deref() {
                    Some(ip) => arg.replace(IP_PLACEHOLDER, ip),
                    None => arg,
                };
                arg.replace(CHALLENGE_PLACEHOLDER, &challenge_name)
            })
            .collect();

        let output = output_path.to_str().ok_or_else(|| {
            KitError::Unexpected(format!(
                "output path {} is not valid UTF-8",
                output_path.display()
            ))
        })?;
        args.push(config.output_flag().to_string());
        args.push(output.to_string());

        let timeout = config
            .timeout_seconds
            .filter(|value| *value > 0)
            .or(self.default_timeout_seconds)
            .map(Duration::from_secs);

        Ok(Invocation {
            program: config.tool_name.clone(),
            args,
            cwd: challenge.path().to_path_buf(),
            timeout,
        })
    }
}

impl<L: ProcessLauncher> TaskExecutor for ToolRunner<L> {
    fn execute(&self, tool: &str, preset: &str, challenge: &ChallengeContext) -> KitResult<()> {
        self.run(tool, preset, challenge).map(|_| ())
    }
}

fn resolve_target(
    config: &ToolConfig,
    preset: &Preset,
    challenge: &ChallengeContext,
) -> KitResult<String> {
    let missing = || KitError::MissingTarget {
        tool: config.tool_name.clone(),
        preset: preset.name.clone(),
    };
    let metadata = match load_metadata(challenge) {
        Ok(metadata) => metadata,
        Err(KitError::MetadataNotFound { .. }) => return Err(missing()),
        Err(err) => return Err(err),
    };
    metadata.target().map(str::to_string).ok_or_else(missing)
}

fn launch_error(tool: &str, err: io::Error) -> KitError {
    if err.kind() == io::ErrorKind::NotFound {
        KitError::ToolNotInstalled {
            tool: tool.to_string(),
        }
    } else {
        KitError::Unexpected(format!("launch {tool}: {err}"))
    }
}

fn check_outcome(tool: &str, invocation: &Invocation, outcome: &ProcessOutcome) -> KitResult<()> {
    if outcome.timed_out {
        let seconds = invocation.timeout.map(|t| t.as_secs()).unwrap_or_default();
        return Err(KitError::ToolTimeout {
            tool: tool.to_string(),
            seconds,
        });
    }
    if outcome.success() {
        return Ok(());
    }
    let status = match outcome.exit_code {
        Some(code) => format!("command '{}' returned non-zero exit status {code}", invocation.command_line()),
        None => format!("command '{}' was terminated by signal", invocation.command_line()),
    };
    let message = if outcome.stderr.is_empty() {
        status
    } else {
        format!("{status}: {}", outcome.stderr)
    };
    Err(KitError::ToolExecution {
        tool: tool.to_string(),
        message,
    })
}

/// Whether a configured tool can be found on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ToolStatus {
    pub tool: String,
    pub path: Option<PathBuf>,
    /// `None` when the config file could not be parsed.
    pub presets: Option<usize>,
}

impl ToolStatus {
    pub fn installed(&self) -> bool {
        self.path.is_some()
    }
}

/// Report every configured tool and where it resolves on `PATH`. Never installs.
pub fn check_tools(store: &ConfigStore) -> KitResult<Vec<ToolStatus>> {
    let mut statuses = Vec::new();
    for tool in store.list_tools()? {
        let presets = match store.load_tool(&tool) {
            Ok(config) => Some(config.presets.len()),
            Err(err) => {
                tracing::warn!(tool = %tool, error = %err, "unreadable tool config");
                None
            }
        };
        statuses.push(ToolStatus {
            path: which::which(&tool).ok(),
            tool,
            presets,
        });
    }
    Ok(statuses)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
