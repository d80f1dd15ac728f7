//! Command handlers shared by the one-shot subcommands and the menu.
//!
//! Handlers print human-readable results to `out` and return errors for the
//! caller to report.
mod context;

pub(crate) use context::KitContext;

use crate::challenge::create_challenge;
use crate::challenge_log::{clear_log, log_action, read_log};
use crate::metadata::{add_attack_vector, mark_finished, record_flag, AttackVector};
use crate::report::generate_report;
use crate::runner::check_tools;
use crate::scenario::catalog::{list_scenarios, validate_scenarios};
use crate::scenario::engine::{ScenarioEngine, ScenarioResult, ScenarioSource, TaskStatus};
use crate::util::display_path;
use crate::vpn::connect_vpn;
use anyhow::{anyhow, Context, Result};
use std::io::Write;

pub fn run_setup(ctx: &KitContext, name: &str, ip: &str, out: &mut dyn Write) -> Result<()> {
    let created = create_challenge(&ctx.base, name, ip)?;
    let path = created.context.path().display();
    if created.created {
        writeln!(out, "Challenge '{}' created at {path}", created.metadata.name)?;
    } else {
        writeln!(
            out,
            "Challenge '{}' already exists at {path}; metadata kept",
            created.metadata.name
        )?;
    }
    Ok(())
}

pub fn run_vpn(ctx: &KitContext, challenge: &str, wait: bool, out: &mut dyn Write) -> Result<()> {
    let challenge = ctx.challenge(challenge)?;
    let session = connect_vpn(&challenge, ctx.base.vpn_command())?;
    writeln!(
        out,
        "VPN client started with {} (pid {}); output in {}",
        display_path(&session.config, Some(challenge.path())),
        session.pid(),
        session.output_log.display()
    )?;
    if wait {
        let status = session.wait()?;
        writeln!(out, "VPN client exited: {status}")?;
    }
    Ok(())
}

pub fn run_tool(
    ctx: &KitContext,
    tool: &str,
    preset: &str,
    challenge: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let challenge = ctx.challenge_dir(challenge)?;
    let output = ctx.runner().run(tool, preset, &challenge)?;
    writeln!(out, "Tool '{tool}' completed. Output saved to {}", output.display())?;
    Ok(())
}

pub fn run_presets(ctx: &KitContext, tool: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let Some(tool) = tool else {
        let tools = ctx.store.list_tools()?;
        if tools.is_empty() {
            writeln!(out, "No tool configs in {}", ctx.paths.config_dir().display())?;
        }
        for tool in tools {
            writeln!(out, "{tool}")?;
        }
        return Ok(());
    };
    let config = ctx.store.load_tool(tool)?;
    if config.presets.is_empty() {
        writeln!(out, "Tool '{tool}' has no presets.")?;
    }
    for (idx, preset) in config.presets.iter().enumerate() {
        if preset.description.trim().is_empty() {
            writeln!(out, "{}. {}", idx + 1, preset.name)?;
        } else {
            writeln!(out, "{}. {} - {}", idx + 1, preset.name, preset.description)?;
        }
    }
    Ok(())
}

pub fn run_scenarios(ctx: &KitContext, json: bool, out: &mut dyn Write) -> Result<()> {
    let summaries = list_scenarios(&ctx.paths)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&summaries)?)?;
        return Ok(());
    }
    if summaries.is_empty() {
        writeln!(out, "No scenarios available.")?;
    }
    for (idx, summary) in summaries.iter().enumerate() {
        writeln!(
            out,
            "{}. {} - {} [{}]",
            idx + 1,
            summary.name,
            summary.description,
            summary.id
        )?;
    }
    Ok(())
}

pub fn run_scenario(
    ctx: &KitContext,
    scenario: &str,
    challenge: &str,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let challenge = ctx.challenge_dir(challenge)?;
    let runner = ctx.runner();
    let engine = ScenarioEngine::new(&ctx.paths, &runner);
    let result = engine
        .run(ScenarioSource::Named(scenario.to_string()), &challenge)
        .with_context(|| format!("run scenario '{scenario}'"))?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        print_scenario_result(&result, out)?;
    }
    Ok(())
}

pub(crate) fn print_scenario_result(result: &ScenarioResult, out: &mut dyn Write) -> Result<()> {
    for outcome in &result.outcomes {
        match (outcome.status, outcome.error_detail.as_deref()) {
            (TaskStatus::Success, _) => writeln!(out, "  [ok]     {}", outcome.task_name)?,
            (TaskStatus::Failed, detail) => writeln!(
                out,
                "  [failed] {}: {}",
                outcome.task_name,
                detail.unwrap_or("unknown error")
            )?,
        }
    }
    writeln!(
        out,
        "Scenario '{}' completed: {} succeeded, {} failed.",
        result.scenario_name,
        result.success_count(),
        result.failure_count()
    )?;
    Ok(())
}

/// Prints per-file findings; fails when any scenario has problems.
pub fn run_validate(ctx: &KitContext, json: bool, out: &mut dyn Write) -> Result<()> {
    let report = validate_scenarios(&ctx.paths, &ctx.store)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else if report.is_empty() {
        writeln!(out, "No scenario files found.")?;
    } else {
        for entry in &report {
            if entry.is_clean() {
                writeln!(out, "{}: OK", entry.file)?;
                continue;
            }
            writeln!(out, "{}:", entry.file)?;
            for issue in &entry.issues {
                writeln!(out, "  - {issue}")?;
            }
        }
    }
    let failing = report.iter().filter(|entry| !entry.is_clean()).count();
    if failing > 0 {
        return Err(anyhow!("{failing} scenario file(s) have problems"));
    }
    Ok(())
}

pub fn run_report(ctx: &KitContext, challenge: &str, out: &mut dyn Write) -> Result<()> {
    let challenge = ctx.challenge(challenge)?;
    let path = generate_report(&challenge)?;
    writeln!(out, "Report generated successfully: {}", path.display())?;
    Ok(())
}

pub fn run_flag(ctx: &KitContext, challenge: &str, flag: &str, out: &mut dyn Write) -> Result<()> {
    if flag.trim().is_empty() {
        return Err(anyhow!("flag must not be empty"));
    }
    let challenge = ctx.challenge(challenge)?;
    let metadata = record_flag(&challenge, flag)?;
    log_action(&challenge, "Flag recorded.", &[]);
    writeln!(
        out,
        "Flag recorded for '{}' ({} total)",
        metadata.name,
        metadata.flags_found.len()
    )?;
    Ok(())
}

pub fn run_vector(
    ctx: &KitContext,
    challenge: &str,
    vector: AttackVector,
    out: &mut dyn Write,
) -> Result<()> {
    let challenge = ctx.challenge(challenge)?;
    let metadata = add_attack_vector(&challenge, &vector)?;
    writeln!(
        out,
        "Attack vector for '{}' recorded ({} total)",
        vector.service,
        metadata.attack_vectors.len()
    )?;
    Ok(())
}

pub fn run_finish(ctx: &KitContext, challenge: &str, out: &mut dyn Write) -> Result<()> {
    let challenge = ctx.challenge(challenge)?;
    let metadata = mark_finished(&challenge)?;
    log_action(&challenge, "Challenge finished.", &[]);
    writeln!(
        out,
        "Challenge '{}' finished at {}",
        metadata.name,
        metadata.end_timestamp.as_deref().unwrap_or("now")
    )?;
    Ok(())
}

pub fn run_log(ctx: &KitContext, challenge: &str, clear: bool, out: &mut dyn Write) -> Result<()> {
    let challenge = ctx.challenge_dir(challenge)?;
    if clear {
        if clear_log(&challenge)? {
            writeln!(out, "Log cleared.")?;
        } else {
            writeln!(out, "No log to clear.")?;
        }
        return Ok(());
    }
    let log = read_log(&challenge)?;
    write!(out, "{log}")?;
    Ok(())
}

pub fn run_tools(ctx: &KitContext, json: bool, out: &mut dyn Write) -> Result<()> {
    let statuses = check_tools(&ctx.store)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&statuses)?)?;
        return Ok(());
    }
    for status in &statuses {
        let presets = status
            .presets
            .map(|count| format!("{count} presets"))
            .unwrap_or_else(|| "unreadable config".to_string());
        match &status.path {
            Some(path) => writeln!(out, "{}: {} ({presets})", status.tool, path.display())?,
            None => writeln!(out, "{}: not found on PATH ({presets})", status.tool)?,
        }
    }
    Ok(())
}
