use anyhow::Result;
use clap::Parser;
use std::io;
use tracing_subscriber::EnvFilter;

mod challenge;
mod challenge_log;
mod cli;
mod config;
mod error;
mod menu;
mod metadata;
mod paths;
mod report;
mod runner;
mod scenario;
#[cfg(test)]
mod testutil;
mod util;
mod validate;
mod vpn;
mod workflow;

use cli::{Command, RootArgs};
use metadata::AttackVector;
use workflow::KitContext;

/// Environment variable holding the diagnostics filter, e.g. `htbkit=debug`.
const LOG_ENV: &str = "HTBKIT_LOG";

fn main() {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    if let Err(err) = run(args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(args: RootArgs) -> Result<()> {
    let ctx = KitContext::load(args.root.as_deref())?;
    let mut out = io::stdout().lock();
    match args.command.unwrap_or(Command::Menu) {
        Command::Setup(args) => workflow::run_setup(&ctx, &args.name, &args.ip, &mut out),
        Command::Vpn(args) => workflow::run_vpn(&ctx, &args.challenge, args.wait, &mut out),
        Command::Tool(args) => {
            workflow::run_tool(&ctx, &args.tool, &args.preset, &args.challenge, &mut out)
        }
        Command::Presets(args) => workflow::run_presets(&ctx, args.tool.as_deref(), &mut out),
        Command::Scenarios(args) => workflow::run_scenarios(&ctx, args.json, &mut out),
        Command::Scenario(args) => {
            workflow::run_scenario(&ctx, &args.scenario, &args.challenge, args.json, &mut out)
        }
        Command::Validate(args) => workflow::run_validate(&ctx, args.json, &mut out),
        Command::Report(args) => workflow::run_report(&ctx, &args.challenge, &mut out),
        Command::Flag(args) => workflow::run_flag(&ctx, &args.challenge, &args.flag, &mut out),
        Command::Vector(args) => {
            let vector = AttackVector {
                service: args.service,
                version: args.service_version,
                vectors: args.vectors,
            };
            workflow::run_vector(&ctx, &args.challenge, vector, &mut out)
        }
        Command::Finish(args) => workflow::run_finish(&ctx, &args.challenge, &mut out),
        Command::Log(args) => workflow::run_log(&ctx, &args.challenge, args.clear, &mut out),
        Command::Tools(args) => workflow::run_tools(&ctx, args.json, &mut out),
        Command::Menu => menu::Menu::new(&ctx, io::stdin().lock(), &mut out).run(),
    }
}
