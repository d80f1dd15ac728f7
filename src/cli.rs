//! CLI argument parsing.
//!
//! Every menu action is also a one-shot subcommand; running with no
//! subcommand opens the interactive menu.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "htbkit",
    version,
    about = "Challenge workspaces, tool presets, and recon scenarios for lab machines",
    after_help = "Examples:\n  htbkit setup lame --ip 10.10.10.3\n  htbkit presets nmap\n  htbkit tool nmap stealth --challenge lame\n  htbkit scenario recon --challenge lame\n  htbkit validate\n  htbkit report lame\n  htbkit            (interactive menu)"
)]
pub struct RootArgs {
    /// Workspace root holding config/ and scenarios/ (default: $HTBKIT_HOME or the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Emit debug diagnostics on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Setup(SetupArgs),
    Vpn(VpnArgs),
    Tool(ToolArgs),
    Presets(PresetsArgs),
    Scenarios(ScenariosArgs),
    Scenario(ScenarioArgs),
    Validate(ValidateArgs),
    /// Generate report.md for a challenge
    Report(ChallengeArgs),
    Flag(FlagArgs),
    Vector(VectorArgs),
    /// Record the challenge end time
    Finish(ChallengeArgs),
    Log(LogArgs),
    Tools(ToolsArgs),
    /// Open the interactive menu
    Menu,
}

/// Create a challenge directory with fresh metadata.
#[derive(Args, Debug)]
#[command(about = "Set up a new challenge")]
pub struct SetupArgs {
    /// Challenge name (capitalized for the directory name)
    pub name: String,

    /// Target IP address
    #[arg(long, default_value = "")]
    pub ip: String,
}

#[derive(Args, Debug)]
#[command(about = "Connect to the challenge VPN")]
pub struct VpnArgs {
    /// Challenge name
    pub challenge: String,

    /// Stay attached until the VPN client exits
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
#[command(about = "Run one tool preset against a challenge")]
pub struct ToolArgs {
    /// Tool name (config/<tool>.json)
    pub tool: String,

    /// Preset name within the tool config
    pub preset: String,

    /// Challenge name
    #[arg(long, short = 'c')]
    pub challenge: String,
}

#[derive(Args, Debug)]
#[command(about = "List configured tools, or one tool's presets")]
pub struct PresetsArgs {
    /// Tool to show presets for
    pub tool: Option<String>,
}

#[derive(Args, Debug)]
#[command(about = "List available scenarios")]
pub struct ScenariosArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(about = "Run a scenario against a challenge")]
pub struct ScenarioArgs {
    /// Scenario name (scenarios/<name>.json)
    pub scenario: String,

    /// Challenge name
    #[arg(long, short = 'c')]
    pub challenge: String,

    /// Emit the scenario result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(about = "Validate every scenario against the tool configs")]
pub struct ValidateArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ChallengeArgs {
    /// Challenge name
    pub challenge: String,
}

#[derive(Args, Debug)]
#[command(about = "Record a captured flag")]
pub struct FlagArgs {
    /// Challenge name
    pub challenge: String,

    /// Flag value
    pub flag: String,
}

#[derive(Args, Debug)]
#[command(about = "Record a service and its candidate attack vectors")]
pub struct VectorArgs {
    /// Challenge name
    pub challenge: String,

    /// Service name, e.g. smb
    pub service: String,

    /// Service version string
    #[arg(long = "service-version", value_name = "VERSION", default_value = "")]
    pub service_version: String,

    /// Candidate vector; repeat for several
    #[arg(long = "vector", value_name = "TEXT")]
    pub vectors: Vec<String>,
}

#[derive(Args, Debug)]
#[command(about = "Show or clear the challenge log")]
pub struct LogArgs {
    /// Challenge name
    pub challenge: String,

    /// Truncate the log instead of printing it
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
#[command(about = "Check which configured tools are on PATH")]
pub struct ToolsArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        RootArgs::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_menu() {
        let args = RootArgs::try_parse_from(["htbkit", "--root", "/srv/kit"]).expect("parse");
        assert!(args.command.is_none());
        assert_eq!(args.root, Some(PathBuf::from("/srv/kit")));
    }

    #[test]
    fn scenario_requires_challenge() {
        assert!(RootArgs::try_parse_from(["htbkit", "scenario", "recon"]).is_err());
        let args =
            RootArgs::try_parse_from(["htbkit", "scenario", "recon", "-c", "lame", "--verbose"])
                .expect("parse");
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Some(Command::Scenario(ScenarioArgs { ref scenario, .. })) if scenario == "recon"
        ));
    }
}
