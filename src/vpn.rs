//! OpenVPN launcher for a challenge's `.ovpn` profile.
use crate::challenge_log::log_action;
use crate::error::{KitError, KitResult};
use crate::paths::ChallengeContext;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

const VPN_LOG_FILE: &str = "openvpn.log";

/// A running VPN client. Dropping it leaves the process running.
#[derive(Debug)]
pub struct VpnSession {
    pub config: PathBuf,
    pub output_log: PathBuf,
    child: Child,
}

impl VpnSession {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Block until the client exits.
    pub fn wait(mut self) -> KitResult<ExitStatus> {
        self.child.wait().map_err(|err| KitError::VpnConnection {
            message: format!("waiting for VPN client: {err}"),
        })
    }
}

/// Pick the profile: `<Name>.ovpn` if present, else the first `*.ovpn` by name.
pub fn find_ovpn(challenge: &ChallengeContext) -> KitResult<PathBuf> {
    let preferred = challenge.path().join(format!("{}.ovpn", challenge.name()));
    if preferred.is_file() {
        return Ok(preferred);
    }
    let entries = fs::read_dir(challenge.path())
        .map_err(|err| KitError::io("read challenge dir", challenge.path(), err))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| KitError::io("read challenge dir", challenge.path(), err))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("ovpn") {
            candidates.push(path);
        }
    }
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| KitError::NoVpnFiles {
            path: challenge.path().to_path_buf(),
        })
}

/// Start the VPN client without waiting for it. `command` is split like a
/// shell command line and the profile path is appended as the last argument.
/// Client output goes to `openvpn.log` in the challenge directory.
pub fn connect_vpn(challenge: &ChallengeContext, command: &str) -> KitResult<VpnSession> {
    if !challenge.path().is_dir() {
        return Err(KitError::ChallengeNotFound {
            path: challenge.path().to_path_buf(),
        });
    }
    let config = find_ovpn(challenge)?;
    let argv = shell_words::split(command).map_err(|err| KitError::VpnConnection {
        message: format!("invalid VPN command {command:?}: {err}"),
    })?;
    let Some((program, args)) = argv.split_first() else {
        return Err(KitError::VpnConnection {
            message: "VPN command is empty".to_string(),
        });
    };

    log_action(
        challenge,
        &format!(
            "Attempting to connect to VPN for challenge '{}'.",
            challenge.name()
        ),
        &[("config", &file_label(&config))],
    );

    let output_log = challenge.path().join(VPN_LOG_FILE);
    let child = spawn_client(program, args, &config, &output_log).map_err(|err| {
        let message = format!("failed to start '{program}': {err}");
        log_action(challenge, &format!("VPN connection failed: {message}"), &[]);
        KitError::VpnConnection { message }
    })?;

    let pid = child.id().to_string();
    log_action(challenge, "VPN client started.", &[("pid", &pid)]);
    tracing::info!(pid = %pid, config = %config.display(), "vpn client started");
    Ok(VpnSession {
        config,
        output_log,
        child,
    })
}

fn spawn_client(
    program: &str,
    args: &[String],
    config: &Path,
    output_log: &Path,
) -> std::io::Result<Child> {
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_log)?;
    let stderr = stdout.try_clone()?;
    Command::new(program)
        .args(args)
        .arg(config)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge_log::read_log;
    use crate::testutil::{write_file, Workspace};

    #[test]
    fn prefers_profile_named_after_challenge() {
        let ws = Workspace::new();
        write_file(&ws.challenge.path().join("a-lab.ovpn"), "client");
        write_file(&ws.challenge.path().join("Lame.ovpn"), "client");
        assert_eq!(
            find_ovpn(&ws.challenge).expect("profile"),
            ws.challenge.path().join("Lame.ovpn")
        );
    }

    #[test]
    fn falls_back_to_first_profile_by_name() {
        let ws = Workspace::new();
        write_file(&ws.challenge.path().join("z.ovpn"), "client");
        write_file(&ws.challenge.path().join("b.ovpn"), "client");
        write_file(&ws.challenge.path().join("a.txt"), "not a profile");
        assert_eq!(
            find_ovpn(&ws.challenge).expect("profile"),
            ws.challenge.path().join("b.ovpn")
        );
    }

    #[test]
    fn missing_profile_is_a_resource_error() {
        let ws = Workspace::new();
        let err = connect_vpn(&ws.challenge, "true").expect_err("no profile");
        assert!(matches!(err, KitError::NoVpnFiles { .. }));
        assert!(ws.log_lines().is_empty());
    }

    #[test]
    fn spawn_failure_is_logged() {
        let ws = Workspace::new();
        write_file(&ws.challenge.path().join("Lame.ovpn"), "client");
        let err = connect_vpn(&ws.challenge, "htbkit-no-such-openvpn --config")
            .expect_err("spawn failure");
        assert!(matches!(err, KitError::VpnConnection { .. }));
        let log = read_log(&ws.challenge).expect("log");
        assert!(log.contains("Attempting to connect to VPN for challenge 'Lame'."));
        assert!(log.contains("VPN connection failed"));
    }

    #[cfg(unix)]
    #[test]
    fn launches_client_with_profile_argument() {
        let ws = Workspace::new();
        write_file(&ws.challenge.path().join("Lame.ovpn"), "client");

        let session = connect_vpn(&ws.challenge, "echo --config").expect("spawn");
        assert!(session.pid() > 0);
        let output_log = session.output_log.clone();
        let status = session.wait().expect("wait");
        assert!(status.success());

        let output = fs::read_to_string(output_log).expect("client output");
        assert!(output.trim_end().ends_with("Lame.ovpn"));
        assert!(output.starts_with("--config "));
        assert!(ws.log_lines()[1].contains("VPN client started."));
    }
}
