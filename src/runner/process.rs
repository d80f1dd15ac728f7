//! Blocking child-process launcher.
use crate::util::tail_string;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const MAX_STDERR_BYTES: usize = 2048;
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A fully resolved argument vector for one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Shell-quoted command line, for logs.
    pub fn command_line(&self) -> String {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.as_str());
        argv.extend(self.args.iter().map(String::as_str));
        shell_words::join(argv)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Tail of stderr, trimmed.
    pub stderr: String,
    pub duration_ms: u128,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs an [`Invocation`] to completion.
///
/// `io::ErrorKind::NotFound` means the program could not be located; any
/// other error is a launcher failure.
pub trait ProcessLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<ProcessOutcome>;
}

/// Launches real processes with `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        let program = which::which(&invocation.program).map_err(|err| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: {err}", invocation.program),
            )
        })?;

        let start = Instant::now();
        let mut command = Command::new(program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own group, so a timeout reaches the tool's helpers too.
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        // Drain stderr while polling; a full pipe blocks the child.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(timeout) = invocation.timeout {
                if start.elapsed() > timeout {
                    timed_out = true;
                    kill_process_tree(&mut child);
                    break child.wait()?;
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        // After a kill the pipe may stay open in an escaped grandchild;
        // leave the reader detached rather than wait on it.
        let stderr_bytes = stderr_reader
            .filter(|_| !timed_out)
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr_bytes);

        Ok(ProcessOutcome {
            exit_code: status.code(),
            timed_out,
            stderr: tail_string(stderr.trim(), MAX_STDERR_BYTES).to_string(),
            duration_ms: start.elapsed().as_millis(),
        })
    }
}

#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group was created for this child.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Option<Duration>) -> Invocation {
        Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            cwd: std::env::temp_dir(),
            timeout,
        }
    }

    #[test]
    fn captures_exit_code_and_stderr() {
        let outcome = SystemLauncher
            .launch(&sh("echo boom >&2; exit 3", None))
            .expect("launch sh");
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stderr, "boom");
        assert!(!outcome.success());
    }

    #[test]
    fn kills_processes_that_exceed_the_timeout() {
        let outcome = SystemLauncher
            .launch(&sh("sleep 5", Some(Duration::from_millis(100))))
            .expect("launch sh");
        assert!(outcome.timed_out);
        assert!(!outcome.success());
        assert!(outcome.duration_ms < 5000);
    }

    #[test]
    fn timeout_also_stops_processes_the_tool_spawned() {
        let start = Instant::now();
        let outcome = SystemLauncher
            .launch(&sh("sleep 4; true", Some(Duration::from_millis(200))))
            .expect("launch sh");
        assert!(outcome.timed_out);
        assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());
    }

    #[test]
    fn missing_programs_are_not_found() {
        let invocation = Invocation {
            program: "htbkit-definitely-missing-tool".to_string(),
            args: Vec::new(),
            cwd: std::env::temp_dir(),
            timeout: None,
        };
        let err = SystemLauncher.launch(&invocation).expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn command_line_quotes_arguments() {
        let invocation = sh("echo hi", None);
        assert_eq!(invocation.command_line(), "sh -c 'echo hi'");
    }
}
