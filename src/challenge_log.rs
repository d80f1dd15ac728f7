//! Append-only audit log for a challenge directory.
//!
//! Each event is one line: `[YYYY-MM-DD HH:MM:SS] [key: value]* message`.
//! The file is opened, appended, and closed per write; it is only truncated
//! by an explicit [`clear_log`].
use crate::error::{KitError, KitResult};
use crate::paths::ChallengeContext;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::OnceLock;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append one timestamped line. Write failures are reported via tracing and
/// never abort the caller.
pub fn log_action(challenge: &ChallengeContext, message: &str, context: &[(&str, &str)]) {
    if let Err(err) = append_line(challenge, message, context) {
        tracing::warn!(
            path = %challenge.log_path().display(),
            error = %err,
            "failed to write challenge log"
        );
    }
}

fn append_line(
    challenge: &ChallengeContext,
    message: &str,
    context: &[(&str, &str)],
) -> KitResult<()> {
    fs::create_dir_all(challenge.path())
        .map_err(|err| KitError::io("create challenge dir", challenge.path(), err))?;
    let line = format_line(&chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(), message, context);
    let path = challenge.log_path();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| KitError::io("open log", &path, err))?;
    file.write_all(line.as_bytes())
        .map_err(|err| KitError::io("append log", &path, err))?;
    Ok(())
}

fn format_line(timestamp: &str, message: &str, context: &[(&str, &str)]) -> String {
    let mut line = format!("[{timestamp}]");
    for (key, value) in context {
        line.push_str(&format!(" [{key}: {value}]"));
    }
    line.push(' ');
    // One event per line; embedded newlines would break line-based readers.
    line.push_str(&message.replace('\n', " "));
    line.push('\n');
    line
}

/// Read the whole log, failing with `LogNotFound` when it does not exist.
pub fn read_log(challenge: &ChallengeContext) -> KitResult<String> {
    let path = challenge.log_path();
    if !path.is_file() {
        return Err(KitError::LogNotFound {
            path: challenge.path().to_path_buf(),
        });
    }
    fs::read_to_string(&path).map_err(|err| KitError::io("read log", path, err))
}

/// Truncate the log. Returns `false` when there was no log to clear.
pub fn clear_log(challenge: &ChallengeContext) -> KitResult<bool> {
    let path = challenge.log_path();
    if !path.is_file() {
        return Ok(false);
    }
    fs::write(&path, b"").map_err(|err| KitError::io("clear log", path, err))?;
    Ok(true)
}

/// A parsed log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub context: Vec<(String, String)>,
    pub message: String,
}

fn line_regex() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\] (.*)$").expect("valid log regex")
    })
}

fn context_regex() -> &'static Regex {
    static CONTEXT: OnceLock<Regex> = OnceLock::new();
    CONTEXT.get_or_init(|| Regex::new(r"^\[([^:\]]+): ([^\]]*)\] ").expect("valid context regex"))
}

/// Parse one line; returns `None` when the timestamp prefix is malformed.
pub fn parse_line(line: &str) -> Option<LogEntry> {
    let caps = line_regex().captures(line)?;
    let timestamp = caps.get(1)?.as_str().to_string();
    let mut rest = caps.get(2)?.as_str();
    let mut context = Vec::new();
    while let Some(ctx) = context_regex().captures(rest) {
        let whole = ctx.get(0)?;
        context.push((ctx[1].to_string(), ctx[2].to_string()));
        rest = &rest[whole.end()..];
    }
    Some(LogEntry {
        timestamp,
        context,
        message: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge() -> (tempfile::TempDir, ChallengeContext) {
        let root = tempfile::tempdir().expect("temp dir");
        let ctx = ChallengeContext::new(root.path().join("Lame"));
        (root, ctx)
    }

    #[test]
    fn appends_timestamped_lines_with_context() {
        let (_root, ctx) = challenge();
        log_action(&ctx, "first", &[]);
        log_action(&ctx, "second", &[("tool", "nmap"), ("preset", "stealth")]);

        let text = read_log(&ctx).expect("read log");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first = parse_line(lines[0]).expect("parse first");
        assert_eq!(first.message, "first");
        assert!(first.context.is_empty());

        let second = parse_line(lines[1]).expect("parse second");
        assert_eq!(second.message, "second");
        assert_eq!(
            second.context,
            vec![
                ("tool".to_string(), "nmap".to_string()),
                ("preset".to_string(), "stealth".to_string())
            ]
        );
    }

    #[test]
    fn read_missing_log_is_a_resource_error() {
        let (_root, ctx) = challenge();
        let err = read_log(&ctx).expect_err("no log yet");
        assert!(matches!(err, KitError::LogNotFound { .. }));
    }

    #[test]
    fn clear_truncates_only_when_present() {
        let (_root, ctx) = challenge();
        assert!(!clear_log(&ctx).expect("clear missing"));
        log_action(&ctx, "entry", &[]);
        assert!(clear_log(&ctx).expect("clear present"));
        assert_eq!(read_log(&ctx).expect("read cleared"), "");
    }

    #[test]
    fn multiline_messages_stay_on_one_line() {
        assert_eq!(
            format_line("2024-12-10 11:35:42", "a\nb", &[]),
            "[2024-12-10 11:35:42] a b\n"
        );
        assert!(parse_line("no timestamp here").is_none());
    }
}
