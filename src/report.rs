//! Markdown report for a challenge: metadata, audit log, and tool outputs.
use crate::challenge_log::{parse_line, read_log};
use crate::error::{KitError, KitResult};
use crate::metadata::{load_metadata, ChallengeMetadata};
use crate::paths::ChallengeContext;
use crate::util::write_atomic;
use std::fs;
use std::path::{Path, PathBuf};

const OUTPUT_EXTENSION: &str = "txt";

/// Render and write `<challenge>/report.md`, returning its path.
pub fn generate_report(challenge: &ChallengeContext) -> KitResult<PathBuf> {
    if !challenge.path().is_dir() {
        return Err(KitError::ChallengeNotFound {
            path: challenge.path().to_path_buf(),
        });
    }
    let metadata = load_metadata(challenge)?;
    let log = match read_log(challenge) {
        Ok(log) => log,
        Err(KitError::LogNotFound { .. }) => String::new(),
        Err(err) => return Err(err),
    };
    let mut outputs = Vec::new();
    for path in output_files(challenge.path())? {
        let bytes = fs::read(&path).map_err(|err| KitError::io("read tool output", &path, err))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        outputs.push((name, String::from_utf8_lossy(&bytes).to_string()));
    }

    let generated_on = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let text = render_report(&metadata, &generated_on, &log, &outputs);
    let report_path = challenge.report_path();
    write_atomic(&report_path, text.as_bytes())?;
    tracing::info!(path = %report_path.display(), outputs = outputs.len(), "report written");
    Ok(report_path)
}

fn output_files(dir: &Path) -> KitResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| KitError::io("read challenge dir", dir, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| KitError::io("read challenge dir", dir, err))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(OUTPUT_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn render_report(
    metadata: &ChallengeMetadata,
    generated_on: &str,
    log: &str,
    outputs: &[(String, String)],
) -> String {
    let mut out = String::new();
    push_line(&mut out, &format!("# Report for Challenge: {}", metadata.name));
    push_line(&mut out, "");
    push_line(
        &mut out,
        &format!("**IP Address:** {}  ", metadata.target().unwrap_or("unknown")),
    );
    push_line(&mut out, &format!("**Generated on:** {generated_on}  "));
    if let Some(started) = &metadata.start_timestamp {
        push_line(&mut out, &format!("**Started:** {started}  "));
    }
    push_line(
        &mut out,
        &format!(
            "**Finished:** {}  ",
            metadata.end_timestamp.as_deref().unwrap_or("in progress")
        ),
    );
    let entries = log.lines().filter_map(parse_line).count();
    push_line(&mut out, &format!("**Log entries:** {entries}"));
    push_line(&mut out, "");

    push_line(&mut out, "## Flags");
    push_line(&mut out, "");
    if metadata.flags_found.is_empty() {
        push_line(&mut out, "_No flags recorded._");
    } else {
        push_line(&mut out, "| # | Flag | Captured |");
        push_line(&mut out, "|---|------|----------|");
        for (idx, flag) in metadata.flags_found.iter().enumerate() {
            push_line(
                &mut out,
                &format!(
                    "| {} | `{}` | {} |",
                    idx + 1,
                    flag.flag.replace('|', "\\|"),
                    flag.timestamp
                ),
            );
        }
    }
    push_line(&mut out, "");

    push_line(&mut out, "## Attack Vectors");
    push_line(&mut out, "");
    if metadata.attack_vectors.is_empty() {
        push_line(&mut out, "_No attack vectors recorded._");
    } else {
        for vector in &metadata.attack_vectors {
            let mut line = format!("- **{}**", vector.service);
            if !vector.version.trim().is_empty() {
                line.push_str(&format!(" ({})", vector.version.trim()));
            }
            if !vector.vectors.is_empty() {
                line.push_str(&format!(": {}", vector.vectors.join(", ")));
            }
            push_line(&mut out, &line);
        }
    }
    push_line(&mut out, "");

    push_line(&mut out, "## Logs");
    push_line(&mut out, "");
    if log.trim().is_empty() {
        push_line(&mut out, "_No log entries available._");
    } else {
        push_fenced(&mut out, log);
    }
    push_line(&mut out, "");

    push_line(&mut out, "## Tool Outputs");
    push_line(&mut out, "");
    if outputs.is_empty() {
        push_line(&mut out, "_No tool outputs found._");
    }
    for (name, content) in outputs {
        push_line(&mut out, &format!("### {name}"));
        push_line(&mut out, "");
        push_fenced(&mut out, content);
        push_line(&mut out, "");
    }
    out
}

/// Fence `body` with a backtick run longer than any run inside it.
fn push_fenced(out: &mut String, body: &str) {
    let longest = body
        .split(|ch| ch != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    push_line(out, &fence);
    push_line(out, body.trim_end_matches('\n'));
    push_line(out, &fence);
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
