//! Running external tools.

use std::process::{Command, Output};

use super::error::{MediaError, MediaResult};

/// Run a command to completion and fail on a non-zero exit status.
pub(crate) fn run_checked(cmd: &mut Command, tool: &str) -> MediaResult<Output> {
    tracing::debug!("Running {}: {:?}", tool, cmd);

    let output = cmd.output().map_err(|e| MediaError::spawn(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::command_failed(
            tool,
            output.status.code(),
            last_lines(&stderr, 5),
        ));
    }

    Ok(output)
}

/// Run a command to completion, returning its output whatever the status.
pub(crate) fn run_unchecked(cmd: &mut Command, tool: &str) -> MediaResult<Output> {
    tracing::debug!("Running {}: {:?}", tool, cmd);
    cmd.output().map_err(|e| MediaError::spawn(tool, e))
}

/// Last `count` non-empty lines of tool diagnostics.
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
