//! Media tool error types.

use std::path::PathBuf;

/// Errors from probing, cutting and decoding media with ffmpeg/ffprobe.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Input file does not exist.
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Tool could not be started.
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    /// Tool ran and exited with a failure status.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// Tool output could not be interpreted.
    #[error("Failed to parse {tool} output: {message}")]
    InvalidOutput { tool: String, message: String },

    /// Filesystem error around a tool run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn spawn(tool: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            tool: tool.into(),
            source,
        }
    }

    pub fn command_failed(tool: impl Into<String>, exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code: exit_code.unwrap_or(-1),
            message: message.into(),
        }
    }

    pub fn invalid_output(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;
