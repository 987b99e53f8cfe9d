//! Error types for the harness.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The agent executable could not be started at all. Distinct from a
    /// process that started and exited non-zero, which is a normal
    /// [`RunResult`](crate::runner::RunResult).
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The run hit its wall-clock deadline and the process was killed.
    /// The partial transcript is still on disk for diagnosis.
    #[error("agent run exceeded {limit_secs}s deadline (partial transcript: {})", .transcript.display())]
    Timeout {
        limit_secs: u64,
        transcript: PathBuf,
    },

    /// A cleanup was asked to delete a path outside the scratch root.
    #[error("refusing to remove '{}': outside scratch root '{}'", .path.display(), .root.display())]
    OutsideScratch { path: PathBuf, root: PathBuf },

    /// A project name that would escape its directory or not survive as a
    /// path component.
    #[error("invalid project name '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidProjectName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarnessError>;
