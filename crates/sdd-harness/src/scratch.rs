//! Scratch-root resolution and isolated per-test project directories.
//!
//! Everything the harness writes (project directories, run transcripts) lives
//! under a single scratch root so cleanup can be audited in one place and a
//! botched path can never reach outside it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{HarnessError, Result};

/// Environment variable overriding the scratch root.
pub const SCRATCH_ENV: &str = "SDD_SCRATCH_DIR";

const SCRATCH_DIR_NAME: &str = "sdd-tests";

static SEQ: AtomicU64 = AtomicU64::new(0);

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

/// Resolve the scratch root: `SDD_SCRATCH_DIR` when set and non-empty,
/// otherwise a fixed directory under the system temp dir.
pub fn scratch_root() -> PathBuf {
    match std::env::var_os(SCRATCH_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join(SCRATCH_DIR_NAME),
    }
}

/// Millisecond timestamp plus a per-process sequence number. Two calls in the
/// same process never collide, even within the same millisecond.
pub(crate) fn unique_stamp() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

/// Path for the debug transcript of a single agent run.
pub(crate) fn transcript_path(scratch: &Path) -> PathBuf {
    scratch.join(format!("output-{}.json", unique_stamp()))
}

/// An isolated working directory for one test, created under the scratch
/// root with a unique suffix so repeated runs never collide.
#[derive(Debug)]
pub struct TestProject {
    name: String,
    path: PathBuf,
    scratch: PathBuf,
}

impl TestProject {
    /// Create a fresh project directory under the default scratch root.
    pub fn create(name: &str) -> Result<Self> {
        Self::create_in(&scratch_root(), name)
    }

    /// Create a fresh project directory under an explicit scratch root.
    pub fn create_in(scratch: &Path, name: &str) -> Result<Self> {
        if !name_re().is_match(name) {
            return Err(HarnessError::InvalidProjectName(name.to_string()));
        }
        let path = scratch.join(format!("{name}-{}", unique_stamp()));
        std::fs::create_dir_all(&path)?;
        tracing::debug!(path = %path.display(), "created test project");
        Ok(Self {
            name: name.to_string(),
            path,
            scratch: scratch.to_path_buf(),
        })
    }

    /// Human-readable label the directory was derived from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute-or-relative path of the project directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the project.
    pub fn file_path(&self, rel: &str) -> PathBuf {
        self.path.join(rel)
    }

    /// Remove the project directory and everything under it.
    ///
    /// Refuses to touch anything that does not resolve strictly inside the
    /// scratch root the project was created under. Cleanup is advisory:
    /// callers may skip it to inspect a failed run.
    pub fn cleanup(&self) -> Result<()> {
        let path = self.path.canonicalize()?;
        let root = self.scratch.canonicalize()?;
        if path == root || !path.starts_with(&root) {
            return Err(HarnessError::OutsideScratch { path, root });
        }
        std::fs::remove_dir_all(&path)?;
        tracing::debug!(path = %path.display(), "removed test project");
        Ok(())
    }
}
