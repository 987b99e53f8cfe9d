//! `sdd-harness`: end-to-end test orchestration for agent-driven workflows.
//!
//! The harness runs the `claude` CLI unattended against isolated project
//! directories, watches its streamed output for tool and sub-agent activity,
//! and manages a disposable postgres container for scenarios that need SQL.
//!
//! # Architecture
//!
//! ```text
//!  TestProject          isolated working directory under the scratch root
//!      │
//!      ▼
//!  runner::run_agent    spawns `claude -p … --output-format stream-json`,
//!      │                merges stdout/stderr, mirrors chunks to a debug
//!      │                transcript, kills the process at the deadline
//!      ▼
//!  markers              anchored signatures over the combined output
//!      │
//!      ▼
//!  asserts              existence / content / ordering checks for tests
//! ```
//!
//! SQL-backed scenarios add [`PostgresContainer`]: pre-cleaned start, bounded
//! readiness polling, piped `psql` scripts, teardown that never double-faults.
//!
//! # Example
//!
//! ```rust,ignore
//! use sdd_harness::{asserts, run_agent, RunOptions, TestProject};
//!
//! let project = TestProject::create("snapshot-flow")?;
//! let result = run_agent(
//!     "Add a login spec and regenerate the snapshot",
//!     RunOptions {
//!         cwd: Some(project.path().to_path_buf()),
//!         ..Default::default()
//!     },
//! )
//! .await?;
//!
//! assert_eq!(result.exit_status, 0);
//! assert!(asserts::used_tool(&result, "Write"));
//! assert!(asserts::file_exists(&project, "specs/SNAPSHOT.md"));
//! project.cleanup()?;
//! ```

pub mod asserts;
pub mod error;
pub mod markers;
pub mod postgres;
pub mod runner;
pub mod scratch;

pub use error::{HarnessError, Result};
pub use markers::Marker;
pub use postgres::{engine_available, PostgresContainer, SqlOutput};
pub use runner::{run_agent, RunOptions, RunResult};
pub use scratch::{scratch_root, TestProject};
