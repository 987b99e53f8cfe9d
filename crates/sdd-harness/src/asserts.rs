//! Assertion helpers shared by scenario test bodies.
//!
//! Filesystem checks answer "did the agent leave the project in the expected
//! state", marker checks answer "did it get there the expected way".

use std::path::Path;

use crate::error::Result;
use crate::markers::{self, Marker};
use crate::runner::RunResult;
use crate::scratch::TestProject;

/// Whether `rel` exists under the project directory.
pub fn file_exists(project: &TestProject, rel: &str) -> bool {
    project.file_path(rel).exists()
}

/// Read a project file to a string.
pub fn read_file(project: &TestProject, rel: &str) -> Result<String> {
    Ok(std::fs::read_to_string(project.file_path(rel))?)
}

/// Whether `rel` exists and contains `needle`. A missing or unreadable file
/// is false, not an error; scenario tests assert on the boolean.
pub fn file_contains(project: &TestProject, rel: &str, needle: &str) -> bool {
    path_contains(&project.file_path(rel), needle)
}

fn path_contains(path: &Path, needle: &str) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains(needle))
        .unwrap_or(false)
}

/// Whether the run invoked the named tool at least once.
pub fn used_tool(result: &RunResult, tool: &str) -> bool {
    markers::occurs(&result.output, Marker::Tool(tool))
}

/// Whether the run delegated to the named sub-agent at least once.
pub fn delegated_to(result: &RunResult, agent: &str) -> bool {
    markers::occurs(&result.output, Marker::Subagent(agent))
}

/// Whether the first invocation of `first` came strictly before the first
/// invocation of `second`. False when either tool never ran.
pub fn used_tool_before(result: &RunResult, first: &str, second: &str) -> bool {
    markers::occurs_before(&result.output, Marker::Tool(first), Marker::Tool(second))
}

/// Whether delegation to `first` came strictly before delegation to
/// `second`. False when either delegation never happened.
pub fn delegated_before(result: &RunResult, first: &str, second: &str) -> bool {
    markers::occurs_before(
        &result.output,
        Marker::Subagent(first),
        Marker::Subagent(second),
    )
}
