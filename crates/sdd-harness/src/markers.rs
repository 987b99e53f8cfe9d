//! Detection of tool and sub-agent activity in the agent's streamed output.
//!
//! The stream-json transcript is newline-delimited JSON. Rather than parse
//! every line, assertions match anchored substrings: a tool invocation shows
//! up as `"name":"Write"` and a delegation as `"subagent_type":"planner"`.
//! The closing quote is part of the signature, so `Tool("Write")` can never
//! match a record for `WriteFile`.

use std::sync::OnceLock;

use regex::Regex;

/// A detectable event in the agent's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker<'a> {
    /// A tool invocation by name, e.g. `Marker::Tool("Write")`.
    Tool(&'a str),
    /// A delegation to a named sub-agent, e.g. `Marker::Subagent("planner")`.
    Subagent(&'a str),
}

impl Marker<'_> {
    /// The exact substring this marker matches in the transcript. The name is
    /// JSON-escaped so quotes or backslashes in it cannot desync the match.
    pub fn signature(&self) -> String {
        match self {
            Marker::Tool(name) => format!(r#""name":{}"#, json_string(name)),
            Marker::Subagent(name) => format!(r#""subagent_type":{}"#, json_string(name)),
        }
    }
}

fn json_string(s: &str) -> String {
    // Serializing a bare string cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Whether the marker occurs anywhere in `output`.
pub fn occurs(output: &str, marker: Marker) -> bool {
    output.contains(&marker.signature())
}

/// Byte offset of the marker's first occurrence, if any.
pub fn first_offset(output: &str, marker: Marker) -> Option<usize> {
    output.find(&marker.signature())
}

/// True when `first` occurs strictly before `second`. A missing marker never
/// wins an ordering claim: if either side is absent this is false.
pub fn occurs_before(output: &str, first: Marker, second: Marker) -> bool {
    match (first_offset(output, first), first_offset(output, second)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

static TOOL_NAME_RE: OnceLock<Regex> = OnceLock::new();
static SUBAGENT_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn tool_name_re() -> &'static Regex {
    TOOL_NAME_RE.get_or_init(|| Regex::new(r#""name":"([^"\\]+)""#).unwrap())
}

fn subagent_name_re() -> &'static Regex {
    SUBAGENT_NAME_RE.get_or_init(|| Regex::new(r#""subagent_type":"([^"\\]+)""#).unwrap())
}

/// Every tool name mentioned in `output`, in order of appearance. Used by the
/// runner's progress reporting; names with escape sequences are skipped.
pub(crate) fn tool_names(output: &str) -> impl Iterator<Item = &str> {
    tool_name_re()
        .captures_iter(output)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Every sub-agent name mentioned in `output`, in order of appearance.
pub(crate) fn subagent_names(output: &str) -> impl Iterator<Item = &str> {
    subagent_name_re()
        .captures_iter(output)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = concat!(
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Task","input":{"subagent_type":"planner","prompt":"plan it"}}]}}"#,
        "\n",
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Write","input":{"file_path":"a.md"}}]}}"#,
        "\n",
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Task","input":{"subagent_type":"reviewer","prompt":"review it"}}]}}"#,
        "\n",
    );

    #[test]
    fn detects_tool_invocations() {
        assert!(occurs(TRANSCRIPT, Marker::Tool("Write")));
        assert!(occurs(TRANSCRIPT, Marker::Tool("Task")));
        assert!(!occurs(TRANSCRIPT, Marker::Tool("Bash")));
    }

    #[test]
    fn detects_subagent_delegations() {
        assert!(occurs(TRANSCRIPT, Marker::Subagent("planner")));
        assert!(occurs(TRANSCRIPT, Marker::Subagent("reviewer")));
        assert!(!occurs(TRANSCRIPT, Marker::Subagent("builder")));
    }

    #[test]
    fn signature_is_anchored_by_the_closing_quote() {
        let out = r#"{"name":"WriteFile"}"#;
        assert!(!occurs(out, Marker::Tool("Write")));
        assert!(occurs(out, Marker::Tool("WriteFile")));
    }

    #[test]
    fn tool_and_subagent_namespaces_are_distinct() {
        // A delegation record also carries "name":"Task"; the sub-agent name
        // itself must not register as a tool.
        assert!(!occurs(TRANSCRIPT, Marker::Tool("planner")));
        assert!(!occurs(TRANSCRIPT, Marker::Subagent("Write")));
    }

    #[test]
    fn ordering_reflects_first_occurrence() {
        assert!(occurs_before(
            TRANSCRIPT,
            Marker::Subagent("planner"),
            Marker::Subagent("reviewer")
        ));
        assert!(!occurs_before(
            TRANSCRIPT,
            Marker::Subagent("reviewer"),
            Marker::Subagent("planner")
        ));
    }

    #[test]
    fn ordering_with_a_missing_marker_is_false() {
        assert!(!occurs_before(
            TRANSCRIPT,
            Marker::Subagent("planner"),
            Marker::Subagent("missing")
        ));
        assert!(!occurs_before(
            TRANSCRIPT,
            Marker::Subagent("missing"),
            Marker::Subagent("planner")
        ));
        assert!(!occurs_before("", Marker::Tool("a"), Marker::Tool("b")));
    }

    #[test]
    fn first_offset_reports_byte_positions() {
        let planner = first_offset(TRANSCRIPT, Marker::Subagent("planner")).unwrap();
        let write = first_offset(TRANSCRIPT, Marker::Tool("Write")).unwrap();
        assert!(planner < write);
        assert_eq!(first_offset(TRANSCRIPT, Marker::Tool("nope")), None);
    }

    #[test]
    fn repeated_markers_use_the_earliest_occurrence() {
        let out = r#"{"name":"Read"}{"name":"Write"}{"name":"Read"}"#;
        assert!(occurs_before(out, Marker::Tool("Read"), Marker::Tool("Write")));
        assert!(!occurs_before(out, Marker::Tool("Write"), Marker::Tool("Read")));
    }

    #[test]
    fn scans_names_in_order_of_appearance() {
        let tools: Vec<&str> = tool_names(TRANSCRIPT).collect();
        assert_eq!(tools, ["Task", "Write", "Task"]);
        let agents: Vec<&str> = subagent_names(TRANSCRIPT).collect();
        assert_eq!(agents, ["planner", "reviewer"]);
    }
}
