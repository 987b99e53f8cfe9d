//! Output helpers for the CLI.

use anyhow::Result;
use serde::Serialize;

/// Print a value as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
