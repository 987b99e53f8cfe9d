//! Subcommand implementations.

pub mod index;
pub mod scaffold;
pub mod snapshot;
pub mod validate;
