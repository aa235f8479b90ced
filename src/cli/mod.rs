//! Command-line interface for tenthman.
//!
//! Provides the `debate` and `models` commands.

mod commands;

pub use commands::{build_participants, parse_cli, run, run_with_cli, Cli, Commands, DebateArgs};
