//! Command-line interface for reelforge.
//!
//! Provides commands for starting workflows, selecting concepts,
//! resuming interrupted runs, and inspecting stored state.

mod commands;

pub use commands::{parse_cli, run_with_cli};
