//! CLI subcommand implementations.

pub mod steps;
pub mod summary;
pub mod tasks;
pub mod util;
