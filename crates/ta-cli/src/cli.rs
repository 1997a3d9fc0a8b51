//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Task analyser for robot controller logs.
///
/// Reconstructs tasks and timed steps from the controller's colored text log.
#[derive(Debug, Parser)]
#[command(name = "ta", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the tasks found in a log file.
    Tasks {
        /// The log file to analyse.
        log: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the paired steps of one task.
    Steps {
        /// The log file to analyse.
        log: PathBuf,

        /// The task ID as logged by the controller.
        #[arg(long)]
        task: i64,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print every task with its params and raw step events.
    Summary {
        /// The log file to analyse.
        log: PathBuf,
    },
}
