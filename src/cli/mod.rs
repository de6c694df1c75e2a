//! CLI Module
//!
//! Command-line interface over a project kept in a local file store.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Clipdeck - timeline editor state engine
#[derive(Parser, Debug)]
#[command(name = "clipdeck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the local project snapshot
    #[arg(short, long, global = true, default_value = ".clipdeck")]
    pub store: PathBuf,

    /// Editor configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a fresh project, replacing the stored one
    New {
        /// Project name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Print the stored project
    Show {
        /// Print the full project as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a JSON array of actions to the stored project
    Apply {
        /// Path to the actions file
        actions: PathBuf,
    },

    /// Replace the stored project with a project file
    Import {
        /// Path to the project file
        file: PathBuf,
    },

    /// Write the stored project to a file
    Export {
        /// Destination path
        file: PathBuf,
    },

    /// List clips overlapping a time range
    Range {
        /// Range start in seconds
        start: f64,

        /// Range end in seconds
        end: f64,
    },
}
