//! CLI command definitions using clap.
//!
//! - ask: submit a doubt
//! - next / resolve: teacher workflow
//! - queue / stats / history: dashboard views

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// doubtq - classroom doubt queue
#[derive(Parser, Debug)]
#[command(name = "doubtq")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a new doubt
    Ask {
        /// Short question title
        title: String,

        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Queue in the priority tier
        #[arg(short, long)]
        priority: bool,
    },

    /// Show the doubt to resolve next
    Next,

    /// Answer a doubt
    Resolve {
        /// Doubt ID to resolve
        id: String,

        /// Answer text
        answer: String,
    },

    /// Show both queues in service order
    Queue,

    /// Show aggregate counts
    Stats,

    /// List all doubts, answered ones included
    History {
        /// Which doubts to show (all, pending, answered)
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Sort by creation time (newest, oldest)
        #[arg(short, long, default_value = "newest")]
        order: String,
    },
}
