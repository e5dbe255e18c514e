//! CLI command definitions using clap.
//!
//! - plan: show when the configured run would fire and what it wants
//! - select: run the slot matcher over a saved candidate listing
//! - rehearse: drive a full run against a scripted backend, or only check availability

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// slotgrab - book time-released reservations the moment they open
#[derive(Parser, Debug)]
#[command(name = "slotgrab")]
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
    /// Print the resolved release instant, retry deadline and preference
    Plan,

    /// Pick the best slot from a JSON array of candidates
    Select {
        /// JSON file holding the candidate listing
        candidates: PathBuf,
    },

    /// Run the engine against a scripted backend on a simulated clock
    Rehearse {
        /// YAML file with the scripted backend responses
        script: PathBuf,

        /// Do not append the result to the run history
        #[arg(long)]
        no_history: bool,

        /// List and rank once against the script, without waiting or claiming
        #[arg(long)]
        check_only: bool,
    },
}
