use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CliOverrides;

#[derive(Debug, Parser)]
#[command(name = "sawl-launcher")]
#[command(about = "Launches the SAWL transcription driver over this machine's episode range")]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository root holding the driver script and `data/episodes`.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub compute_type: Option<String>,

    #[arg(long, global = true)]
    pub python: Option<String>,

    /// Worker name from the partition table.
    #[arg(long, global = true)]
    pub worker: Option<String>,

    #[arg(long, global = true)]
    pub no_keep_awake: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the driver over the selected range.
    Run {
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        range: Option<Vec<String>>,

        /// Reprocess episodes that already have outputs.
        #[arg(long)]
        force: bool,

        /// Print the driver command line without running it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the partition table.
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Propose a weighted partition of START..=END.
    Split {
        start: String,
        end: String,

        /// `NAME` or `NAME:WEIGHT`, repeated in assignment order.
        #[arg(long = "worker", required = true)]
        workers: Vec<String>,
    },
    /// Per-episode completion for the selected range.
    Status {
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        range: Option<Vec<String>>,

        #[arg(long)]
        json: bool,
    },
    /// Realtime factor of completed episodes.
    Speed {
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        range: Option<Vec<String>>,
    },
    Doctor {
        #[arg(long)]
        json: bool,
    },
    /// Recent launches recorded on this machine.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl Cli {
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            root_dir: self.root.clone(),
            python: self.python.clone(),
            worker: self.worker.clone(),
            model: self.model.clone(),
            compute_type: self.compute_type.clone(),
            force: match &self.command {
                Command::Run { force: true, .. } => Some(true),
                _ => None,
            },
            keep_awake: self.no_keep_awake.then_some(false),
        }
    }
}
