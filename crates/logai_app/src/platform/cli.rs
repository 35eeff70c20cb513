use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::logging::LogDestination;

/// Upload log files for AI analysis and browse past reports.
#[derive(Debug, Parser)]
#[command(name = "logai", version)]
pub struct Cli {
    /// RON config file; defaults to ./logai.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Analysis service base URL.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Bearer token sent with requests.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Where log output goes.
    #[arg(long, global = true, value_enum)]
    pub log: Option<LogDestination>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a log file and follow the analysis live.
    Analyze {
        file: Option<PathBuf>,
        /// Save the final report as markdown in the report directory.
        #[arg(long)]
        save: bool,
    },
    /// List past analyses of the signed-in user.
    History {
        /// Print each stored summary below its row.
        #[arg(long)]
        full: bool,
        /// Save the summary of the analysis with this id.
        #[arg(long, value_name = "ID")]
        save: Option<String>,
    },
    /// Check that the analysis service is up.
    Health,
}
