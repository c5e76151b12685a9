use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "runrelay")]
#[command(about = "Replay recorded test runs to a test-reporting backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file; defaults to the user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Post a recorded producer-event stream through the publisher.
    Post {
        /// JSON-lines run recording.
        events: PathBuf,

        /// Write the backend call stream here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Remove-keywords directives (ALL, PASSED, WUKS, FOR, WHILE,
        /// NAME:<glob>, TAG:<glob>), overriding the configuration.
        #[arg(long = "remove-keywords")]
        remove_keywords: Vec<String>,

        /// Flatten-keywords directives (FOR, WHILE, ITERATION,
        /// NAME:<glob>, TAG:<glob>), overriding the configuration.
        #[arg(long = "flatten-keywords")]
        flatten_keywords: Vec<String>,

        /// Launch name override.
        #[arg(long)]
        launch_name: Option<String>,

        /// Execution log to attach as a launch-level artifact.
        #[arg(long)]
        log_html: Option<PathBuf>,

        /// Execution report to attach.
        #[arg(long)]
        report_html: Option<PathBuf>,

        /// XUnit result file to attach.
        #[arg(long)]
        xunit: Option<PathBuf>,
    },
}
