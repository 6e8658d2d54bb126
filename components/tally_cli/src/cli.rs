//! Command-line arguments

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Extract metrics from log files with logtally programs
#[derive(Debug, Parser)]
#[command(name = "logtally", version, about)]
pub struct Cli {
    /// Program files to load
    #[arg(short, long = "progs", value_name = "FILE", num_args = 1.., required = true)]
    pub progs: Vec<PathBuf>,

    /// Log files to process; standard input when absent
    #[arg(short, long = "logs", value_name = "FILE", num_args = 1..)]
    pub logs: Vec<PathBuf>,

    /// Compile the programs and exit
    #[arg(long)]
    pub compile_only: bool,

    /// Print the bytecode of each program after compiling it
    #[arg(long)]
    pub dump_bytecode: bool,

    /// Print the syntax tree of each program after parsing it
    #[arg(long)]
    pub dump_ast: bool,

    /// How often expired datums are swept
    #[arg(long, value_name = "DURATION", default_value = "1m", value_parser = humantime::parse_duration)]
    pub expiry_interval: Duration,

    /// Format of the metric export printed on exit
    #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
    pub export: ExportFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// One `name{labels} value` line per datum
    Text,
    /// Pretty-printed JSON
    Json,
}

impl Cli {
    /// Default log filter for the verbosity level
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
