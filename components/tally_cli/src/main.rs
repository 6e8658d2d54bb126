//! logtally command-line entry point
//!
//! Parses arguments, loads the programs, processes the inputs and prints
//! the metric export.

use clap::Parser as ClapParser;
use metric_store::MetricStore;
use std::io;
use std::sync::Arc;
use tally_cli::{Cli, CliResult, Runtime};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let mut runtime = Runtime::new(Arc::new(MetricStore::new()))
        .with_dump_bytecode(cli.dump_bytecode)
        .with_dump_ast(cli.dump_ast);

    for path in &cli.progs {
        runtime.load_file(path)?;
    }
    if cli.compile_only {
        info!(programs = runtime.vms().len(), "programs compiled");
        return Ok(());
    }

    let worker = runtime.start_expiry(cli.expiry_interval)?;
    let stats = if cli.logs.is_empty() {
        runtime.process_reader("", io::stdin().lock())
    } else {
        runtime.process_files(&cli.logs)
    };
    worker.stop();
    let stats = stats?;
    info!(lines = stats.lines, errors = stats.errors, "processing finished");

    print!("{}", runtime.export(cli.export)?);
    Ok(())
}
