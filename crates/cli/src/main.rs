//! `kg` — command-line front end over `kg-executor`.
//!
//! Single-shot mode only: `kg [flags] SUBCOMMAND [args]`. Exit codes follow
//! `KgError::exit_code()` — 0 on success, 2 for input errors, 3 when the
//! index is unavailable or stale, 4 on a writer conflict, 1 otherwise.

mod commands;
mod format;
mod parse;

use std::path::PathBuf;
use std::process;

use commands::build_cli;
use format::{format_error, format_output, OutputMode};
use kg_executor::Executor;
use parse::matches_to_command;

fn main() {
    let matches = build_cli().get_matches();

    let verbosity = matches.get_count("verbose");
    init_tracing(verbosity);

    let root = matches
        .get_one::<String>("root")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mode = if matches.get_flag("json") { OutputMode::Json } else { OutputMode::Human };

    // `serve` runs the watcher daemon to completion (SIGTERM) rather than
    // dispatching a single `Command`; it never touches `Executor`, which
    // opens a one-shot reader/single-writer session per invocation.
    if matches.subcommand_name() == Some("serve") {
        if let Err(e) = kg_executor::serve(&root) {
            eprintln!("{}", format_error(&e, mode));
            process::exit(e.exit_code());
        }
        return;
    }

    let command = match matches_to_command(&matches) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(e.exit_code());
        }
    };

    let executor = match Executor::open(&root) {
        Ok(executor) => executor,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(e.exit_code());
        }
    };

    match executor.dispatch(command) {
        Ok(output) => println!("{}", format_output(&output, mode)),
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info,kg=debug",
        _ => "debug,kg=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
