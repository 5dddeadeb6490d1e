//! Clap command tree definition.

use clap::{Arg, Command as ClapCommand};

/// Build the complete CLI command tree.
pub fn build_cli() -> ClapCommand {
    ClapCommand::new("kg")
        .about("Local-first knowledge graph with hybrid keyword+vector retrieval")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("root")
                .long("root")
                .help("Project root (default: current directory)")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging (repeat for trace)")
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand(build_context())
        .subcommand(build_search())
        .subcommand(build_show())
        .subcommand(build_add_bullet())
        .subcommand(build_mark_reviewed())
        .subcommand(build_status())
        .subcommand(build_reindex())
        .subcommand(build_calibrate())
        .subcommand(build_serve())
}

fn build_context() -> ClapCommand {
    ClapCommand::new("context")
        .about("Retrieve a formatted, budget-bounded context block for a query")
        .arg(Arg::new("query").required(true))
        .arg(Arg::new("session-id").long("session-id"))
        .arg(Arg::new("rerank-query").long("rerank-query"))
        .arg(Arg::new("k").long("k"))
        .arg(Arg::new("char-budget").long("char-budget"))
}

fn build_search() -> ClapCommand {
    ClapCommand::new("search")
        .about("Raw fused/calibrated hits for a query, unformatted")
        .arg(Arg::new("query").required(true))
        .arg(Arg::new("limit").long("limit"))
}

fn build_show() -> ClapCommand {
    ClapCommand::new("show")
        .about("Show every live bullet on one node")
        .arg(Arg::new("slug").required(true))
}

fn build_add_bullet() -> ClapCommand {
    ClapCommand::new("add-bullet")
        .about("Append a bullet to a node")
        .arg(Arg::new("slug").required(true))
        .arg(Arg::new("text").required(true))
        .arg(Arg::new("kind").long("kind").help("fact|gotcha|decision|task|note|success|failure"))
}

fn build_mark_reviewed() -> ClapCommand {
    ClapCommand::new("mark-reviewed")
        .about("Reset a node's served-budget counter")
        .arg(Arg::new("slug").required(true))
}

fn build_status() -> ClapCommand {
    ClapCommand::new("status").about("Per-node served-budget and flagged state, plus calibration staleness")
}

fn build_reindex() -> ClapCommand {
    ClapCommand::new("reindex").about("Force a full derived-store rebuild from the record logs")
}

fn build_calibrate() -> ClapCommand {
    ClapCommand::new("calibrate").about("Force a quantile calibration pass")
}

fn build_serve() -> ClapCommand {
    ClapCommand::new("serve")
        .about("Run the watcher daemon: reindex on file changes until SIGTERM, reload config on SIGHUP")
}
