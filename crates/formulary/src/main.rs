//! `formulary` -- install packages from formula descriptors.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use formulary_install::InstallFailure;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Log targets of the workspace crates.
const LOG_TARGETS: &[&str] = &[
    "formulary",
    "formulary_config",
    "formulary_core",
    "formulary_env",
    "formulary_fetch",
    "formulary_formula",
    "formulary_install",
    "formulary_lockfile",
];

fn main() {
    // First Ctrl+C exits with the interrupt status; a second one forces it.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(130);
    });

    let cli = Cli::parse();
    init_logging(&cli.global);

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| dispatch(&ctx, cli.command));

    if let Err(e) = result {
        let kind = e.downcast_ref::<InstallFailure>().map(InstallFailure::kind);
        if cli.global.json {
            let mut err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Some(kind) = kind {
                err_json["kind"] = serde_json::Value::from(kind);
            }
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
            if let Some(InstallFailure::Assertion { output, .. }) = e.downcast_ref::<InstallFailure>() {
                if !output.is_empty() {
                    eprintln!("--- output ---\n{}", output.trim_end());
                }
            }
        }
        std::process::exit(1);
    }
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Install(args)) => commands::install::run(ctx, &args),
        Some(Commands::Test(args)) => commands::test::run(ctx, &args),
        Some(Commands::Fetch(args)) => commands::fetch::run(ctx, &args),
        Some(Commands::Info(args)) => commands::info::run(ctx, &args),
        Some(Commands::Lint(args)) => commands::lint::run(ctx, &args),
        Some(Commands::List) => commands::list::run(ctx),
        Some(Commands::Uninstall(args)) => commands::uninstall::run(ctx, &args),
        Some(Commands::Cache(args)) => commands::cache::run(ctx, &args),
        Some(Commands::Config(args)) => commands::config_cmd::run(ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(ctx, &args),
        Some(Commands::Version) => commands::version::run(ctx),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}

/// Warnings are always shown on stderr; `-v` adds debug detail and `-q`
/// leaves errors only. `RUST_LOG` overrides both.
fn init_logging(global: &cli::GlobalArgs) {
    let level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let directives: Vec<String> = LOG_TARGETS.iter().map(|t| format!("{t}={level}")).collect();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives.join(",")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(global.verbose)
        .without_time()
        .init();
}
