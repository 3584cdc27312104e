//! sbx CLI
//!
//! Pushes component schemas and presets to a space and pulls them back.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use sbx_api::RequestContext;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and succeed
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.globals.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// Log to stderr, `sbx=info` unless `RUST_LOG` says otherwise
fn init_tracing(verbose: bool) {
    let default = if verbose { "sbx=debug" } else { "sbx=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
    tracing::debug!("Verbose mode enabled");
}

fn run(cli: Cli) -> Result<i32> {
    if let Commands::Completion { shell } = cli.command {
        commands::run_completion(shell, &mut std::io::stdout());
        return Ok(0);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<i32> {
    let ctx = RequestContext::new();
    let cancel = ctx.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding requests");
            cancel.cancel();
        }
    });

    let globals = &cli.globals;
    match cli.command {
        Commands::PushComponents {
            selection,
            space,
            dir,
            workers,
        } => commands::run_push(globals, &selection, space, dir, workers, &ctx).await,
        Commands::PullComponents { selection, space } => {
            commands::run_pull(globals, &selection, space, &ctx).await
        }
        Commands::SpaceInfo { space } => commands::run_space_info(globals, space, &ctx).await,
        Commands::Completion { shell } => {
            commands::run_completion(shell, &mut std::io::stdout());
            Ok(0)
        }
    }
}
