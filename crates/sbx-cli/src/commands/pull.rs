//! pull-components command implementation

use colored::Colorize;
use sbx_api::RequestContext;
use sbx_core::MatchMode;
use sbx_core::pull::{self, PullOptions, PullOutcome};

use super::{connect, require_selection, require_space};
use crate::cli::{GlobalArgs, Selection};
use crate::error::Result;

/// Run the pull-components command and return its exit code
pub async fn run_pull(
    globals: &GlobalArgs,
    selection: &Selection,
    space: Option<i64>,
    ctx: &RequestContext,
) -> Result<i32> {
    require_selection(selection)?;
    let (_, client) = connect(globals)?;
    let space = require_space(space.or(globals.source_space), "SOURCE_SPACE_ID")?;
    let match_mode: MatchMode = selection.match_mode.parse()?;

    let options = PullOptions {
        space,
        names: selection.names.clone(),
        match_mode,
        all: selection.all,
        out_dir: globals.out.clone(),
        dry_run: selection.dry_run,
    };

    let outcome = pull::run(&options, &client, ctx).await;
    print_actions(&outcome);
    print_summary(&outcome);

    if let Some(error) = &outcome.error {
        eprintln!("{}: {}", "error".red().bold(), error);
    }
    Ok(outcome.exit_code())
}

fn print_actions(outcome: &PullOutcome) {
    if outcome.report.dry_run {
        println!("Dry run: pulling from space {}", outcome.report.space);
        for action in &outcome.actions {
            println!(
                "  - {} {} -> {} ({})",
                action.kind,
                action.name.cyan(),
                action.path.display(),
                action.verb()
            );
        }
        return;
    }

    if outcome.error.is_some() {
        return;
    }
    for action in &outcome.actions {
        println!("Saved {} {} to {}", action.kind, action.name.cyan(), action.path.display());
    }
}

fn print_summary(outcome: &PullOutcome) {
    let report = &outcome.report;
    println!();
    if report.dry_run {
        println!(
            "Dry run summary: {} components, {} presets (rate-limit retries: {})",
            report.components_synced, report.presets_synced, report.rate_limit_retries
        );
    } else {
        let headline = format!(
            "Pulled {} components and {} presets from space {} in {:.3?}",
            report.components_synced, report.presets_synced, report.space, report.duration
        );
        let headline = if report.outcome.is_clean() {
            headline.green().bold()
        } else {
            headline.yellow().bold()
        };
        println!("{} (rate-limit retries: {})", headline, report.rate_limit_retries);
    }

    if !report.missing.is_empty() {
        eprintln!("{} {}", "Missing components matching:".yellow(), report.missing.join(", "));
    }
}
