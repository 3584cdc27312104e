//! push-components command implementation

use std::path::PathBuf;

use colored::Colorize;
use sbx_api::RequestContext;
use sbx_core::push::{self, PushOptions, PushOutcome};
use sbx_core::store::summarize_list;
use sbx_core::{DryRunEntry, MatchMode};

use super::{connect, require_selection, require_space};
use crate::cli::{GlobalArgs, Selection};
use crate::error::Result;

/// Names listed before a summary line is truncated
const SUMMARY_LIMIT: usize = 10;

/// Run the push-components command and return its exit code
pub async fn run_push(
    globals: &GlobalArgs,
    selection: &Selection,
    space: Option<i64>,
    dir: Option<PathBuf>,
    workers: Option<usize>,
    ctx: &RequestContext,
) -> Result<i32> {
    require_selection(selection)?;
    let (config, client) = connect(globals)?;
    let space = require_space(space.or(globals.target_space), "TARGET_SPACE_ID")?;
    let match_mode: MatchMode = selection.match_mode.parse()?;

    let options = PushOptions {
        space,
        names: selection.names.clone(),
        match_mode,
        all: selection.all,
        dir: dir.unwrap_or_else(|| globals.out.clone()),
        dry_run: selection.dry_run,
        workers: workers.unwrap_or_else(|| config.workers()),
    };

    let outcome = push::run(&options, &client, ctx).await;
    if outcome.report.dry_run {
        print_dry_run(&outcome.dry_run, space);
    }
    print_summary(&outcome);

    if let Some(error) = &outcome.error {
        eprintln!("{}: {}", "error".red().bold(), error);
    }
    Ok(outcome.exit_code())
}

fn print_dry_run(entries: &[DryRunEntry], space: u64) {
    for entry in entries {
        println!(
            "Dry run: {} component {} in space {} ({} presets)",
            entry.action(),
            entry.name.cyan(),
            space,
            entry.presets
        );
        if let Some(group) = &entry.new_group {
            println!("  - would create component group {:?}", group);
        }
        if !entry.new_tags.is_empty() {
            println!("  - would create internal tags: {}", entry.new_tags.join(", "));
        }
    }
}

fn print_summary(outcome: &PushOutcome) {
    let report = &outcome.report;
    println!();
    if report.dry_run {
        println!(
            "Dry run summary: {} components, {} presets (rate-limit retries: {}, server retries: {})",
            report.components_synced, report.presets_synced, report.rate_limit_retries, report.server_error_retries
        );
    } else {
        let headline = format!(
            "Pushed {} components and {} presets to space {} in {:.3?}",
            report.components_synced, report.presets_synced, report.space, report.duration
        );
        let headline = if report.outcome.is_clean() {
            headline.green().bold()
        } else {
            headline.yellow().bold()
        };
        println!(
            "{} (rate-limit retries: {}, server retries: {})",
            headline, report.rate_limit_retries, report.server_error_retries
        );
        if !report.created.is_empty() {
            println!("  {}: {}", "Created".dimmed(), summarize_list(&report.created, SUMMARY_LIMIT));
        }
        if !report.updated.is_empty() {
            println!("  {}: {}", "Updated".dimmed(), summarize_list(&report.updated, SUMMARY_LIMIT));
        }
    }

    if !report.missing.is_empty() {
        eprintln!("{} {}", "Missing components matching:".yellow(), report.missing.join(", "));
    }
}
