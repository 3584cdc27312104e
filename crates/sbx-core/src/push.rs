//! Push local component schemas and presets to a destination space

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use sbx_api::{ApiError, Client, RequestContext, SpaceId};

use crate::config::DEFAULT_WORKERS;
use crate::executor::Executor;
use crate::matcher::{MatchMode, Matcher};
use crate::planner::{self, DryRunEntry};
use crate::report::RunReport;
use crate::resolver::DependencyResolver;
use crate::snapshot::{ComponentCache, Snapshot};
use crate::{Error, Result, store};

#[derive(Debug, Clone, PartialEq)]
pub struct PushOptions {
    pub space: SpaceId,
    /// Component selectors; ignored with `all`
    pub names: Vec<String>,
    pub match_mode: MatchMode,
    pub all: bool,
    /// Schema directory holding `components/` and `presets/`
    pub dir: PathBuf,
    /// Plan and report without writing
    pub dry_run: bool,
    pub workers: usize,
}

impl PushOptions {
    pub fn new(space: SpaceId, dir: impl Into<PathBuf>) -> Self {
        Self {
            space,
            names: Vec::new(),
            match_mode: MatchMode::default(),
            all: false,
            dir: dir.into(),
            dry_run: false,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Report of a push run and the error that stopped it, if any
#[derive(Debug)]
pub struct PushOutcome {
    pub report: RunReport,
    /// Planned actions, filled for dry runs
    pub dry_run: Vec<DryRunEntry>,
    pub error: Option<Error>,
}

impl PushOutcome {
    pub fn exit_code(&self) -> i32 {
        self.report.outcome.exit_code()
    }

    pub fn into_result(self) -> Result<RunReport> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.report),
        }
    }
}

/// Push the selected components of `options.dir` to `options.space`.
///
/// Input is validated before any request is made. The returned report is
/// complete even when the run fails part way.
#[tracing::instrument(skip_all, fields(space = options.space, dry_run = options.dry_run))]
pub async fn run(options: &PushOptions, client: &Client, ctx: &RequestContext) -> PushOutcome {
    let start = Instant::now();
    let mut report = RunReport::new(options.space, options.dry_run);
    let mut dry_run = Vec::new();

    let error = execute(options, client, ctx, &mut report, &mut dry_run).await.err();
    if let Some(error) = &error {
        tracing::warn!(%error, "push failed");
    }

    report.finish(ctx.counters(), start.elapsed(), error.as_ref().map(Error::outcome));
    PushOutcome {
        report,
        dry_run,
        error,
    }
}

async fn execute(
    options: &PushOptions,
    client: &Client,
    ctx: &RequestContext,
    report: &mut RunReport,
    dry_run: &mut Vec<DryRunEntry>,
) -> Result<()> {
    if options.space == 0 {
        return Err(Error::InvalidSpace { space: options.space });
    }
    if !client.has_token() {
        return Err(ApiError::MissingToken.into());
    }
    let matcher = Matcher::new(options.match_mode, &options.names, options.all)?;

    let files = store::load_components(&options.dir)?;
    if files.is_empty() {
        return Err(Error::NoComponents {
            dir: options.dir.clone(),
        });
    }
    tracing::info!("Loaded {} component files from {}", files.len(), options.dir.display());

    let selection = matcher.filter(files, |file| file.component.name.as_str());
    report.missing = selection.missing;
    tracing::info!(
        "Selected {} components (missing: {})",
        selection.selected.len(),
        report.missing.len()
    );

    let preset_files = store::load_presets(&options.dir)?;
    tracing::info!("Discovered {} preset files", preset_files.len());
    let presets = planner::group_presets(preset_files.into_iter().map(|file| file.preset));

    let snapshot = Snapshot::fetch(client, ctx, options.space).await?;
    let resolver = Arc::new(DependencyResolver::new(client.clone(), options.space).seeded(&snapshot));
    let components = Arc::new(ComponentCache::from_components(&snapshot.components));

    let desired = selection.selected.into_iter().map(|file| file.component).collect();
    let plans = planner::plan(desired, &presets, &components);

    if options.dry_run {
        *dry_run = planner::dry_run(&plans, &resolver);
        report.components_synced = dry_run.len();
        report.presets_synced = dry_run.iter().map(|entry| entry.presets).sum();
        return Ok(());
    }

    let executor = Executor::new(client.clone(), options.space, resolver, components, snapshot.presets)
        .with_workers(options.workers);
    let execution = executor.run(ctx, plans).await;
    for outcome in &execution.outcomes {
        report.record(outcome.name.clone(), outcome.created, outcome.presets);
    }

    match execution.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
