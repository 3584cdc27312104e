//! Pull component schemas and presets from a source space to disk

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sbx_api::{ApiError, Client, Component, ComponentGroup, Preset, RequestContext, SpaceId, normalize_name};
use serde_json::Value;

use crate::matcher::{MatchMode, Matcher};
use crate::report::RunReport;
use crate::{Error, Result, store};

#[derive(Debug, Clone, PartialEq)]
pub struct PullOptions {
    pub space: SpaceId,
    pub names: Vec<String>,
    pub match_mode: MatchMode,
    pub all: bool,
    pub out_dir: PathBuf,
    /// List planned file writes without writing
    pub dry_run: bool,
}

impl PullOptions {
    pub fn new(space: SpaceId, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            space,
            names: Vec::new(),
            match_mode: MatchMode::default(),
            all: false,
            out_dir: out_dir.into(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Component,
    Preset,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Component => write!(f, "component"),
            EntityKind::Preset => write!(f, "preset"),
        }
    }
}

/// One file a pull writes
#[derive(Debug, Clone, PartialEq)]
pub struct PullAction {
    pub kind: EntityKind,
    pub name: String,
    pub path: PathBuf,
    /// The file already exists and will be replaced
    pub overwrite: bool,
    pub payload: Value,
}

impl PullAction {
    pub fn verb(&self) -> &'static str {
        if self.overwrite { "overwrite" } else { "create" }
    }
}

#[derive(Debug)]
pub struct PullOutcome {
    pub report: RunReport,
    pub actions: Vec<PullAction>,
    pub error: Option<Error>,
}

impl PullOutcome {
    pub fn exit_code(&self) -> i32 {
        self.report.outcome.exit_code()
    }
}

/// Download the selected components of `options.space` and their presets
#[tracing::instrument(skip_all, fields(space = options.space, dry_run = options.dry_run))]
pub async fn run(options: &PullOptions, client: &Client, ctx: &RequestContext) -> PullOutcome {
    let start = Instant::now();
    let mut report = RunReport::new(options.space, options.dry_run);
    let mut actions = Vec::new();

    let error = execute(options, client, ctx, &mut report, &mut actions).await.err();
    if let Some(error) = &error {
        tracing::warn!(%error, "pull failed");
    }

    report.finish(ctx.counters(), start.elapsed(), error.as_ref().map(Error::outcome));
    PullOutcome { report, actions, error }
}

async fn execute(
    options: &PullOptions,
    client: &Client,
    ctx: &RequestContext,
    report: &mut RunReport,
    actions: &mut Vec<PullAction>,
) -> Result<()> {
    if options.space == 0 {
        return Err(Error::InvalidSpace { space: options.space });
    }
    if !client.has_token() {
        return Err(ApiError::MissingToken.into());
    }
    let matcher = Matcher::new(options.match_mode, &options.names, options.all)?;

    let (mut components, groups, presets) = tokio::try_join!(
        client.list_components(ctx, options.space),
        client.list_component_groups(ctx, options.space),
        client.list_presets(ctx, options.space),
    )?;
    fill_group_names(&mut components, &groups);

    let selection = matcher.filter(components, |component| component.name.as_str());
    report.missing = selection.missing;

    let presets = select_presets(presets, &selection.selected);
    *actions = plan_actions(options.space, &options.out_dir, &selection.selected, &presets)?;

    if !options.dry_run {
        for action in actions.iter() {
            store::write_json(&action.path, &action.payload)?;
            tracing::debug!("Saved {} {} to {}", action.kind, action.name, action.path.display());
        }
    }

    report.components_synced = selection.selected.len();
    report.presets_synced = actions.iter().filter(|a| a.kind == EntityKind::Preset).count();
    Ok(())
}

/// Set `component_group_name` from the group owning each component's UUID
pub fn fill_group_names(components: &mut [Component], groups: &[ComponentGroup]) {
    let names: HashMap<&str, &str> = groups
        .iter()
        .filter(|group| !group.uuid.is_empty())
        .map(|group| (group.uuid.as_str(), group.name.as_str()))
        .collect();

    for component in components.iter_mut() {
        if let Some(name) = names.get(component.component_group_uuid.as_str()) {
            component.component_group_name = name.to_string();
        }
    }
}

/// Presets owned by one of `components`, by ID or by `preset.component` name
pub fn select_presets(presets: Vec<Preset>, components: &[Component]) -> Vec<Preset> {
    let ids: HashSet<u64> = components.iter().map(|c| c.id).filter(|id| *id != 0).collect();
    let names: HashSet<String> = components.iter().map(Component::key).collect();

    presets
        .into_iter()
        .filter(|preset| {
            ids.contains(&preset.component_id)
                || preset
                    .component_name()
                    .is_some_and(|owner| names.contains(&normalize_name(owner)))
        })
        .collect()
}

/// One action per entity, writing `<out_dir>/<name>-<space>.json`.
///
/// Components come first; an entity whose path is already taken is skipped.
pub fn plan_actions(
    space: SpaceId,
    out_dir: &Path,
    components: &[Component],
    presets: &[Preset],
) -> Result<Vec<PullAction>> {
    let mut actions = Vec::with_capacity(components.len() + presets.len());
    for component in components {
        actions.push(action(EntityKind::Component, &component.name, space, out_dir, component)?);
    }
    for preset in presets {
        actions.push(action(EntityKind::Preset, &preset.name, space, out_dir, preset)?);
    }

    let mut claimed = HashSet::new();
    actions.retain(|action| {
        if claimed.insert(action.path.clone()) {
            return true;
        }
        tracing::warn!(
            kind = %action.kind,
            name = %action.name,
            path = %action.path.display(),
            "skipping entity whose file is already written by an earlier one"
        );
        false
    });
    Ok(actions)
}

fn action<T: serde::Serialize>(
    kind: EntityKind,
    name: &str,
    space: SpaceId,
    out_dir: &Path,
    entity: &T,
) -> Result<PullAction> {
    let path = out_dir.join(format!("{}-{}.json", name, space));
    let payload = serde_json::to_value(entity).map_err(|e| Error::json(&path, e))?;
    Ok(PullAction {
        kind,
        name: name.to_string(),
        overwrite: path.exists(),
        path,
        payload,
    })
}
