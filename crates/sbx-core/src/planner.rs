//! Per-component sync plans
//!
//! A plan decides create versus update for one desired component and carries
//! the presets that belong to it. Plans are immutable once built; each is
//! handed to exactly one executor worker.

use std::collections::HashMap;

use sbx_api::{Component, Preset, normalize_name};

use crate::resolver::DependencyResolver;
use crate::snapshot::ComponentCache;

/// What happens to the component on the destination
#[derive(Debug, Clone, PartialEq)]
pub enum PlanAction {
    Create,
    /// Replace the remote component `existing`
    Update { existing: Component },
}

/// Everything needed to sync one component
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    /// Position in the selection, used to order outcomes
    pub index: usize,
    pub component: Component,
    pub action: PlanAction,
    pub presets: Vec<Preset>,
    /// Lower-cased name of the preset to set as default once it exists remotely
    pub default_preset: Option<String>,
}

impl SyncPlan {
    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn is_create(&self) -> bool {
        matches!(self.action, PlanAction::Create)
    }
}

/// Presets grouped by the lower-cased name of their owning component.
///
/// Presets that do not name a component are dropped.
pub fn group_presets(presets: impl IntoIterator<Item = Preset>) -> HashMap<String, Vec<Preset>> {
    let mut grouped: HashMap<String, Vec<Preset>> = HashMap::new();
    for preset in presets {
        let Some(owner) = preset.component_name().map(normalize_name) else {
            continue;
        };
        grouped.entry(owner).or_default().push(preset);
    }
    grouped
}

/// Name of the preset whose local ID equals the component's `preset_id`.
///
/// When several presets share that ID the first one wins.
pub fn default_preset_name(component: &Component, presets: &[Preset]) -> Option<String> {
    if component.preset_id == 0 {
        return None;
    }
    presets
        .iter()
        .find(|preset| preset.id == component.preset_id)
        .map(|preset| preset.name.to_lowercase())
}

/// Build one plan per desired component, in input order
pub fn plan(
    desired: Vec<Component>,
    presets: &HashMap<String, Vec<Preset>>,
    existing: &ComponentCache,
) -> Vec<SyncPlan> {
    desired
        .into_iter()
        .enumerate()
        .map(|(index, component)| {
            let presets = presets.get(&component.key()).cloned().unwrap_or_default();
            let default_preset = default_preset_name(&component, &presets);
            let action = match existing.get(&component.name) {
                Some(existing) => PlanAction::Update { existing },
                None => PlanAction::Create,
            };
            SyncPlan {
                index,
                component,
                action,
                presets,
                default_preset,
            }
        })
        .collect()
}

/// What a plan would do, without doing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunEntry {
    pub name: String,
    pub create: bool,
    pub presets: usize,
    /// Group that does not exist yet and would be created
    pub new_group: Option<String>,
    /// Tags that do not exist yet and would be created
    pub new_tags: Vec<String>,
}

impl DryRunEntry {
    pub fn action(&self) -> &'static str {
        if self.create { "create" } else { "update" }
    }
}

/// Describe `plans` against the resolver's known groups and tags
pub fn dry_run(plans: &[SyncPlan], resolver: &DependencyResolver) -> Vec<DryRunEntry> {
    plans
        .iter()
        .map(|plan| {
            let group = plan.component.component_group_name.trim();
            let new_group = (!group.is_empty() && !resolver.has_group(group)).then(|| group.to_string());
            let new_tags = plan
                .component
                .tag_names()
                .into_iter()
                .filter(|tag| !resolver.has_tag(tag))
                .collect();
            DryRunEntry {
                name: plan.component.name.clone(),
                create: plan.is_create(),
                presets: plan.presets.len(),
                new_group,
                new_tags,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sbx_api::InternalTag;
    use sbx_test_utils::{FakeSpace, client_for};
    use serde_json::{Map, json};
    use std::sync::Arc;

    use crate::snapshot::Snapshot;

    fn component(name: &str) -> Component {
        Component {
            name: name.into(),
            schema: Some(Map::new()),
            ..Component::default()
        }
    }

    fn preset(id: u64, name: &str, owner: &str) -> Preset {
        let value = json!({"component": owner});
        Preset {
            id,
            name: name.into(),
            preset: value.as_object().cloned(),
            ..Preset::default()
        }
    }

    #[test]
    fn test_presets_grouped_by_owner_case_insensitively() {
        let grouped = group_presets(vec![
            preset(1, "Dark", "Hero"),
            preset(2, "Light", "hero"),
            preset(3, "Wide", "teaser"),
            Preset {
                name: "Orphan".into(),
                preset: Some(Map::new()),
                ..Preset::default()
            },
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["hero"].len(), 2);
        assert_eq!(grouped["teaser"][0].name, "Wide");
    }

    #[test]
    fn test_default_preset_first_match_wins() {
        let mut hero = component("hero");
        hero.preset_id = 2;
        let presets = vec![preset(1, "Dark", "hero"), preset(2, "Light", "hero"), preset(2, "Other", "hero")];
        assert_eq!(default_preset_name(&hero, &presets), Some("light".to_string()));

        hero.preset_id = 9;
        assert_eq!(default_preset_name(&hero, &presets), None);
        hero.preset_id = 0;
        assert_eq!(default_preset_name(&hero, &presets), None);
    }

    #[test]
    fn test_plan_matches_existing_by_name() {
        let existing = ComponentCache::from_components(&[Component {
            id: 40,
            name: "Hero".into(),
            ..Component::default()
        }]);
        let presets = group_presets(vec![preset(1, "Dark", "hero")]);

        let plans = plan(vec![component("hero"), component("teaser")], &presets, &existing);

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].index, 0);
        assert!(matches!(&plans[0].action, PlanAction::Update { existing } if existing.id == 40));
        assert_eq!(plans[0].presets.len(), 1);
        assert_eq!(plans[1].index, 1);
        assert!(plans[1].is_create());
        assert!(plans[1].presets.is_empty());
    }

    #[test]
    fn test_dry_run_lists_missing_dependencies() {
        let space = Arc::new(FakeSpace::new(1));
        space.seed_group("layout");
        space.seed_tag("known");
        let snapshot = Snapshot {
            groups: space.groups(),
            tags: space.tags(),
            ..Snapshot::default()
        };
        let resolver = DependencyResolver::new(client_for(&space), 1).seeded(&snapshot);

        let mut hero = component("hero");
        hero.component_group_name = "sections".into();
        hero.internal_tags_list = vec![InternalTag::component("known"), InternalTag::component("fresh")];
        let mut teaser = component("teaser");
        teaser.component_group_name = "Layout".into();

        let plans = plan(vec![hero, teaser], &HashMap::new(), &ComponentCache::default());
        let entries = dry_run(&plans, &resolver);

        assert_eq!(
            entries,
            vec![
                DryRunEntry {
                    name: "hero".into(),
                    create: true,
                    presets: 0,
                    new_group: Some("sections".into()),
                    new_tags: vec!["fresh".into()],
                },
                DryRunEntry {
                    name: "teaser".into(),
                    create: true,
                    presets: 0,
                    new_group: None,
                    new_tags: vec![],
                },
            ]
        );
        assert!(space.calls().is_empty());
    }
}
