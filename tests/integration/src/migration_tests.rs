//! Moving components between spaces: pull from one, push the files to another

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sbx_api::{Component, Method, Preset, RequestContext};
use sbx_core::pull::{self, PullOptions};
use sbx_core::push::{self, PushOptions};
use sbx_core::Outcome;
use sbx_test_utils::{FakeSpace, Resource, client_for};
use serde_json::json;
use tempfile::TempDir;

const SOURCE: u64 = 1001;
const TARGET: u64 = 2002;

/// A source space with a grouped, tagged component and a default preset.
///
/// The whitelist names its group, the way schema files reference groups.
fn source_space() -> Arc<FakeSpace> {
    let space = Arc::new(FakeSpace::new(SOURCE));
    let layout = space.seed_group("layout");
    let marketing = space.seed_tag("marketing");

    let hero = space.seed_component(Component {
        name: "hero".into(),
        display_name: "Hero".into(),
        schema: json!({
            "title": {"type": "text", "pos": 0},
            "body": {"type": "bloks", "component_group_whitelist": ["layout"]}
        })
        .as_object()
        .cloned(),
        component_group_uuid: layout.uuid.clone(),
        preset_id: 900,
        internal_tags_list: vec![marketing.clone()],
        internal_tag_ids: vec![marketing.id],
        ..Component::default()
    });
    space.seed_preset(Preset {
        id: 900,
        name: "Dark".into(),
        component_id: hero.id,
        preset: json!({"component": "hero", "title": "Dark"}).as_object().cloned(),
        ..Preset::default()
    });
    space.seed_component(Component {
        name: "teaser".into(),
        schema: json!({"headline": {"type": "text"}}).as_object().cloned(),
        ..Component::default()
    });
    space
}

async fn pull_all(source: &Arc<FakeSpace>, out: &TempDir) {
    let mut options = PullOptions::new(SOURCE, out.path());
    options.all = true;
    let outcome = pull::run(&options, &client_for(source), &RequestContext::new()).await;
    assert!(outcome.error.is_none(), "{:?}", outcome.error);
}

fn push_options(out: &TempDir) -> PushOptions {
    let mut options = PushOptions::new(TARGET, out.path());
    options.all = true;
    options
}

#[tokio::test]
async fn test_pulled_files_recreate_components_in_target() {
    let source = source_space();
    let target = Arc::new(FakeSpace::new(TARGET));
    let out = TempDir::new().unwrap();

    pull_all(&source, &out).await;
    let outcome = push::run(&push_options(&out), &client_for(&target), &RequestContext::new()).await;

    assert!(outcome.error.is_none(), "{:?}", outcome.error);
    assert_eq!(outcome.report.outcome, Outcome::Clean);
    assert_eq!(outcome.report.created, vec!["hero".to_string(), "teaser".to_string()]);
    assert_eq!(outcome.report.presets_synced, 1);

    let groups = target.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "layout");
    let tags = target.tags();
    assert_eq!(tags.iter().map(|tag| tag.name.as_str()).collect::<Vec<_>>(), vec!["marketing"]);

    let hero = target.component("hero").unwrap();
    assert_eq!(hero.component_group_uuid, groups[0].uuid);
    assert_eq!(hero.internal_tag_ids, vec![tags[0].id]);
    let whitelist = &hero.schema.as_ref().unwrap()["body"]["component_group_whitelist"];
    assert_eq!(whitelist, &json!([groups[0].uuid.clone()]));

    let presets = target.presets();
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].name, "Dark");
    assert_eq!(presets[0].component_id, hero.id);
    assert_eq!(hero.preset_id, presets[0].id);
}

#[tokio::test]
async fn test_repeated_migration_is_idempotent() {
    let source = source_space();
    let target = Arc::new(FakeSpace::new(TARGET));
    let out = TempDir::new().unwrap();
    let client = client_for(&target);

    pull_all(&source, &out).await;
    push::run(&push_options(&out), &client, &RequestContext::new()).await;
    let components = target.components();
    let presets = target.presets();
    let creates = target.count(Method::Post, Resource::Components);

    let second = push::run(&push_options(&out), &client, &RequestContext::new()).await;

    assert!(second.error.is_none(), "{:?}", second.error);
    assert_eq!(second.report.updated, vec!["hero".to_string(), "teaser".to_string()]);
    assert!(second.report.created.is_empty());
    assert_eq!(target.components(), components);
    assert_eq!(target.presets(), presets);
    assert_eq!(target.count(Method::Post, Resource::Components), creates);
    assert_eq!(target.count(Method::Post, Resource::ComponentGroups), 1);
    assert_eq!(target.count(Method::Post, Resource::InternalTags), 1);
}

#[tokio::test]
async fn test_existing_target_entities_are_reused() {
    let source = source_space();
    let target = Arc::new(FakeSpace::new(TARGET));
    let layout = target.seed_group("Layout");
    target.seed_tag("MARKETING");
    let out = TempDir::new().unwrap();

    pull_all(&source, &out).await;
    let outcome = push::run(&push_options(&out), &client_for(&target), &RequestContext::new()).await;

    assert!(outcome.error.is_none(), "{:?}", outcome.error);
    assert_eq!(target.count(Method::Post, Resource::ComponentGroups), 0);
    assert_eq!(target.count(Method::Post, Resource::InternalTags), 0);
    assert_eq!(target.component("hero").unwrap().component_group_uuid, layout.uuid);
}

#[tokio::test]
async fn test_pulled_file_keeps_unmodelled_attributes() {
    let source = Arc::new(FakeSpace::new(SOURCE));
    let mut component = Component {
        name: "card".into(),
        schema: json!({}).as_object().cloned(),
        ..Component::default()
    };
    component.extras.insert("color".into(), json!("#ff0000"));
    component.extras.insert("is_nestable".into(), json!(true));
    source.seed_component(component);
    let out = TempDir::new().unwrap();

    pull_all(&source, &out).await;
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join(format!("card-{}.json", SOURCE))).unwrap())
            .unwrap();

    assert_eq!(written["color"], "#ff0000");
    assert_eq!(written["is_nestable"], true);

    let target = Arc::new(FakeSpace::new(TARGET));
    push::run(&push_options(&out), &client_for(&target), &RequestContext::new()).await;
    assert_eq!(target.component("card").unwrap().extras["color"], "#ff0000");
}
