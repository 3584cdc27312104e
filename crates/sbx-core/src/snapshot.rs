//! The destination's current entities, fetched once per run

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use sbx_api::{Client, Component, ComponentGroup, InternalTag, Preset, RequestContext, SpaceId, normalize_name};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub components: Vec<Component>,
    pub groups: Vec<ComponentGroup>,
    pub presets: Vec<Preset>,
    pub tags: Vec<InternalTag>,
}

impl Snapshot {
    /// Fetch all four collections concurrently.
    ///
    /// The first failure aborts the fetches still in flight.
    pub async fn fetch(client: &Client, ctx: &RequestContext, space: SpaceId) -> Result<Self> {
        let (components, groups, presets, tags) = tokio::try_join!(
            client.list_components(ctx, space),
            client.list_component_groups(ctx, space),
            client.list_presets(ctx, space),
            client.list_internal_tags(ctx, space),
        )?;

        tracing::info!(
            "Target space has {} components, {} groups, {} presets, {} tags",
            components.len(),
            groups.len(),
            presets.len(),
            tags.len()
        );

        Ok(Self {
            components,
            groups,
            presets,
            tags,
        })
    }

    /// Remote presets owned by the component with `component_id`
    pub fn presets_of(&self, component_id: u64) -> impl Iterator<Item = &Preset> {
        self.presets
            .iter()
            .filter(move |preset| preset.component_id == component_id)
    }
}

/// Remote components by case-insensitive name, kept current during a run
#[derive(Debug, Default)]
pub struct ComponentCache {
    entries: Mutex<HashMap<String, Component>>,
}

impl ComponentCache {
    pub fn from_components(components: &[Component]) -> Self {
        let cache = Self::default();
        for component in components {
            cache.set(component.clone());
        }
        cache
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Component>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<Component> {
        self.entries().get(&normalize_name(name)).cloned()
    }

    /// Store `component` under its own name; nameless components are ignored
    pub fn set(&self, component: Component) {
        let key = component.key();
        if key.is_empty() {
            return;
        }
        self.entries().insert(key, component);
    }

    /// Store `component` under its new name, dropping `old_name`
    pub fn replace(&self, old_name: &str, component: Component) {
        let mut entries = self.entries();
        entries.remove(&normalize_name(old_name));
        let key = component.key();
        if !key.is_empty() {
            entries.insert(key, component);
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_api::Method;
    use sbx_test_utils::{FakeSpace, Resource, client_for};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_collects_every_collection() {
        let space = Arc::new(FakeSpace::new(5));
        space.seed_group("layout");
        space.seed_tag("marketing");
        let hero = space.seed_component(Component {
            name: "hero".into(),
            ..Component::default()
        });
        space.seed_preset(Preset {
            name: "Dark".into(),
            component_id: hero.id,
            ..Preset::default()
        });

        let snapshot = Snapshot::fetch(&client_for(&space), &RequestContext::new(), 5).await.unwrap();

        assert_eq!(snapshot.components.len(), 1);
        assert_eq!(snapshot.groups.len(), 1);
        assert_eq!(snapshot.tags.len(), 1);
        assert_eq!(snapshot.presets_of(hero.id).count(), 1);
        assert_eq!(snapshot.presets_of(hero.id + 1000).count(), 0);
    }

    #[test]
    fn test_component_cache_rename() {
        let cache = ComponentCache::from_components(&[Component {
            id: 1,
            name: "Hero".into(),
            ..Component::default()
        }]);
        assert_eq!(cache.get("hero").map(|c| c.id), Some(1));

        cache.replace(
            "hero",
            Component {
                id: 1,
                name: "hero-v2".into(),
                ..Component::default()
            },
        );
        assert!(cache.get("hero").is_none());
        assert_eq!(cache.get("HERO-V2").map(|c| c.id), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_fails_fast() {
        let space = Arc::new(FakeSpace::new(5));
        space.fail(Method::Get, Resource::Presets, 403, 1);

        let err = Snapshot::fetch(&client_for(&space), &RequestContext::new(), 5).await.unwrap_err();

        assert_eq!(err.outcome(), crate::Outcome::ApiFailure);
    }
}
