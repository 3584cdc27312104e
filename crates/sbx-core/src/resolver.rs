//! Component groups and internal tags referenced by components
//!
//! Components refer to groups and tags by name; the API wants UUIDs and IDs.
//! [`DependencyResolver`] maps names to remote identifiers, creating missing
//! entities on demand. Each name is created at most once per run no matter
//! how many workers ask for it concurrently.

use sbx_api::{ApiError, Client, ComponentGroup, InternalTag, RequestContext, SpaceId};
use serde_json::{Map, Value};

use crate::Result;
use crate::flight::SingleFlight;
use crate::snapshot::Snapshot;

/// Schema field key holding allowed group references
pub const GROUP_WHITELIST_KEY: &str = "component_group_whitelist";

/// Name to remote identifier caches for one destination space
pub struct DependencyResolver {
    client: Client,
    space: SpaceId,
    groups: SingleFlight<String>,
    tags: SingleFlight<u64>,
}

impl DependencyResolver {
    pub fn new(client: Client, space: SpaceId) -> Self {
        Self {
            client,
            space,
            groups: SingleFlight::new(),
            tags: SingleFlight::new(),
        }
    }

    /// Seed both caches from the destination's existing entities.
    ///
    /// Groups without a UUID and tags without an ID are ignored.
    pub fn seeded(self, snapshot: &Snapshot) -> Self {
        for group in &snapshot.groups {
            if !group.name.trim().is_empty() && !group.uuid.is_empty() {
                self.groups.seed(&group.name, group.uuid.clone());
            }
        }
        for tag in &snapshot.tags {
            if !tag.name.trim().is_empty() && tag.id > 0 {
                self.tags.seed(&tag.name, tag.id);
            }
        }
        self
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains(name)
    }

    /// UUID of an already known group
    pub fn lookup_group(&self, name: &str) -> Option<String> {
        self.groups.get(name)
    }

    /// Resolve a group name to its UUID, creating the group if needed.
    ///
    /// Blank names resolve to `None`.
    pub async fn ensure_group(&self, ctx: &RequestContext, name: &str) -> Result<Option<String>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let client = self.client.clone();
        let ctx = ctx.clone();
        let space = self.space;
        let payload = ComponentGroup::named(name);

        let uuid = self
            .groups
            .get_or_create(name, move || async move {
                tracing::info!(group = %payload.name, "creating component group");
                let created = client.create_component_group(&ctx, space, &payload).await?;
                if created.uuid.is_empty() {
                    return Err(ApiError::Decode(format!(
                        "component group {:?} was created without a UUID",
                        payload.name
                    )));
                }
                Ok(created.uuid)
            })
            .await?;

        Ok(Some(uuid))
    }

    /// Resolve tag names to IDs in input order, creating missing tags.
    ///
    /// Blank names are skipped.
    pub async fn ensure_tags(&self, ctx: &RequestContext, names: &[String]) -> Result<Vec<u64>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let client = self.client.clone();
            let ctx = ctx.clone();
            let space = self.space;
            let payload = InternalTag::component(name);

            let id = self
                .tags
                .get_or_create(name, move || async move {
                    tracing::info!(tag = %payload.name, "creating internal tag");
                    let created = client.create_internal_tag(&ctx, space, &payload).await?;
                    Ok(created.id)
                })
                .await?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Replace group names in every field's group whitelist with UUIDs.
    ///
    /// Only groups already known are mapped; unknown names are kept as they
    /// are. Blank and non-string entries are dropped.
    pub fn rewrite_group_whitelist(&self, schema: &mut Map<String, Value>) {
        for field in schema.values_mut() {
            let Some(Value::Array(entries)) = field
                .as_object_mut()
                .and_then(|field| field.get_mut(GROUP_WHITELIST_KEY))
            else {
                continue;
            };

            let mapped: Vec<Value> = entries
                .iter()
                .filter_map(Value::as_str)
                .filter(|entry| !entry.is_empty())
                .map(|entry| Value::String(self.lookup_group(entry).unwrap_or_else(|| entry.to_string())))
                .collect();
            *entries = mapped;
        }
    }
}
