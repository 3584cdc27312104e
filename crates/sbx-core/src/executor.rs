//! Concurrent execution of sync plans
//!
//! Plans flow through a bounded job queue to a fixed pool of workers. A
//! worker owns one whole plan at a time and runs its steps strictly in order:
//! group, whitelist, tags, component, presets, default preset.
//!
//! The first failing plan halts the run. The queue is closed so no further
//! plan starts, plans already running on other workers finish, and the error
//! is returned next to the outcomes gathered so far. Writes already made are
//! left in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use sbx_api::{Client, Component, Preset, RequestContext, SpaceId};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_WORKERS;
use crate::planner::{PlanAction, SyncPlan};
use crate::resolver::DependencyResolver;
use crate::snapshot::ComponentCache;
use crate::{Error, Result};

/// Result of one successfully synced plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub index: usize,
    pub name: String,
    pub component_id: u64,
    pub presets: usize,
    pub created: bool,
}

/// Outcomes in plan order, plus the error that halted the run if any
#[derive(Debug, Default)]
pub struct Execution {
    pub outcomes: Vec<PlanOutcome>,
    pub error: Option<Error>,
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Executor {
    client: Client,
    space: SpaceId,
    resolver: Arc<DependencyResolver>,
    components: Arc<ComponentCache>,
    remote_presets: Vec<Preset>,
    workers: usize,
}

impl Executor {
    pub fn new(
        client: Client,
        space: SpaceId,
        resolver: Arc<DependencyResolver>,
        components: Arc<ComponentCache>,
        remote_presets: Vec<Preset>,
    ) -> Self {
        Self {
            client,
            space,
            resolver,
            components,
            remote_presets,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Cap the number of concurrent workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Workers used for `plans` plans: at most [`DEFAULT_WORKERS`], never
    /// more than plans, never zero
    pub fn worker_count(&self, plans: usize) -> usize {
        self.workers.clamp(1, DEFAULT_WORKERS).min(plans).max(1)
    }

    /// Run every plan and collect the outcomes
    pub async fn run(&self, ctx: &RequestContext, plans: Vec<SyncPlan>) -> Execution {
        if plans.is_empty() {
            return Execution::default();
        }

        let workers = self.worker_count(plans.len());
        tracing::debug!(plans = plans.len(), workers, "starting workers");

        let (jobs, queue) = async_channel::bounded::<SyncPlan>(workers);
        let halted = CancellationToken::new();
        let outcomes = Mutex::new(Vec::with_capacity(plans.len()));
        let failure: Mutex<Option<Error>> = Mutex::new(None);

        let producer = async move {
            for plan in plans {
                // Fails once a worker has closed the queue
                if jobs.send(plan).await.is_err() {
                    break;
                }
            }
        };

        let pool = futures::future::join_all((0..workers).map(|worker| {
            let queue = queue.clone();
            let halted = &halted;
            let outcomes = &outcomes;
            let failure = &failure;
            async move {
                while let Ok(plan) = queue.recv().await {
                    if halted.is_cancelled() {
                        break;
                    }
                    let name = plan.name().to_string();
                    match self.process(ctx, plan).await {
                        Ok(outcome) => {
                            if outcome.created {
                                tracing::info!("Created component {} (id={})", outcome.name, outcome.component_id);
                            } else {
                                tracing::info!("Updated component {} (id={})", outcome.name, outcome.component_id);
                            }
                            lock(outcomes).push(outcome);
                        }
                        Err(error) => {
                            tracing::warn!(worker, component = %name, %error, "component sync failed");
                            lock(failure).get_or_insert(error);
                            halted.cancel();
                            queue.close();
                            break;
                        }
                    }
                }
            }
        }));

        futures::future::join(producer, pool).await;

        let mut outcomes = outcomes.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        outcomes.sort_by_key(|outcome| outcome.index);
        let error = failure.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());

        Execution { outcomes, error }
    }

    /// Sync one component and its presets
    pub async fn process(&self, ctx: &RequestContext, plan: SyncPlan) -> Result<PlanOutcome> {
        let SyncPlan {
            index,
            mut component,
            action,
            presets,
            default_preset,
        } = plan;
        let desired_name = component.name.clone();
        let preset_count = presets.len();

        tracing::info!("Syncing component {}", desired_name);
        tracing::debug!(component = %desired_name, presets = preset_count, "preset candidates");

        let group = std::mem::take(&mut component.component_group_name);
        if let Some(uuid) = self.resolver.ensure_group(ctx, &group).await? {
            component.component_group_uuid = uuid;
        }

        if let Some(schema) = component.schema.as_mut() {
            self.resolver.rewrite_group_whitelist(schema);
        }

        component.internal_tag_ids = self.resolver.ensure_tags(ctx, &component.tag_names()).await?;
        component.preset_id = 0;

        let (synced, created) = match action {
            PlanAction::Create => (self.create(ctx, component, presets, default_preset.as_deref()).await?, true),
            PlanAction::Update { existing } => (
                self.update(ctx, &existing, component, presets, default_preset.as_deref())
                    .await?,
                false,
            ),
        };

        let name = if synced.name.is_empty() { desired_name } else { synced.name };
        Ok(PlanOutcome {
            index,
            name,
            component_id: synced.id,
            presets: preset_count,
            created,
        })
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        mut component: Component,
        presets: Vec<Preset>,
        default_preset: Option<&str>,
    ) -> Result<Component> {
        component.id = 0;
        let mut created = self.client.create_component(ctx, self.space, &component).await?;
        self.components.set(created.clone());

        let mut remote = Vec::with_capacity(presets.len());
        for mut preset in presets {
            preset.id = 0;
            preset.component_id = created.id;
            remote.push(self.client.create_preset(ctx, self.space, &preset).await?);
        }

        let default = default_preset.and_then(|name| remote.iter().find(|preset| preset.name.to_lowercase() == name));
        if let Some(target) = default {
            created.preset_id = target.id;
            created = self
                .client
                .update_component(ctx, self.space, created.id, &created)
                .await?;
            self.components.set(created.clone());
        }

        Ok(created)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        existing: &Component,
        mut component: Component,
        presets: Vec<Preset>,
        default_preset: Option<&str>,
    ) -> Result<Component> {
        component.id = existing.id;
        let mut updated = self
            .client
            .update_component(ctx, self.space, existing.id, &component)
            .await?;
        self.remember(existing, &updated);

        let mut remote: HashMap<String, Preset> = self
            .remote_presets
            .iter()
            .filter(|preset| preset.component_id == existing.id)
            .map(|preset| (preset.name.to_lowercase(), preset.clone()))
            .collect();

        for mut preset in presets {
            let key = preset.name.to_lowercase();
            preset.component_id = existing.id;
            let synced = match remote.get(&key) {
                Some(current) => {
                    preset.id = current.id;
                    self.client.update_preset(ctx, self.space, &preset).await?
                }
                None => {
                    preset.id = 0;
                    self.client.create_preset(ctx, self.space, &preset).await?
                }
            };
            remote.insert(key, synced);
        }

        if let Some(target) = default_preset.and_then(|name| remote.get(name))
            && target.id != existing.preset_id
        {
            component.preset_id = target.id;
            updated = self
                .client
                .update_component(ctx, self.space, existing.id, &component)
                .await?;
            self.remember(existing, &updated);
        }

        Ok(updated)
    }

    /// Keep the component cache keyed on the name the API returned
    fn remember(&self, existing: &Component, updated: &Component) {
        if updated.name.trim().is_empty() {
            return;
        }
        if existing.key() == updated.key() {
            self.components.set(updated.clone());
        } else {
            self.components.replace(&existing.name, updated.clone());
        }
    }
}
