//! [`FakeSpace`]: an in-memory space answering management API requests.
//!
//! Entities get sequential IDs, groups get `uuid-<id>` UUIDs, duplicate
//! names are rejected with `422`, and updates only replace the attributes
//! they send, the way the real API behaves. Every request is
//! recorded so tests can count calls per method and resource.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use sbx_api::{
    ApiRequest, ApiResponse, Client, Component, ComponentGroup, InternalTag, Method, Preset,
    SpaceOptions, Transport, TransportError, normalize_name,
};
use sbx_limiter::{LimiterConfig, SpaceLimiter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Token accepted by [`client_for`]
pub const TEST_TOKEN: &str = "test-token";

/// The collection a request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Components,
    ComponentGroups,
    Presets,
    InternalTags,
    Space,
}

impl Resource {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "components" => Some(Self::Components),
            "component_groups" => Some(Self::ComponentGroups),
            "presets" => Some(Self::Presets),
            "internal_tags" => Some(Self::InternalTags),
            _ => None,
        }
    }
}

/// One request as seen by the fake
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub resource: Resource,
    pub id: Option<u64>,
    pub body: Option<Value>,
}

struct Failure {
    method: Method,
    resource: Resource,
    status: u16,
    remaining: usize,
}

#[derive(Default)]
struct State {
    last_id: u64,
    components: Vec<Component>,
    groups: Vec<ComponentGroup>,
    presets: Vec<Preset>,
    tags: Vec<InternalTag>,
    options: SpaceOptions,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// An in-memory management API space
pub struct FakeSpace {
    id: u64,
    latency: Option<Duration>,
    state: Mutex<State>,
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<Vec<Failure>>,
}

impl FakeSpace {
    pub fn new(id: u64) -> Self {
        let options = SpaceOptions {
            id,
            name: format!("space-{}", id),
            plan_level: 1,
            ..SpaceOptions::default()
        };
        Self {
            id,
            latency: None,
            state: Mutex::new(State {
                last_id: 100,
                options,
                ..State::default()
            }),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Delay every response, so concurrent callers overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_plan_level(self, plan_level: i64) -> Self {
        self.state().options.plan_level = plan_level;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Answer the next `times` matching requests with `status`
    pub fn fail(&self, method: Method, resource: Resource, status: u16, times: usize) {
        self.failures.lock().unwrap().push(Failure {
            method,
            resource,
            status,
            remaining: times,
        });
    }

    pub fn seed_component(&self, mut component: Component) -> Component {
        let mut state = self.state();
        if component.id == 0 {
            component.id = state.next_id();
        }
        state.components.push(component.clone());
        component
    }

    pub fn seed_group(&self, name: &str) -> ComponentGroup {
        let mut state = self.state();
        let id = state.next_id();
        let group = ComponentGroup {
            id,
            uuid: format!("uuid-{}", id),
            name: name.to_string(),
            ..ComponentGroup::default()
        };
        state.groups.push(group.clone());
        group
    }

    pub fn seed_tag(&self, name: &str) -> InternalTag {
        let mut state = self.state();
        let tag = InternalTag {
            id: state.next_id(),
            ..InternalTag::component(name)
        };
        state.tags.push(tag.clone());
        tag
    }

    pub fn seed_preset(&self, mut preset: Preset) -> Preset {
        let mut state = self.state();
        if preset.id == 0 {
            preset.id = state.next_id();
        }
        state.presets.push(preset.clone());
        preset
    }

    pub fn components(&self) -> Vec<Component> {
        self.state().components.clone()
    }

    /// Look up a component by case-insensitive name
    pub fn component(&self, name: &str) -> Option<Component> {
        let key = normalize_name(name);
        self.state().components.iter().find(|c| c.key() == key).cloned()
    }

    pub fn groups(&self) -> Vec<ComponentGroup> {
        self.state().groups.clone()
    }

    pub fn presets(&self) -> Vec<Preset> {
        self.state().presets.clone()
    }

    pub fn tags(&self) -> Vec<InternalTag> {
        self.state().tags.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests received for `method` on `resource`
    pub fn count(&self, method: Method, resource: Resource) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.resource == resource)
            .count()
    }

    /// Number of write requests of any kind
    pub fn writes(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method != Method::Get)
            .count()
    }

    fn take_failure(&self, method: Method, resource: Resource) -> Option<u16> {
        let mut failures = self.failures.lock().unwrap();
        let failure = failures
            .iter_mut()
            .find(|f| f.method == method && f.resource == resource && f.remaining > 0)?;
        failure.remaining -= 1;
        Some(failure.status)
    }

    /// Split `/spaces/{id}/{resource}[/{entity}]`
    fn route(&self, path: &str) -> Option<(Resource, Option<u64>)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["spaces", space] if space.parse::<u64>().ok()? == self.id => Some((Resource::Space, None)),
            ["spaces", space, resource] if space.parse::<u64>().ok()? == self.id => {
                Some((Resource::from_segment(resource)?, None))
            }
            ["spaces", space, resource, id] if space.parse::<u64>().ok()? == self.id => {
                Some((Resource::from_segment(resource)?, Some(id.parse().ok()?)))
            }
            _ => None,
        }
    }

    fn handle(&self, method: Method, resource: Resource, id: Option<u64>, body: Option<Value>) -> ApiResponse {
        let mut guard = self.state();
        let state = &mut *guard;

        match (method, resource, id) {
            (Method::Get, Resource::Space, None) => respond(200, json!({"space": state.options})),

            (Method::Get, Resource::Components, None) => respond(200, json!({"components": state.components})),
            (Method::Get, Resource::Components, Some(id)) => match state.components.iter().find(|c| c.id == id) {
                Some(component) => respond(200, json!({"component": component})),
                None => not_found(),
            },
            (Method::Post, Resource::Components, None) => {
                let Some(mut component) = payload::<Component>(body, "component") else {
                    return unprocessable("component payload is missing");
                };
                if state.components.iter().any(|c| c.key() == component.key()) {
                    return unprocessable("Name has already been taken");
                }
                component.id = state.next_id();
                state.components.push(component.clone());
                respond(201, json!({"component": component}))
            }
            (Method::Put, Resource::Components, Some(id)) => {
                let Some(slot) = state.components.iter_mut().find(|c| c.id == id) else {
                    return not_found();
                };
                let Some(mut component) = merged(&*slot, body, "component") else {
                    return unprocessable("component payload is missing");
                };
                component.id = id;
                *slot = component.clone();
                respond(200, json!({"component": component}))
            }

            (Method::Get, Resource::ComponentGroups, None) => {
                respond(200, json!({"component_groups": state.groups}))
            }
            (Method::Post, Resource::ComponentGroups, None) => {
                let Some(mut group) = payload::<ComponentGroup>(body, "component_group") else {
                    return unprocessable("component group payload is missing");
                };
                if state.groups.iter().any(|g| normalize_name(&g.name) == normalize_name(&group.name)) {
                    return unprocessable("Name has already been taken");
                }
                group.id = state.next_id();
                group.uuid = format!("uuid-{}", group.id);
                state.groups.push(group.clone());
                respond(201, json!({"component_group": group}))
            }

            (Method::Get, Resource::Presets, None) => respond(200, json!({"presets": state.presets})),
            (Method::Post, Resource::Presets, None) => {
                let Some(mut preset) = payload::<Preset>(body, "preset") else {
                    return unprocessable("preset payload is missing");
                };
                preset.id = state.next_id();
                state.presets.push(preset.clone());
                respond(201, json!({"preset": preset}))
            }
            (Method::Put, Resource::Presets, Some(id)) => {
                let Some(slot) = state.presets.iter_mut().find(|p| p.id == id) else {
                    return not_found();
                };
                let Some(mut preset) = merged(&*slot, body, "preset") else {
                    return unprocessable("preset payload is missing");
                };
                preset.id = id;
                *slot = preset.clone();
                respond(200, json!({"preset": preset}))
            }
            (Method::Delete, Resource::Presets, Some(id)) => {
                let before = state.presets.len();
                state.presets.retain(|p| p.id != id);
                if state.presets.len() == before {
                    return not_found();
                }
                ApiResponse::new(204, Vec::new())
            }

            (Method::Get, Resource::InternalTags, None) => respond(200, json!({"internal_tags": state.tags})),
            (Method::Post, Resource::InternalTags, None) => {
                let Some(mut tag) = payload::<InternalTag>(body, "internal_tag") else {
                    return unprocessable("internal tag payload is missing");
                };
                if state.tags.iter().any(|t| normalize_name(&t.name) == normalize_name(&tag.name)) {
                    return unprocessable("Name has already been taken");
                }
                tag.id = state.next_id();
                state.tags.push(tag.clone());
                respond(201, json!({"internal_tag": tag}))
            }

            _ => ApiResponse::new(405, json!({"message": "method not allowed"}).to_string()),
        }
    }
}

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse::new(status, body.to_string())
}

fn not_found() -> ApiResponse {
    respond(404, json!({"message": "not found"}))
}

fn unprocessable(message: &str) -> ApiResponse {
    respond(422, json!({"message": message}))
}

/// Unwrap the entity under its envelope key
fn payload<T: DeserializeOwned>(body: Option<Value>, key: &str) -> Option<T> {
    let mut body = body?;
    let inner = body.get_mut(key)?.take();
    serde_json::from_value(inner).ok()
}

/// Overlay the sent attributes on `current`; attributes left out keep their value
fn merged<T: Serialize + DeserializeOwned>(current: &T, body: Option<Value>, key: &str) -> Option<T> {
    let mut body = body?;
    let Value::Object(incoming) = body.get_mut(key)?.take() else {
        return None;
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(current) else {
        return None;
    };
    merged.extend(incoming);
    serde_json::from_value(Value::Object(merged)).ok()
}

#[async_trait]
impl Transport for FakeSpace {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let body = request
            .body
            .as_deref()
            .map(serde_json::from_slice::<Value>)
            .transpose()
            .map_err(|e| TransportError(format!("fake space received invalid JSON: {}", e)))?;

        let Some((resource, id)) = self.route(&request.path) else {
            return Ok(not_found());
        };

        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            resource,
            id,
            body: body.clone(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if request.header("authorization").is_none_or(|t| t.trim().is_empty()) {
            return Ok(respond(401, json!({"message": "Unauthorized"})));
        }

        if let Some(status) = self.take_failure(request.method, resource) {
            return Ok(respond(status, json!({"message": "scripted failure"})));
        }

        Ok(self.handle(request.method, resource, id, body))
    }
}

/// A client talking to `space`, without rate limiting
pub fn client_for(space: &Arc<FakeSpace>) -> Client {
    let transport: Arc<dyn Transport> = space.clone();
    Client::builder(TEST_TOKEN)
        .base_url("https://fake.test/v1")
        .transport(transport)
        .build()
        .unwrap()
}

/// A client talking to `space` through a limiter built from `config`
pub fn limited_client_for(space: &Arc<FakeSpace>, config: LimiterConfig) -> (Client, Arc<SpaceLimiter>) {
    let limiter = Arc::new(SpaceLimiter::new(config));
    let transport: Arc<dyn Transport> = space.clone();
    let client = Client::builder(TEST_TOKEN)
        .base_url("https://fake.test/v1")
        .transport(transport)
        .limiter(Arc::clone(&limiter))
        .build()
        .unwrap();
    (client, limiter)
}
