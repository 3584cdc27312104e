//! Management API gateway
//!
//! [`Client`] turns one logical operation into as many HTTP attempts as the
//! [`RetryPolicy`] allows. Each attempt first takes a token from the space's
//! read or write bucket, and every response feeds back into that bucket's
//! rate.

use std::sync::Arc;

use backoff::backoff::Backoff;
use sbx_limiter::{Access, MAX_RPS, MIN_RPS, NUDGE_DOWN, NUDGE_UP, SpaceId, SpaceLimiter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
use crate::types::{Component, ComponentGroup, InternalTag, Preset, SpaceOptions};
use crate::{ApiError, Result};

/// Default management API endpoint
pub const DEFAULT_BASE_URL: &str = "https://mapi.storyblok.com/v1";

/// User agent sent with every request
pub const USER_AGENT: &str = "sbx-cli";

/// Builder for [`Client`]
pub struct ClientBuilder {
    token: String,
    base_url: String,
    transport: Option<Arc<dyn Transport>>,
    limiter: Option<Arc<SpaceLimiter>>,
    retry: RetryPolicy,
}

impl ClientBuilder {
    /// Override the API endpoint; blank values are ignored
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn limiter(mut self, limiter: Arc<SpaceLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the client, creating a `reqwest` transport if none was given
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        Ok(Client {
            transport,
            base_url: self.base_url,
            token: self.token,
            limiter: self.limiter,
            retry: self.retry,
        })
    }
}

/// Rate-limited, retrying client for the management API
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    base_url: String,
    token: String,
    limiter: Option<Arc<SpaceLimiter>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("has_token", &self.has_token())
            .field("limiter", &self.limiter.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

/// One logical operation, independent of attempts
struct Call {
    method: Method,
    space: SpaceId,
    path: String,
    payload: Option<Value>,
}

impl Call {
    fn get(space: SpaceId, path: String) -> Self {
        Self {
            method: Method::Get,
            space,
            path,
            payload: None,
        }
    }

    fn write(method: Method, space: SpaceId, path: String, payload: Option<Value>) -> Self {
        Self {
            method,
            space,
            path,
            payload,
        }
    }
}

/// Wrap an entity in its envelope key, e.g. `{"component": {..}}`
fn envelope<T: Serialize>(key: &str, value: &T) -> Result<Value> {
    let value = serde_json::to_value(value).map_err(|e| ApiError::Encode(e.to_string()))?;
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Ok(Value::Object(map))
}

/// Decode a success body; an empty body yields the default value
fn decode_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

mod envelopes {
    use serde::Deserialize;

    use crate::types::{Component, ComponentGroup, InternalTag, Preset, SpaceOptions};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct ComponentList {
        pub components: Vec<Component>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct ComponentOne {
        pub component: Component,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct GroupList {
        pub component_groups: Vec<ComponentGroup>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct GroupOne {
        pub component_group: ComponentGroup,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct PresetList {
        pub presets: Vec<Preset>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct PresetOne {
        pub preset: Preset,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct TagList {
        pub internal_tags: Vec<InternalTag>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct TagOne {
        pub internal_tag: InternalTag,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct SpaceOne {
        pub space: SpaceOptions,
    }
}

impl Client {
    /// Start building a client authenticated with `token`
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            transport: None,
            limiter: None,
            retry: RetryPolicy::default(),
        }
    }

    /// A copy of this client using a different token
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..self.clone()
        }
    }

    /// Whether a non-blank token is configured
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    pub fn limiter(&self) -> Option<&Arc<SpaceLimiter>> {
        self.limiter.as_ref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn nudge(&self, space: SpaceId, access: Access, delta: f64) {
        if let Some(limiter) = &self.limiter {
            limiter.nudge(space, access, delta, MIN_RPS, MAX_RPS);
        }
    }

    fn prepare(&self, call: &Call, token: &str, body: Option<Vec<u8>>) -> ApiRequest {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Authorization".to_string(), token.to_string()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        ApiRequest {
            method: call.method,
            base_url: self.base_url.clone(),
            path: call.path.clone(),
            headers,
            body,
        }
    }

    async fn send_once(&self, ctx: &RequestContext, request: ApiRequest) -> Result<ApiResponse> {
        tokio::select! {
            biased;
            _ = ctx.cancel_token().cancelled() => Err(ApiError::Cancelled),
            outcome = self.transport.send(request) => {
                outcome.map_err(|e| ApiError::Transport(e.to_string()))
            }
        }
    }

    /// Run one logical operation through the retry loop.
    async fn execute<T: DeserializeOwned + Default>(&self, ctx: &RequestContext, call: Call) -> Result<T> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(ApiError::MissingToken);
        }

        let body = call
            .payload
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::Encode(e.to_string()))?;

        let access = call.method.access();
        let attempts = self.retry.attempts();
        let mut backoff = self.retry.backoff();
        let mut last_error = ApiError::InvalidRequest("no attempt was made".to_string());

        for attempt in 1..=attempts {
            if ctx.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            if let Some(limiter) = &self.limiter {
                limiter.acquire(call.space, access, ctx.cancel_token()).await?;
            }

            tracing::debug!(method = %call.method, path = %call.path, attempt, "sending request");
            let request = self.prepare(&call, token, body.clone());

            last_error = match self.send_once(ctx, request).await {
                Ok(response) if response.is_success() => {
                    self.nudge(call.space, access, NUDGE_UP);
                    return decode_body(&response.body);
                }
                Ok(response) => {
                    let error = ApiError::from_response(response.status, &response.body);
                    if error.is_rate_limited() {
                        self.nudge(call.space, access, NUDGE_DOWN);
                        ctx.counters().record_rate_limit();
                        tracing::warn!(method = %call.method, path = %call.path, attempt, "rate limited");
                    } else if response.status >= 500 {
                        ctx.counters().record_server_error();
                        tracing::warn!(
                            method = %call.method,
                            path = %call.path,
                            attempt,
                            status = response.status,
                            "server error"
                        );
                    } else {
                        return Err(error);
                    }
                    error
                }
                Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                Err(error) => {
                    tracing::warn!(method = %call.method, path = %call.path, attempt, %error, "transport failure");
                    error
                }
            };

            if attempt == attempts {
                break;
            }

            let Some(delay) = backoff.next_backoff() else {
                break;
            };
            tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(last_error)
    }

    /// Delete a preset
    pub async fn delete_preset(&self, ctx: &RequestContext, space: SpaceId, preset_id: u64) -> Result<()> {
        let path = format!("/spaces/{}/presets/{}", space, preset_id);
        let _: Value = self
            .execute(ctx, Call::write(Method::Delete, space, path, None))
            .await?;
        Ok(())
    }

    /// List every component of a space
    pub async fn list_components(&self, ctx: &RequestContext, space: SpaceId) -> Result<Vec<Component>> {
        let path = format!("/spaces/{}/components", space);
        let list: envelopes::ComponentList = self.execute(ctx, Call::get(space, path)).await?;
        Ok(list.components)
    }

    /// Fetch one component by ID
    pub async fn get_component(&self, ctx: &RequestContext, space: SpaceId, component_id: u64) -> Result<Component> {
        let path = format!("/spaces/{}/components/{}", space, component_id);
        let one: envelopes::ComponentOne = self.execute(ctx, Call::get(space, path)).await?;
        Ok(one.component)
    }

    pub async fn create_component(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        component: &Component,
    ) -> Result<Component> {
        let path = format!("/spaces/{}/components", space);
        let payload = envelope("component", component)?;
        let one: envelopes::ComponentOne = self
            .execute(ctx, Call::write(Method::Post, space, path, Some(payload)))
            .await?;
        Ok(one.component)
    }

    pub async fn update_component(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        component_id: u64,
        component: &Component,
    ) -> Result<Component> {
        let path = format!("/spaces/{}/components/{}", space, component_id);
        let payload = envelope("component", component)?;
        let one: envelopes::ComponentOne = self
            .execute(ctx, Call::write(Method::Put, space, path, Some(payload)))
            .await?;
        Ok(one.component)
    }

    pub async fn list_component_groups(&self, ctx: &RequestContext, space: SpaceId) -> Result<Vec<ComponentGroup>> {
        let path = format!("/spaces/{}/component_groups", space);
        let list: envelopes::GroupList = self.execute(ctx, Call::get(space, path)).await?;
        Ok(list.component_groups)
    }

    pub async fn create_component_group(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        group: &ComponentGroup,
    ) -> Result<ComponentGroup> {
        let path = format!("/spaces/{}/component_groups", space);
        let payload = envelope("component_group", group)?;
        let one: envelopes::GroupOne = self
            .execute(ctx, Call::write(Method::Post, space, path, Some(payload)))
            .await?;
        Ok(one.component_group)
    }

    pub async fn list_presets(&self, ctx: &RequestContext, space: SpaceId) -> Result<Vec<Preset>> {
        let path = format!("/spaces/{}/presets", space);
        let list: envelopes::PresetList = self.execute(ctx, Call::get(space, path)).await?;
        Ok(list.presets)
    }

    pub async fn create_preset(&self, ctx: &RequestContext, space: SpaceId, preset: &Preset) -> Result<Preset> {
        let path = format!("/spaces/{}/presets", space);
        let payload = envelope("preset", preset)?;
        let one: envelopes::PresetOne = self
            .execute(ctx, Call::write(Method::Post, space, path, Some(payload)))
            .await?;
        Ok(one.preset)
    }

    /// Replace an existing preset; `preset.id` must be set
    pub async fn update_preset(&self, ctx: &RequestContext, space: SpaceId, preset: &Preset) -> Result<Preset> {
        if preset.id == 0 {
            return Err(ApiError::InvalidRequest("preset ID is required for update".to_string()));
        }
        let path = format!("/spaces/{}/presets/{}", space, preset.id);
        let payload = envelope("preset", preset)?;
        let one: envelopes::PresetOne = self
            .execute(ctx, Call::write(Method::Put, space, path, Some(payload)))
            .await?;
        Ok(one.preset)
    }

    pub async fn list_internal_tags(&self, ctx: &RequestContext, space: SpaceId) -> Result<Vec<InternalTag>> {
        let path = format!("/spaces/{}/internal_tags", space);
        let list: envelopes::TagList = self.execute(ctx, Call::get(space, path)).await?;
        Ok(list.internal_tags)
    }

    pub async fn create_internal_tag(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        tag: &InternalTag,
    ) -> Result<InternalTag> {
        let path = format!("/spaces/{}/internal_tags", space);
        let payload = envelope("internal_tag", tag)?;
        let one: envelopes::TagOne = self
            .execute(ctx, Call::write(Method::Post, space, path, Some(payload)))
            .await?;
        Ok(one.internal_tag)
    }

    /// Fetch general space settings such as plan level and languages
    pub async fn get_space(&self, ctx: &RequestContext, space: SpaceId) -> Result<SpaceOptions> {
        let path = format!("/spaces/{}", space);
        let one: envelopes::SpaceOne = self.execute(ctx, Call::get(space, path)).await?;
        Ok(one.space)
    }
}
