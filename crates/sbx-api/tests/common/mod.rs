use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sbx_api::{ApiRequest, ApiResponse, Client, Transport, TransportError};
use sbx_limiter::{LimiterConfig, SpaceLimiter};
use tokio::time::Instant;

pub type Scripted = Result<ApiResponse, TransportError>;

/// Replays canned responses in order, then answers `200 {}`
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<(Instant, ApiRequest)>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.seen.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().unwrap().push((Instant::now(), request));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::new(200, "{}")))
    }
}

pub fn status(code: u16, body: &str) -> Scripted {
    Ok(ApiResponse::new(code, body.as_bytes().to_vec()))
}

pub fn client(transport: Arc<ScriptedTransport>) -> Client {
    Client::builder("secret-token")
        .base_url("https://api.test/v1")
        .transport(transport)
        .build()
        .unwrap()
}

pub fn limited_client(transport: Arc<ScriptedTransport>, config: LimiterConfig) -> (Client, Arc<SpaceLimiter>) {
    let limiter = Arc::new(SpaceLimiter::new(config));
    let client = Client::builder("secret-token")
        .base_url("https://api.test/v1")
        .transport(transport)
        .limiter(Arc::clone(&limiter))
        .build()
        .unwrap();
    (client, limiter)
}
