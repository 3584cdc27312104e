//! Management API gateway for sbx
//!
//! This crate covers everything between a sync run and the wire:
//!
//! - **types**: entity payloads with round-tripping of unknown fields
//! - **client**: one logical operation per call, retried with exponential
//!   backoff and throttled by [`sbx_limiter::SpaceLimiter`]
//! - **context**: cancellation and retry counters carried by every call
//! - **transport**: the HTTP seam, backed by `reqwest` in production
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sbx_api::{Client, RequestContext};
//! use sbx_limiter::SpaceLimiter;
//!
//! let client = Client::builder(token)
//!     .limiter(Arc::new(SpaceLimiter::default()))
//!     .build()?;
//! let ctx = RequestContext::new();
//! let components = client.list_components(&ctx, 12345).await?;
//! println!("{} rate-limited retries", ctx.counters().rate_limited());
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, USER_AGENT};
pub use context::{RequestContext, RetryCounters};
pub use error::{ApiError, Result, decode_error_message};
pub use retry::RetryPolicy;
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport, TransportError};
pub use types::{
    COMPONENT_TAG_TYPE, Component, ComponentGroup, InternalTag, LangOption, Preset, SpaceOptions,
    normalize_name,
};

pub use sbx_limiter::SpaceId;
