//! Adaptive request admission for sbx
//!
//! Every destination space gets two independent token buckets, one for read
//! traffic and one for write traffic. Buckets refill lazily from elapsed time
//! and their refill rate can be nudged up or down as the API reports success
//! or throttling, so a long run drifts toward the space's real allowance.
//!
//! ```ignore
//! use sbx_limiter::{Access, LimiterConfig, SpaceLimiter};
//! use tokio_util::sync::CancellationToken;
//!
//! let limiter = SpaceLimiter::new(LimiterConfig::default());
//! limiter.acquire(12345, Access::Write, &CancellationToken::new()).await?;
//! ```

pub mod bucket;
pub mod config;
pub mod error;
pub mod space;

pub use bucket::TokenBucket;
pub use config::{LimiterConfig, MAX_RPS, MIN_RPS, NUDGE_DOWN, NUDGE_UP};
pub use error::{Error, Result};
pub use space::{Access, SpaceId, SpaceLimiter};
