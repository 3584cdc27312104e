//! Per-space read/write buckets

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::bucket::TokenBucket;
use crate::config::LimiterConfig;
use crate::Result;

/// Numeric identifier of a destination space
pub type SpaceId = u64;

/// Which bucket a request draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug)]
struct SpaceBuckets {
    read: TokenBucket,
    write: TokenBucket,
}

impl SpaceBuckets {
    fn bucket(&self, access: Access) -> &TokenBucket {
        match access {
            Access::Read => &self.read,
            Access::Write => &self.write,
        }
    }
}

/// Token buckets keyed by space.
///
/// Buckets are created on first use with the configured defaults and live
/// as long as the limiter.
#[derive(Debug)]
pub struct SpaceLimiter {
    config: LimiterConfig,
    spaces: Mutex<HashMap<SpaceId, Arc<SpaceBuckets>>>,
}

impl Default for SpaceLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

impl SpaceLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config: config.normalized(),
            spaces: Mutex::new(HashMap::new()),
        }
    }

    /// The effective configuration after normalization
    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    fn buckets(&self, space: SpaceId) -> Arc<SpaceBuckets> {
        let mut spaces = self.spaces.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        spaces
            .entry(space)
            .or_insert_with(|| {
                let burst = f64::from(self.config.burst);
                Arc::new(SpaceBuckets {
                    read: TokenBucket::new(self.config.read_rps, burst),
                    write: TokenBucket::new(self.config.write_rps, burst),
                })
            })
            .clone()
    }

    /// Wait for a token of the given kind for `space`.
    ///
    /// Returns [`crate::Error::Cancelled`] as soon as `cancel` fires.
    pub async fn acquire(&self, space: SpaceId, access: Access, cancel: &CancellationToken) -> Result<()> {
        let buckets = self.buckets(space);
        buckets.bucket(access).acquire(cancel).await
    }

    /// Adjust the refill rate of one bucket, clamped to `[min, max]`.
    pub fn nudge(&self, space: SpaceId, access: Access, delta: f64, min: f64, max: f64) {
        let rate = self.buckets(space).bucket(access).nudge(delta, min, max);
        tracing::trace!(space, %access, rate, "nudged rate limit");
    }

    /// Current refill rate of one bucket
    pub fn rate(&self, space: SpaceId, access: Access) -> f64 {
        self.buckets(space).bucket(access).rate()
    }
}
