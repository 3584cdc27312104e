//! Per-run request context: cancellation plus retry statistics

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Counts of retried responses, shared by every request of a run
#[derive(Debug, Default)]
pub struct RetryCounters {
    rate_limited: AtomicU64,
    server_errors: AtomicU64,
    total: AtomicU64,
}

impl RetryCounters {
    /// Record a 429 response
    pub fn record_rate_limit(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a 5xx response
    pub fn record_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    pub fn server_errors(&self) -> u64 {
        self.server_errors.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Carried by every gateway call.
///
/// Cloning shares both the cancellation token and the counters.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    counters: Arc<RetryCounters>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing cancellation token
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            counters: Arc::default(),
        }
    }

    /// A context cancelled together with this one (or on its own), sharing counters
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn counters(&self) -> &RetryCounters {
        &self.counters
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
