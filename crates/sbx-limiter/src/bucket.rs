//! Lazily refilled token bucket

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Shortest sleep between two admission checks
pub const MIN_WAIT: Duration = Duration::from_millis(5);

/// A token bucket admitting one request per token.
///
/// Tokens are not topped up by a background task. Each acquisition computes
/// how many tokens accrued since the last refill (`elapsed * rps`), capped at
/// the burst capacity.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    rps: f64,
    burst: f64,
    tokens: f64,
    last: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let accrued = now.saturating_duration_since(self.last).as_secs_f64() * self.rps;
        if accrued <= 0.0 {
            return;
        }
        self.tokens = (self.tokens + accrued).min(self.burst);
        self.last = now;
    }
}

impl TokenBucket {
    /// Create a full bucket with the given refill rate and capacity
    pub fn new(rps: f64, burst: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                rps,
                burst,
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take a token if one is available.
    ///
    /// Returns `Err(wait)` with the time after which a token should have
    /// accrued at the current rate. The wait is never shorter than [`MIN_WAIT`].
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        let mut state = self.state();
        state.refill(Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }

        let needed = 1.0 - state.tokens;
        let rps = if state.rps <= 0.0 { 1.0 } else { state.rps };
        let wait = Duration::from_secs_f64(needed / rps);
        Err(wait.max(MIN_WAIT))
    }

    /// Wait until a token is available or `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let wait = match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            tracing::trace!(wait_ms = wait.as_millis() as u64, "waiting for rate limit token");

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Shift the refill rate by `delta`, clamped to `[min, max]`.
    pub fn nudge(&self, delta: f64, min: f64, max: f64) -> f64 {
        let mut state = self.state();
        state.rps = (state.rps + delta).clamp(min, max);
        state.rps
    }

    /// Current refill rate in tokens per second
    pub fn rate(&self) -> f64 {
        self.state().rps
    }

    /// Tokens available right now, after refilling
    pub fn available(&self) -> f64 {
        let mut state = self.state();
        state.refill(Instant::now());
        state.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_full_bucket_admits_burst_without_waiting() {
        let bucket = TokenBucket::new(7.0, 7.0);
        for _ in 0..7 {
            assert!(bucket.try_acquire().is_ok());
        }
        let wait = bucket.try_acquire().unwrap_err();
        assert!(wait >= Duration::from_secs_f64(1.0 / 7.0) - Duration::from_micros(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_acquire_waits_for_refill() {
        let bucket = TokenBucket::new(7.0, 7.0);
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..7 {
            bucket.acquire(&cancel).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        bucket.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(142));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_burst() {
        let bucket = TokenBucket::new(7.0, 3.0);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!((bucket.available() - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_never_below_minimum() {
        let bucket = TokenBucket::new(1000.0, 1.0);
        bucket.try_acquire().unwrap();
        let wait = bucket.try_acquire().unwrap_err();
        assert_eq!(wait, MIN_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_returns_error() {
        let bucket = TokenBucket::new(0.5, 1.0);
        let cancel = CancellationToken::new();
        bucket.acquire(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        assert_eq!(bucket.acquire(&cancel).await, Err(Error::Cancelled));
    }

    #[test]
    fn test_nudge_clamps_to_bounds() {
        let bucket = TokenBucket::new(7.0, 7.0);
        assert!((bucket.nudge(0.02, 1.0, 7.0) - 7.0).abs() < f64::EPSILON);
        assert!((bucket.nudge(-0.2, 1.0, 7.0) - 6.8).abs() < 1e-9);
        assert!((bucket.nudge(-100.0, 1.0, 7.0) - 1.0).abs() < f64::EPSILON);
    }
}
