//! Mutation throttle for directory calls
//!
//! The directory service enforces its own rate limits; blowing through them
//! turns a whole pass into a burst of `RateLimited` failures. The limiter
//! bounds in-flight mutations with a semaphore and enforces a minimum spacing
//! between call starts.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Throttle configuration
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Maximum mutations in flight at once
    pub max_inflight: usize,
    /// Minimum spacing between mutation starts
    pub min_interval: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_inflight: 4,
            min_interval: Duration::from_millis(50),
        }
    }
}

/// Throttles grant/revoke calls to stay within the directory's quota
pub struct MutationLimiter {
    semaphore: Semaphore,
    last_start: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl MutationLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_inflight.max(1)),
            last_start: Arc::new(Mutex::new(None)),
            min_interval: config.min_interval,
        }
    }

    /// Wait until a mutation may start. The returned permit must be held for
    /// the duration of the call.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        // The semaphore is never closed while the limiter is alive
        let permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("limiter semaphore closed"),
        };

        if !self.min_interval.is_zero() {
            let mut last = self.last_start.lock().await;
            let now = Instant::now();
            if let Some(prev) = *last {
                let next_allowed = prev + self.min_interval;
                if next_allowed > now {
                    tokio::time::sleep(next_allowed - now).await;
                }
            }
            *last = Some(Instant::now());
        }

        permit
    }
}
