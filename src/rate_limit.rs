//! Single-permit async gate with a minimum spacing between calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::cache::{Clock, SystemClock};
use crate::errors::{EngineError, Result};

pub struct RateLimiter {
    gate: Semaphore,
    last_call: Mutex<Option<Instant>>,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
}

/// Held for the duration of one upstream request.
pub struct RateLimitPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate: Semaphore::new(1),
            last_call: Mutex::new(None),
            min_interval,
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for the gate, then until `min_interval` has passed since the
    /// previous call started.
    pub async fn acquire(&self) -> Result<RateLimitPermit<'_>> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| EngineError::Configuration("rate limiter gate closed".into()))?;

        let last = *self.last_call.lock();
        if let Some(last) = last {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *self.last_call.lock() = Some(self.clock.now());

        Ok(RateLimitPermit { _permit: permit })
    }
}
