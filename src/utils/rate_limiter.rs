use std::sync::Arc;

use rand::Rng;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};

/// RateLimiter spaces out requests to the upstream site.
///
/// Every permit waits at least `min_delay` after the previous one was handed
/// out, plus a random jitter of up to `max_jitter`.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    max_jitter: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_delay_ms: u64) -> Self {
        RateLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            min_delay: Duration::from_millis(min_delay_ms),
            max_jitter: Duration::ZERO,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_jitter(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter = Duration::from_millis(max_jitter_ms);
        self
    }

    /// No spacing at all, for tests and local mocks.
    pub fn unlimited() -> Self {
        Self::new(Semaphore::MAX_PERMITS, 0)
    }

    /// Acquire a permit to make a request.
    /// The permit is released when the returned guard is dropped.
    pub async fn acquire(&self) -> RateLimitGuard {
        let permit = self.semaphore.clone().acquire_owned().await.ok();

        let mut last_request = self.last_request.lock().await;
        let spacing = self.min_delay + self.jitter();
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < spacing {
                let wait_time = spacing - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }
        *last_request = Some(Instant::now());
        drop(last_request);

        RateLimitGuard { _permit: permit }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let millis = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }
}

pub struct RateLimitGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        tracing::trace!("Rate limit permit released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn enforces_minimum_spacing() {
        let limiter = RateLimiter::new(1, 500);

        let started = Instant::now();
        drop(limiter.acquire().await);
        drop(limiter.acquire().await);

        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn guard_holds_the_permit() {
        let limiter = RateLimiter::new(1, 0);

        let guard = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);
        drop(guard);
        assert_eq!(limiter.available_permits(), 1);
    }
}
