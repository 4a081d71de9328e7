//! Per-service call throttling shared by all workers of a run.

use crate::config::{LimitSettings, ServiceLimit};
use crate::error::{Service, ServiceError, ServiceResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::trace;

/// Bounds concurrent calls to one service and spaces out their starts.
#[derive(Debug)]
pub struct RateLimiter {
    service: Service,
    permits: Semaphore,
    min_interval: Duration,
    next_start: Mutex<Option<Instant>>,
}

/// Held for the duration of one external call.
#[derive(Debug)]
pub struct LimiterPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl RateLimiter {
    pub fn new(service: Service, max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            service,
            permits: Semaphore::new(max_concurrent.max(1)),
            min_interval,
            next_start: Mutex::new(None),
        }
    }

    pub fn from_settings(service: Service, limit: &ServiceLimit) -> Self {
        Self::new(
            service,
            limit.max_concurrent,
            Duration::from_millis(limit.min_interval_ms),
        )
    }

    pub fn service(&self) -> Service {
        self.service
    }

    /// Calls currently allowed to start without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a call slot.
    pub async fn acquire(&self) -> ServiceResult<LimiterPermit<'_>> {
        let permit = self.permits.acquire().await.map_err(|e| {
            ServiceError::permanent(self.service, format!("rate limiter closed: {}", e))
        })?;

        if !self.min_interval.is_zero() {
            let mut next_start = self.next_start.lock().await;
            let now = Instant::now();
            if let Some(at) = *next_start {
                if at > now {
                    trace!("{} throttled for {:?}", self.service, at - now);
                    tokio::time::sleep_until(at).await;
                }
            }
            *next_start = Some(Instant::now() + self.min_interval);
        }

        Ok(LimiterPermit { _permit: permit })
    }
}

/// The limiters one run shares across its workers.
#[derive(Debug, Clone)]
pub struct ServiceLimiters {
    pub transcriber: Arc<RateLimiter>,
    pub extractor: Arc<RateLimiter>,
}

impl ServiceLimiters {
    pub fn from_settings(settings: &LimitSettings) -> Self {
        Self {
            transcriber: Arc::new(RateLimiter::from_settings(
                Service::Transcriber,
                &settings.transcriber,
            )),
            extractor: Arc::new(RateLimiter::from_settings(
                Service::Extractor,
                &settings.extractor,
            )),
        }
    }
}

impl Default for ServiceLimiters {
    fn default() -> Self {
        Self::from_settings(&LimitSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrency_bound() {
        let limiter = RateLimiter::new(Service::Transcriber, 2, Duration::ZERO);

        let a = limiter.acquire().await.unwrap();
        let _b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);

        drop(a);
        assert_eq!(limiter.available(), 1);
    }

    #[test]
    fn test_waiter_woken_on_release() {
        let limiter = RateLimiter::new(Service::Transcriber, 1, Duration::ZERO);
        let held = tokio_test::block_on(limiter.acquire()).unwrap();

        let mut waiting = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(waiting.poll());

        drop(held);
        assert!(waiting.is_woken());
        let permit = tokio_test::assert_ready!(waiting.poll());
        assert!(permit.is_ok());
    }

    #[tokio::test]
    async fn test_zero_is_clamped_to_one() {
        let limiter = RateLimiter::new(Service::Extractor, 0, Duration::ZERO);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_interval_spaces_starts() {
        let limiter = RateLimiter::new(Service::Extractor, 4, Duration::from_millis(500));
        let start = Instant::now();

        let _a = limiter.acquire().await.unwrap();
        let _b = limiter.acquire().await.unwrap();
        let _c = limiter.acquire().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }
}
