use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Politeness policy applied before every external request.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Guarantees at least `delay` between the starts of consecutive requests,
/// across every task sharing this value.
pub struct FixedDelay {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        FixedDelay {
            delay,
            last_request: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.delay {
                tokio::time::sleep(self.delay - since).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// No pause at all.
pub struct Unthrottled;

#[async_trait]
impl Throttle for Unthrottled {
    async fn pause(&self) {}
}

/// `FixedDelay` for a positive delay, `Unthrottled` for zero.
pub fn for_delay(delay: Duration) -> Arc<dyn Throttle> {
    if delay.is_zero() {
        Arc::new(Unthrottled)
    } else {
        Arc::new(FixedDelay::new(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_is_immediate() {
        let t = FixedDelay::new(Duration::from_millis(500));
        let start = Instant::now();
        t.pause().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_requests_are_spaced() {
        let t = FixedDelay::new(Duration::from_millis(500));
        let start = Instant::now();
        t.pause().await;
        t.pause().await;
        t.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_after_idle_period() {
        let t = FixedDelay::new(Duration::from_millis(500));
        t.pause().await;
        tokio::time::sleep(Duration::from_millis(800)).await;
        let before = Instant::now();
        t.pause().await;
        assert!(before.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_never_waits() {
        let t = for_delay(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            t.pause().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        let t = for_delay(Duration::from_millis(200));
        t.pause().await;
        t.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
