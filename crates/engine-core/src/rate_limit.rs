use std::{collections::VecDeque, time::Duration};
use tokio::{
    sync::Mutex,
    time::{Instant, sleep_until},
};
use tracing::debug;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window limiter: at most `limit` admissions in any rolling `window`.
///
/// The admission log sits behind a tokio mutex, which queues lockers in FIFO
/// order. A waiter keeps the lock while it sleeps for the oldest admission to
/// age out, so later callers cannot overtake it.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        let limit = limit.max(1) as usize;
        RateLimiter {
            limit,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, DEFAULT_WINDOW)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Suspends until a slot is free, then records the admission.
    pub async fn acquire(&self) {
        let mut admitted = self.admitted.lock().await;

        loop {
            let now = Instant::now();
            self.evict_expired(&mut admitted, now);

            if admitted.len() < self.limit {
                admitted.push_back(now);
                return;
            }

            if let Some(&oldest) = admitted.front() {
                let ready_at = oldest + self.window;
                debug!(
                    wait_ms = ready_at.saturating_duration_since(now).as_millis() as u64,
                    "Rate limit reached, waiting for a slot"
                );
                sleep_until(ready_at).await;
            }
        }
    }

    /// Slots that could be taken right now without waiting.
    pub async fn available(&self) -> usize {
        let mut admitted = self.admitted.lock().await;
        self.evict_expired(&mut admitted, Instant::now());
        self.limit - admitted.len()
    }

    fn evict_expired(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = admitted.front() {
            if now.duration_since(oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }
}
