use governor::clock::Clock;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timestamps of recent calls inside one window.
#[derive(Debug, Default)]
struct SlidingWindow {
    calls: VecDeque<Instant>,
}

impl SlidingWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.calls.front() {
            if now.duration_since(*oldest) >= window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a call if there is room, otherwise return how long until the oldest call expires.
    fn try_record(&mut self, now: Instant, limit: usize, window: Duration) -> Option<Duration> {
        self.prune(now, window);
        if self.calls.len() < limit {
            self.calls.push_back(now);
            return None;
        }
        let oldest = self.calls.front().copied().unwrap_or(now);
        Some(window.saturating_sub(now.duration_since(oldest)))
    }
}

/// Outbound limiter for the language model: callers wait for a free slot.
pub struct CallRateLimiter {
    max_calls: usize,
    window: Duration,
    slack: Duration,
    state: Mutex<SlidingWindow>,
}

impl CallRateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            slack: Duration::from_secs(1),
            state: Mutex::new(SlidingWindow::default()),
        }
    }

    pub fn per_minute(max_calls: usize) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                match state.try_record(Instant::now(), self.max_calls, self.window) {
                    None => return,
                    Some(until_free) => until_free + self.slack,
                }
            };
            warn!("Rate limit reached, waiting {:?} before the next model call", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Inbound limiter for the HTTP API: over-limit requests are rejected per client key.
pub struct ApiRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl ApiRateLimiter {
    /// Allow a burst of `max_requests`, refilling one request every `window / max_requests`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .map(|quota| quota.allow_burst(burst))
            .unwrap_or_else(|| Quota::per_second(burst));
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// `Err(seconds)` tells the caller when to retry.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        // Forget clients whose state has fully replenished
        self.limiter.retain_recent();

        match self.limiter.check_key(&client.to_string()) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(governor::clock::DefaultClock::default().now());
                debug!(client, ?wait, "API rate limit exceeded");
                Err(wait.as_secs_f64().ceil().max(1.0) as u64)
            }
        }
    }
}
