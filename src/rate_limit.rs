use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Windows are pruned once this many keys are tracked
const PRUNE_THRESHOLD: usize = 1024;

/// Admission check used by the transport before calling into the engine
#[async_trait]
pub trait RateLimiter: std::fmt::Debug + Send + Sync {
    /// Counts one request against `key`
    ///
    /// # Returns
    /// `true` while at most `limit` requests were counted in the current window
    async fn hit(&self, key: &str, limit: u32, window: Duration) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.length
    }
}

/// In-process fixed-window counter per key
#[derive(Debug, Default)]
pub struct FixedWindowRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn hit(&self, key: &str, limit: u32, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, w| !w.expired(now));
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            length: window,
            count: 0,
        });
        if entry.expired(now) {
            *entry = Window {
                started: now,
                length: window,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);
        entry.count <= limit
    }
}
