use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Fixed-window request counter keyed by `(service, client_ip)`.
pub struct RateLimiter {
    window: Duration,
    limit: u32,
    hits: DashMap<String, (Instant, u32)>,
}

impl RateLimiter {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            window,
            limit,
            hits: DashMap::new(),
        }
    }

    /// Counts one request against the caller's window. Returns false once the
    /// window's budget is spent.
    pub fn allow(&self, service: &str, client_ip: &str) -> bool {
        let key = format!("{service}-{client_ip}");
        let now = Instant::now();

        let mut entry = self.hits.entry(key).or_insert((now, 0));
        let start = entry.value().0;
        let count = entry.value().1;

        if now.duration_since(start) > self.window {
            *entry = (now, 1);
            return true;
        }
        if count < self.limit {
            *entry = (start, count + 1);
            return true;
        }
        false
    }
}
