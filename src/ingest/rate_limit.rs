//! Fixed-window per-client rate limiting.
//!
//! Entries expire lazily: an expired window is overwritten by the next
//! request from the same key. Nothing else removes entries, so key
//! cardinality is bounded only by the number of distinct clients seen.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Count a request from `key`; false once the quota for the window is used.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now >= entry.reset_at {
            *entry = Window {
                count: 0,
                reset_at: now + self.window,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Number of tracked keys, expired or not.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}
