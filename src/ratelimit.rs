//! Per-identifier rate limits on verification and resend attempts.
//! Used by: handlers::verify, handlers::register, state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{Error, Result, lock_err};

const WINDOW: Duration = Duration::from_secs(60);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<RateLimitState>,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub verify_per_min: u32,
    pub resend_per_min: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            verify_per_min: 10,
            resend_per_min: 3,
        }
    }
}

struct RateLimitState {
    verify_counts: HashMap<Box<str>, WindowCounter>,
    resend_counts: HashMap<Box<str>, WindowCounter>,
    last_cleanup: Instant,
}

struct WindowCounter {
    count: u32,
    window_start: Instant,
}

impl WindowCounter {
    fn new() -> Self {
        Self { count: 0, window_start: Instant::now() }
    }

    fn increment(&mut self, limit: u32, window: Duration) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) > window {
            self.count = 0;
            self.window_start = now;
        }
        self.count += 1;
        self.count <= limit
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RateLimitState {
                verify_counts: HashMap::new(),
                resend_counts: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
        }
    }

    pub fn check_verify(&self, identifier: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(lock_err("rate limiter"))?;
        Self::maybe_cleanup(&mut state);

        let counter = state.verify_counts
            .entry(identifier.into())
            .or_insert_with(WindowCounter::new);

        if !counter.increment(self.config.verify_per_min, WINDOW) {
            return Err(Error::RateLimited(format!(
                "rate limit: {} verification attempts per {}s",
                self.config.verify_per_min,
                WINDOW.as_secs()
            )));
        }
        Ok(())
    }

    pub fn check_resend(&self, identifier: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(lock_err("rate limiter"))?;
        Self::maybe_cleanup(&mut state);

        let counter = state.resend_counts
            .entry(identifier.into())
            .or_insert_with(WindowCounter::new);

        if !counter.increment(self.config.resend_per_min, WINDOW) {
            return Err(Error::RateLimited(format!(
                "rate limit: {} verification emails per {}s",
                self.config.resend_per_min,
                WINDOW.as_secs()
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn tracked_identifiers(&self) -> Result<usize> {
        let state = self.state.lock().map_err(lock_err("rate limiter"))?;
        Ok(state.verify_counts.len() + state.resend_counts.len())
    }

    fn maybe_cleanup(state: &mut RateLimitState) {
        let now = Instant::now();
        if now.duration_since(state.last_cleanup) > CLEANUP_INTERVAL {
            let cutoff = now - WINDOW;
            state.verify_counts.retain(|_, c| c.window_start > cutoff);
            state.resend_counts.retain(|_, c| c.window_start > cutoff);
            state.last_cleanup = now;
        }
    }
}
