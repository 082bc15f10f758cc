//! In-memory verification token store with per-token expiry timers.
//! Used by: state, handlers::register, handlers::verify.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::task::AbortHandle;

use crate::error::{Error, Result, lock_err};
use crate::verification::clock::{Clock, SystemClock};
use crate::verification::token::{VerificationToken, generate_value};
use crate::verification::{TokenStore, validate_identifier};

pub const DEFAULT_MAX_CAPACITY: usize = 100_000;

pub struct MemoryTokenStore {
    shared: Arc<Shared>,
}

struct Shared {
    entries: Mutex<HashMap<Box<str>, Entry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_capacity: usize,
    next_generation: AtomicU64,
}

struct Entry {
    token: VerificationToken,
    generation: u64,
    timer: Option<AbortHandle>,
}

// Whichever path removes an entry (verify, supersede, sweep, timer) also
// cancels its pending timer.
impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl MemoryTokenStore {
    pub fn new(ttl: Duration, max_capacity: usize) -> Self {
        Self::with_clock(ttl, max_capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, max_capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                clock,
                ttl,
                max_capacity,
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Spawns a timer that removes the entry once the TTL elapses. Without a
    /// tokio runtime no timer is armed and expiry falls back to the clock
    /// check in `verify` plus `purge_expired`.
    fn schedule_expiry(&self, identifier: &str, generation: u64) -> Option<AbortHandle> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let after = self.shared.ttl.to_std().unwrap_or_default();
        let shared = Arc::downgrade(&self.shared);
        let identifier = identifier.to_owned();
        let task = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(&identifier, generation);
            }
        });
        Some(task.abort_handle())
    }
}

impl Shared {
    /// Timer callback. A timer belonging to a superseded entry must not
    /// touch its replacement, hence the generation check.
    fn expire(&self, identifier: &str, generation: u64) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "verification token expiry skipped");
                return;
            }
        };
        if entries.get(identifier).is_some_and(|e| e.generation == generation) {
            if let Some(mut entry) = entries.remove(identifier) {
                // Aborting ourselves is harmless but pointless.
                entry.timer = None;
            }
            tracing::debug!(identifier = %identifier, "verification token expired");
        }
    }

    fn purge_expired_inner(entries: &mut HashMap<Box<str>, Entry>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.token.is_expired(now));
        before - entries.len()
    }
}

impl TokenStore for MemoryTokenStore {
    fn issue(&self, identifier: &str) -> Result<String> {
        validate_identifier(identifier)?;
        let value = generate_value()?;
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.shared.entries.lock().map_err(lock_err("verification"))?;
        let now = self.shared.clock.now();
        if !entries.contains_key(identifier) && entries.len() >= self.shared.max_capacity {
            Shared::purge_expired_inner(&mut entries, now);
            if entries.len() >= self.shared.max_capacity {
                return Err(Error::ServiceUnavailable("verification store at capacity".into()));
            }
        }

        let token = VerificationToken::new(identifier, value.clone(), now, self.shared.ttl)?;
        let entry = Entry {
            token,
            generation,
            timer: self.schedule_expiry(identifier, generation),
        };
        if entries.insert(identifier.into(), entry).is_some() {
            tracing::debug!(identifier = %identifier, "previous verification token superseded");
        }
        Ok(value)
    }

    fn verify(&self, identifier: &str, presented: &str) -> Result<bool> {
        validate_identifier(identifier)?;
        let mut entries = self.shared.entries.lock().map_err(lock_err("verification"))?;
        let now = self.shared.clock.now();

        let Some(entry) = entries.get(identifier) else {
            return Ok(false);
        };
        if entry.token.is_expired(now) {
            entries.remove(identifier);
            return Ok(false);
        }
        if !entry.token.matches(presented) {
            return Ok(false);
        }
        entries.remove(identifier);
        Ok(true)
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.shared.entries.lock().map_err(lock_err("verification"))?;
        let now = self.shared.clock.now();
        Ok(Shared::purge_expired_inner(&mut entries, now))
    }

    fn len(&self) -> Result<usize> {
        let entries = self.shared.entries.lock().map_err(lock_err("verification"))?;
        Ok(entries.len())
    }
}
