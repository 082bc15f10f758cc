//! Shared application state.

use std::sync::Arc;

use chrono::Duration;

use crate::accounts::sqlite::AccountStore;
use crate::config::{Config, TokenBackend};
use crate::error::{Error, Result};
use crate::mailer::Mailer;
use crate::ratelimit::{RateLimitConfig, RateLimiter};
use crate::session::sign::SessionIssuer;
use crate::telemetry::Metrics;
use crate::verification::TokenStore;
use crate::verification::memory::MemoryTokenStore;
use crate::verification::sqlite::SqliteTokenStore;

pub struct AppStateInner {
    pub tokens: Arc<dyn TokenStore>,
    pub accounts: AccountStore,
    pub sessions: SessionIssuer,
    pub mailer: Option<Mailer>,
    pub rate_limiter: RateLimiter,
    pub metrics: Metrics,
    pub verify_link_base: String,
    pub bcrypt_cost: u32,
}

pub type AppState = Arc<AppStateInner>;

struct StateBuilder {
    tokens: Arc<dyn TokenStore>,
    accounts: AccountStore,
}

impl StateBuilder {
    fn build(self, config: &Config) -> Result<AppState> {
        let session_ttl = Duration::try_hours(config.session_ttl_hours)
            .ok_or_else(|| Error::InvalidInput(format!("SESSION_TTL_HOURS out of range: {}", config.session_ttl_hours)))?;
        if config.mail.is_none() {
            tracing::warn!("MAIL_API_URL/MAIL_API_TOKEN not set; confirmation links will only be logged");
        }

        Ok(Arc::new(AppStateInner {
            tokens: self.tokens,
            accounts: self.accounts,
            sessions: SessionIssuer::new(&config.jwt_secret, session_ttl),
            mailer: config.mail.as_ref().map(Mailer::new),
            rate_limiter: RateLimiter::new(RateLimitConfig {
                verify_per_min: config.verify_rate_per_min,
                resend_per_min: config.resend_rate_per_min,
            }),
            metrics: Metrics::new(),
            verify_link_base: config.verify_link_base.clone(),
            bcrypt_cost: config.bcrypt_cost,
        }))
    }
}

pub fn build_state(config: &Config) -> Result<AppState> {
    let ttl = Duration::try_seconds(config.token_ttl_secs)
        .ok_or_else(|| Error::InvalidInput(format!("TOKEN_TTL_SECS out of range: {}", config.token_ttl_secs)))?;
    let tokens: Arc<dyn TokenStore> = match config.token_backend {
        TokenBackend::Memory => Arc::new(MemoryTokenStore::new(ttl, config.token_store_capacity)),
        TokenBackend::Sqlite => Arc::new(SqliteTokenStore::open(&config.database_path, ttl)?),
    };
    tracing::info!(backend = ?config.token_backend, ttl_secs = config.token_ttl_secs, "verification store ready");

    StateBuilder {
        tokens,
        accounts: AccountStore::open(&config.database_path)?,
    }
    .build(config)
}

#[cfg(test)]
pub fn build_test_state() -> Result<AppState> {
    build_test_state_with(Arc::new(MemoryTokenStore::new(Duration::minutes(15), 1_000)))
}

#[cfg(test)]
pub fn build_test_state_with(tokens: Arc<dyn TokenStore>) -> Result<AppState> {
    StateBuilder {
        tokens,
        accounts: AccountStore::open_in_memory()?,
    }
    .build(&Config::for_tests())
}

/// Test state with a custom config, e.g. a mailer pointed at a dead endpoint.
#[cfg(test)]
pub fn build_test_state_from(config: &Config) -> Result<AppState> {
    StateBuilder {
        tokens: Arc::new(MemoryTokenStore::new(Duration::minutes(15), 1_000)),
        accounts: AccountStore::open_in_memory()?,
    }
    .build(config)
}
