//! Environment-driven configuration.
//! Used by: main, state.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::verification::memory::DEFAULT_MAX_CAPACITY;

/// One week.
pub const MAX_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;
/// One year.
pub const MAX_SESSION_TTL_HOURS: i64 = 365 * 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBackend {
    Memory,
    Sqlite,
}

impl FromStr for TokenBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::InvalidInput(format!("unknown TOKEN_STORE: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_token: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: String,
    pub token_backend: TokenBackend,
    pub token_ttl_secs: i64,
    pub token_store_capacity: usize,
    pub sweep_interval_secs: u64,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub verify_link_base: String,
    pub mail: Option<MailConfig>,
    pub verify_rate_per_min: u32,
    pub resend_rate_per_min: u32,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or(default).to_owned();

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| Error::InvalidInput("JWT_SECRET must be set".into()))?
            .to_owned();

        let mail = match (get("MAIL_API_URL"), get("MAIL_API_TOKEN")) {
            (Some(api_url), Some(api_token)) => Some(MailConfig {
                api_url: api_url.to_owned(),
                api_token: api_token.to_owned(),
                from_email: text("MAIL_FROM_EMAIL", "no-reply@example.com"),
                from_name: text("MAIL_FROM_NAME", "Verigate"),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: text("BIND_ADDR", "0.0.0.0:5050"),
            database_path: text("DATABASE_PATH", "verigate.db"),
            token_backend: get("TOKEN_STORE").unwrap_or("memory").parse()?,
            token_ttl_secs: parse_bounded(get("TOKEN_TTL_SECS"), "TOKEN_TTL_SECS", 900, MAX_TOKEN_TTL_SECS)?,
            token_store_capacity: parse_positive(get("TOKEN_STORE_CAPACITY"), "TOKEN_STORE_CAPACITY", DEFAULT_MAX_CAPACITY)?,
            sweep_interval_secs: parse_positive(get("SWEEP_INTERVAL_SECS"), "SWEEP_INTERVAL_SECS", 60)?,
            jwt_secret,
            session_ttl_hours: parse_bounded(get("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", 48, MAX_SESSION_TTL_HOURS)?,
            verify_link_base: text("VERIFY_LINK_BASE", "http://localhost:3000/verify-email"),
            mail,
            verify_rate_per_min: parse_positive(get("VERIFY_RATE_PER_MIN"), "VERIFY_RATE_PER_MIN", 10)?,
            resend_rate_per_min: parse_positive(get("RESEND_RATE_PER_MIN"), "RESEND_RATE_PER_MIN", 3)?,
            bcrypt_cost: parse_bcrypt_cost(get("BCRYPT_COST"))?,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_path: ":memory:".into(),
            token_backend: TokenBackend::Memory,
            token_ttl_secs: 900,
            token_store_capacity: 1_000,
            sweep_interval_secs: 60,
            jwt_secret: "test-secret-test-secret-test-secret".into(),
            session_ttl_hours: 48,
            verify_link_base: "http://localhost:3000/verify-email".into(),
            mail: None,
            verify_rate_per_min: 10,
            resend_rate_per_min: 3,
            bcrypt_cost: 4,
        }
    }
}

fn parse_positive<T>(raw: Option<&str>, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(Error::InvalidInput(format!("{key} must be a positive integer, got {raw:?}"))),
    }
}

fn parse_bounded<T>(raw: Option<&str>, key: &str, default: T, max: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default + std::fmt::Display,
{
    let value = parse_positive(raw, key, default)?;
    if value > max {
        return Err(Error::InvalidInput(format!("{key} must be at most {max}, got {value}")));
    }
    Ok(value)
}

fn parse_bcrypt_cost(raw: Option<&str>) -> Result<u32> {
    let cost = parse_positive(raw, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
    if !(4..=31).contains(&cost) {
        return Err(Error::InvalidInput(format!("BCRYPT_COST must be 4-31, got {cost}")));
    }
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply() -> Result<()> {
        let config = Config::from_vars(vars(&[("JWT_SECRET", "s")]))?;
        assert_eq!(config.bind_addr, "0.0.0.0:5050");
        assert_eq!(config.token_backend, TokenBackend::Memory);
        assert_eq!(config.token_ttl_secs, 900);
        assert_eq!(config.session_ttl_hours, 48);
        assert!(config.mail.is_none());
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        Ok(())
    }

    #[test]
    fn missing_jwt_secret_rejected() {
        assert!(matches!(Config::from_vars(vars(&[])), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn mail_requires_url_and_token() -> Result<()> {
        let partial = Config::from_vars(vars(&[("JWT_SECRET", "s"), ("MAIL_API_URL", "https://mail")]))?;
        assert!(partial.mail.is_none());

        let full = Config::from_vars(vars(&[
            ("JWT_SECRET", "s"),
            ("MAIL_API_URL", "https://mail"),
            ("MAIL_API_TOKEN", "t"),
        ]))?;
        let mail = full.mail.ok_or_else(|| Error::Internal("mail missing".into()))?;
        assert_eq!(mail.from_email, "no-reply@example.com");
        Ok(())
    }

    #[test]
    fn invalid_numbers_rejected() {
        for value in ["0", "-5", "ten"] {
            let result = Config::from_vars(vars(&[("JWT_SECRET", "s"), ("TOKEN_TTL_SECS", value)]));
            assert!(result.is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn ttl_upper_bounds_enforced() {
        for (key, value) in [
            ("TOKEN_TTL_SECS", "10000000000000"),
            ("TOKEN_TTL_SECS", "604801"),
            ("SESSION_TTL_HOURS", "9223372036854775807"),
            ("SESSION_TTL_HOURS", "8761"),
        ] {
            let result = Config::from_vars(vars(&[("JWT_SECRET", "s"), (key, value)]));
            assert!(matches!(result, Err(Error::InvalidInput(_))), "{key}={value} should be rejected");
        }

        let at_max = Config::from_vars(vars(&[
            ("JWT_SECRET", "s"),
            ("TOKEN_TTL_SECS", "604800"),
            ("SESSION_TTL_HOURS", "8760"),
        ]));
        assert!(at_max.is_ok_and(|c| c.token_ttl_secs == MAX_TOKEN_TTL_SECS
            && c.session_ttl_hours == MAX_SESSION_TTL_HOURS));
    }

    #[test]
    fn bcrypt_cost_bounds_enforced() {
        let result = Config::from_vars(vars(&[("JWT_SECRET", "s"), ("BCRYPT_COST", "3")]));
        assert!(result.is_err());
        let result = Config::from_vars(vars(&[("JWT_SECRET", "s"), ("BCRYPT_COST", "10")]));
        assert_eq!(result.map(|c| c.bcrypt_cost).ok(), Some(10));
    }

    #[test]
    fn sqlite_backend_selectable() -> Result<()> {
        let config = Config::from_vars(vars(&[("JWT_SECRET", "s"), ("TOKEN_STORE", "SQLite")]))?;
        assert_eq!(config.token_backend, TokenBackend::Sqlite);
        assert!("redis".parse::<TokenBackend>().is_err());
        Ok(())
    }
}
