//! Verification token value generation and comparison.
//! Used by: verification::memory, verification::sqlite.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

/// 256 bits of entropy, 43 base64url characters.
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationToken {
    pub identifier: String,
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn new(identifier: &str, value: String, issued_at: DateTime<Utc>, ttl: Duration) -> Result<Self> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::Internal(format!("token ttl {ttl} overflows the calendar")))?;
        Ok(Self {
            identifier: identifier.to_owned(),
            value,
            issued_at,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.value.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

pub fn generate_value() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Internal(format!("entropy source unavailable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_url_safe_and_fixed_length() -> Result<()> {
        let value = generate_value()?;
        assert_eq!(value.len(), 43);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        Ok(())
    }

    #[test]
    fn values_do_not_repeat() -> Result<()> {
        let a = generate_value()?;
        let b = generate_value()?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn expiry_is_inclusive_of_deadline() -> Result<()> {
        let now = Utc::now();
        let token = VerificationToken::new("a@x.com", generate_value()?, now, Duration::minutes(15))?;
        assert!(!token.is_expired(now));
        assert!(!token.is_expired(now + Duration::minutes(15) - Duration::seconds(1)));
        assert!(token.is_expired(now + Duration::minutes(15)));
        Ok(())
    }

    #[test]
    fn matches_only_exact_value() -> Result<()> {
        let token = VerificationToken::new("a@x.com", generate_value()?, Utc::now(), Duration::minutes(1))?;
        let value = token.value.clone();
        assert!(token.matches(&value));
        assert!(!token.matches(&value[..42]));
        assert!(!token.matches(""));
        assert!(!token.matches(&format!("{value}x")));
        Ok(())
    }

    #[test]
    fn overflowing_ttl_is_an_error() -> Result<()> {
        let ttl = Duration::try_days(1_000_000_000).ok_or_else(|| Error::Internal("ttl".into()))?;
        let result = VerificationToken::new("a@x.com", generate_value()?, Utc::now(), ttl);
        assert!(matches!(result, Err(Error::Internal(_))));
        Ok(())
    }
}
