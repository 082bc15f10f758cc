//! Single-use email verification tokens: issue, verify, expire.
//! Used by: handlers, state.

pub mod clock;
pub mod memory;
pub mod sqlite;
pub mod sweep;
pub mod token;

use crate::error::{Error, Result};

const MAX_IDENTIFIER_LEN: usize = 254;

/// A store owning the identifier -> token mapping.
///
/// `verify` returns `Ok(false)` for every non-matching case (absent, expired,
/// already consumed, wrong value) so callers cannot tell them apart.
pub trait TokenStore: Send + Sync {
    /// Issues a fresh token for `identifier`, superseding any previous one.
    fn issue(&self, identifier: &str) -> Result<String>;

    /// Consumes the live token for `identifier` if it equals `presented`.
    fn verify(&self, identifier: &str, presented: &str) -> Result<bool>;

    /// Removes every expired entry and returns how many were removed.
    fn purge_expired(&self) -> Result<usize>;

    fn len(&self) -> Result<usize>;
}

pub(crate) fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(Error::InvalidInput("identifier is empty".into()));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidInput("identifier exceeds 254 bytes".into()));
    }
    if identifier.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidInput("identifier contains control characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_email_accepted() {
        assert!(validate_identifier("a@x.com").is_ok());
    }

    #[test]
    fn empty_and_blank_rejected() {
        assert!(matches!(validate_identifier(""), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_identifier("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn oversized_rejected() {
        let long = format!("{}@x.com", "a".repeat(250));
        assert!(validate_identifier(&long).is_err());
    }

    #[test]
    fn control_chars_rejected() {
        assert!(validate_identifier("a@x.com\n").is_err());
    }
}
