//! bcrypt password hashing.
//! Used by: handlers::register, handlers::login.

use crate::error::Result;

pub fn hash_password(plain: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(plain, cost)?)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("hunter22", 4)?;
        assert!(verify_password(&hash, "hunter22"));
        assert!(!verify_password(&hash, "hunter23"));
        Ok(())
    }

    #[test]
    fn hash_embeds_cost() -> Result<()> {
        let hash = hash_password("correct horse", 5)?;
        assert!(hash.starts_with("$2b$05$"));
        Ok(())
    }

    #[test]
    fn cost_out_of_range_is_an_error() {
        assert!(matches!(hash_password("x", 2), Err(crate::error::Error::Password(_))));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("not-a-hash", "anything"));
    }
}
