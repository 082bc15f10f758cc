//! HS256 session credential signing.
//! Used by: handlers::verify, handlers::login.

use chrono::Duration;
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::error::Result;
use crate::session::claims::SessionClaims;

pub struct SessionIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: &str, role: &str) -> Result<String> {
        let claims = SessionClaims::new(user_id, role, self.ttl)?;
        Ok(encode(&Header::default(), &claims, &self.key)?)
    }
}

#[cfg(test)]
pub(crate) fn decode_for_tests(token: &str, secret: &str) -> Result<SessionClaims> {
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_token_decodes_with_same_secret() -> Result<()> {
        let issuer = SessionIssuer::new(SECRET, Duration::hours(48));
        let token = issuer.issue("user-1", "user")?;
        let claims = decode_for_tests(&token, SECRET)?;
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.hasura.role, "user");
        Ok(())
    }

    #[test]
    fn wrong_secret_rejected() -> Result<()> {
        let issuer = SessionIssuer::new(SECRET, Duration::hours(48));
        let token = issuer.issue("user-1", "user")?;
        let result = decode_for_tests(&token, "other-secret");
        assert!(matches!(result, Err(Error::Jwt(_))));
        Ok(())
    }
}
