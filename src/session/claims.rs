//! Hasura-style JWT claims for session credentials.
//! Used by: session::sign.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::DEFAULT_ROLE;
use crate::error::{Error, Result};

pub const ALLOWED_ROLES: [&str; 2] = ["user", "user-admin"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HasuraClaims {
    #[serde(rename = "x-hasura-allowed-roles")]
    pub allowed_roles: Vec<String>,
    #[serde(rename = "x-hasura-default-role")]
    pub default_role: String,
    #[serde(rename = "x-hasura-user-id")]
    pub user_id: String,
    #[serde(rename = "x-hasura-role")]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "https://hasura.io/jwt/claims")]
    pub hasura: HasuraClaims,
    pub metadata: Metadata,
}

impl SessionClaims {
    pub fn new(user_id: &str, role: &str, ttl: Duration) -> Result<Self> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::Internal(format!("session ttl {ttl} overflows the calendar")))?;
        Ok(Self {
            sub: user_id.to_owned(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            hasura: HasuraClaims {
                allowed_roles: ALLOWED_ROLES.iter().map(|r| r.to_string()).collect(),
                default_role: DEFAULT_ROLE.to_owned(),
                user_id: user_id.to_owned(),
                role: role.to_owned(),
            },
            metadata: Metadata {
                user_id: user_id.to_owned(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_carry_user_id_everywhere() -> Result<()> {
        let claims = SessionClaims::new("user-1", "user", Duration::hours(48))?;
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.hasura.user_id, "user-1");
        assert_eq!(claims.metadata.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, 48 * 3600);
        Ok(())
    }

    #[test]
    fn overflowing_session_ttl_is_an_error() -> Result<()> {
        let ttl = Duration::try_days(1_000_000_000).ok_or_else(|| Error::Internal("ttl".into()))?;
        assert!(matches!(SessionClaims::new("user-1", "user", ttl), Err(Error::Internal(_))));
        Ok(())
    }

    #[test]
    fn claims_serialize_with_hasura_namespace() -> Result<()> {
        let claims = SessionClaims::new("user-1", "user", Duration::hours(1))?;
        let json = serde_json::to_value(&claims)?;
        let hasura = &json["https://hasura.io/jwt/claims"];
        assert_eq!(hasura["x-hasura-default-role"], "user");
        assert_eq!(hasura["x-hasura-allowed-roles"][1], "user-admin");
        assert_eq!(json["metadata"]["userId"], "user-1");
        Ok(())
    }
}
