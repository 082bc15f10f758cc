//! HTTP handler modules.
//! Used by: server.

pub mod health;
pub mod login;
pub mod metrics;
pub mod register;
pub mod verify;

use serde::{Deserialize, Serialize};

use crate::accounts::Account;
use crate::error::Result;
use crate::state::AppStateInner;

/// Hasura action body. Only `input` is read; `action`, `session_variables`
/// and `request_query` are ignored.
#[derive(Deserialize)]
pub struct ActionPayload<T> {
    pub input: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub token: String,
    pub profile_image_url: Option<String>,
    pub role: String,
}

impl AuthResponse {
    pub fn new(account: Account, token: String) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            token,
            profile_image_url: account.profile_image_url,
            role: account.role,
        }
    }
}

/// Counts a rate-limit rejection before handing it back.
fn rate_limited(state: &AppStateInner, check: Result<()>) -> Result<()> {
    if check.is_err() {
        state.metrics.record_rate_limited();
    }
    check
}
