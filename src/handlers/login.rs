//! Password login for verified accounts.
//! Used by: server.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::accounts::normalize_email;
use crate::accounts::password::verify_password;
use crate::error::{Error, Result};
use crate::handlers::{ActionPayload, AuthResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<ActionPayload<LoginInput>>,
) -> Result<Json<AuthResponse>> {
    let input = payload.input;
    let email = normalize_email(&input.email);

    let Some(account) = state.accounts.find_by_email(&email)? else {
        state.metrics.record_login_failure();
        return Err(Error::InvalidCredentials);
    };

    let hash = account.password_hash.clone();
    let password = input.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| Error::Internal(format!("password check task failed: {e}")))?;
    if !matches {
        state.metrics.record_login_failure();
        return Err(Error::InvalidCredentials);
    }
    if !account.verified {
        return Err(Error::NotVerified);
    }

    let token = state.sessions.issue(&account.id, &account.role)?;
    state.metrics.record_login();
    tracing::info!(account_id = %account.id, "login succeeded");
    Ok(Json(AuthResponse::new(account, token)))
}
