//! Email verification endpoint: consume the token, promote the account,
//! hand back a session credential.
//! Used by: server.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::accounts::{is_plausible_email, normalize_email};
use crate::error::{Error, Result};
use crate::handlers::{AuthResponse, rate_limited};
use crate::state::{AppState, AppStateInner};

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub token: String,
}

pub async fn verify_link(
    State(state): State<AppState>,
    Query(req): Query<VerifyRequest>,
) -> Result<Json<AuthResponse>> {
    complete_verification(&state, req).map(Json)
}

pub async fn verify_json(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<AuthResponse>> {
    complete_verification(&state, req).map(Json)
}

fn complete_verification(state: &AppStateInner, req: VerifyRequest) -> Result<AuthResponse> {
    let email = normalize_email(&req.email);
    // Nothing unvalidated reaches the limiter's key space.
    if !is_plausible_email(&email) {
        return Err(Error::InvalidInput("email is not a valid address".into()));
    }
    rate_limited(state, state.rate_limiter.check_verify(&email))?;

    if !state.tokens.verify(&email, req.token.trim())? {
        state.metrics.record_verify_failure();
        tracing::info!(identifier = %email, "email verification failed");
        return Err(Error::VerificationFailed);
    }
    state.metrics.record_verify();

    let Some(account) = state.accounts.mark_verified(&email)? else {
        tracing::warn!(identifier = %email, "token verified but no account exists");
        return Err(Error::VerificationFailed);
    };
    let token = state.sessions.issue(&account.id, &account.role)?;
    tracing::info!(identifier = %email, account_id = %account.id, "email verified");
    Ok(AuthResponse::new(account, token))
}
