//! Signup and resend endpoints: create a pending account and mail a
//! confirmation link.
//! Used by: server.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::accounts::password::hash_password;
use crate::accounts::{NewAccount, is_plausible_email, normalize_email};
use crate::error::{Error, Result};
use crate::handlers::{ActionPayload, rate_limited};
use crate::mailer::{ConfirmationEmail, confirmation_link};
use crate::state::{AppState, AppStateInner};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 72;
const MAX_NAME_LEN: usize = 100;

#[derive(Deserialize)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct ResendInput {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
    pub email: String,
    pub status: String,
}

impl PendingResponse {
    fn new(email: String) -> Self {
        Self { email, status: "pending_verification".into() }
    }
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!("{field} must be 1-{MAX_NAME_LEN} characters")));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidInput(format!("{field} contains control characters")));
    }
    Ok(())
}

fn validate_input(input: &RegisterInput, email: &str) -> Result<()> {
    validate_name("first_name", &input.first_name)?;
    validate_name("last_name", &input.last_name)?;
    if !is_plausible_email(email) {
        return Err(Error::InvalidInput("email is not a valid address".into()));
    }
    // bcrypt ignores bytes past 72.
    if input.password.len() < MIN_PASSWORD_LEN || input.password.len() > MAX_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} bytes"
        )));
    }
    if input.password != input.confirm_password {
        return Err(Error::InvalidInput("passwords do not match".into()));
    }
    Ok(())
}

/// Issues a fresh token for `email` and delivers the link. A delivery failure
/// leaves the account pending; another register or resend re-issues.
pub(crate) async fn send_verification(state: &AppStateInner, email: &str) -> Result<()> {
    let token = state.tokens.issue(email)?;
    state.metrics.record_issue();
    let link = confirmation_link(&state.verify_link_base, email, &token)?;

    let Some(mailer) = &state.mailer else {
        tracing::info!(identifier = %email, link = %link, "mail delivery disabled, confirmation link");
        return Ok(());
    };

    let message = ConfirmationEmail::new(mailer.sender(), email, &link);
    match mailer.send(&message).await {
        Ok(()) => {
            state.metrics.record_email_sent();
            tracing::info!(identifier = %email, "confirmation email sent");
            Ok(())
        }
        Err(e) => {
            state.metrics.record_email_failure();
            tracing::warn!(identifier = %email, error = %e, "confirmation email failed");
            Err(e)
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<ActionPayload<RegisterInput>>,
) -> Result<Json<PendingResponse>> {
    let input = payload.input;
    let email = normalize_email(&input.email);
    validate_input(&input, &email)?;
    // Every signup mails a link, so it spends from the same per-email budget as resend.
    rate_limited(&state, state.rate_limiter.check_resend(&email))?;

    match state.accounts.find_by_email(&email)? {
        Some(account) if account.verified => {
            return Err(Error::Conflict("user with this email already exists".into()));
        }
        // Stored details stay as first submitted; the caller only gets a fresh link mailed.
        Some(_) => tracing::info!(identifier = %email, "signup repeated for pending account"),
        None => create_account(&state, input, &email).await?,
    }

    send_verification(&state, &email).await?;
    Ok(Json(PendingResponse::new(email)))
}

async fn create_account(state: &AppStateInner, input: RegisterInput, email: &str) -> Result<()> {
    let cost = state.bcrypt_cost;
    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| Error::Internal(format!("password hashing task failed: {e}")))??;

    let new = NewAccount {
        first_name: input.first_name.trim().to_owned(),
        last_name: input.last_name.trim().to_owned(),
        email: email.to_owned(),
        password_hash,
    };
    match state.accounts.create_pending(new) {
        Ok(account) => {
            tracing::info!(identifier = %email, account_id = %account.id, "pending account created");
            Ok(())
        }
        // A concurrent first signup won the insert; a still-pending row gets a re-issue.
        Err(Error::Conflict(msg)) => match state.accounts.find_by_email(email)? {
            Some(account) if !account.verified => {
                tracing::info!(identifier = %email, "signup raced a pending account");
                Ok(())
            }
            _ => Err(Error::Conflict(msg)),
        },
        Err(e) => Err(e),
    }
}

/// Always answers with the same body so callers cannot probe which emails
/// have pending accounts.
pub async fn resend(
    State(state): State<AppState>,
    Json(payload): Json<ActionPayload<ResendInput>>,
) -> Result<Json<PendingResponse>> {
    let email = normalize_email(&payload.input.email);
    if !is_plausible_email(&email) {
        return Err(Error::InvalidInput("email is not a valid address".into()));
    }
    rate_limited(&state, state.rate_limiter.check_resend(&email))?;

    match state.accounts.find_by_email(&email)? {
        Some(account) if !account.verified => send_verification(&state, &email).await?,
        _ => tracing::debug!(identifier = %email, "resend ignored, no pending account"),
    }
    Ok(Json(PendingResponse::new(email)))
}
