//! Metrics snapshot endpoint.
//! Used by: server.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;
use crate::telemetry::MetricsSnapshot;

#[derive(Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub live_tokens: usize,
}

pub async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>> {
    Ok(Json(MetricsResponse {
        counters: state.metrics.snapshot(),
        live_tokens: state.tokens.len()?,
    }))
}
