//! Payment provider webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use order_store::OrderStore;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

/// POST /payments/webhook — always answers `{ok:true}`.
///
/// Failures are logged and counted by the reconciler.
pub async fn webhook<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Json<WebhookAck> {
    if let Ok(outcome) = state.reconciler.handle_webhook(&body).await {
        tracing::info!(outcome = outcome.as_str(), "webhook processed");
    }
    Json(WebhookAck { ok: true })
}
