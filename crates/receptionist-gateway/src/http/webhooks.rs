//! POST /webhooks/:source — inbound telephony/SMS webhook ingress.
//!
//! Verifies the request signature before trusting the payload (spec.md §9
//! supplement: a telephony/SMS adapter that skips this is not credible),
//! then normalizes the provider payload into the same request the test
//! console and `/turn` use internally.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use receptionist_channels::webhook::verify_hmac_sha256;
use receptionist_orchestrator::TurnRequest;

use crate::app::AppState;
use crate::company_store::CompanyStore;

/// The subset of Twilio-shaped voice/SMS webhook fields the core cares
/// about. Real telephony payload parsing is an external adapter's job
/// (spec.md §1 Non-goals); this is the narrow slice this demo binary
/// itself accepts directly.
#[derive(Debug, Deserialize)]
pub struct TelephonyWebhook {
    pub company_id: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub body: String,
}

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    headers: HeaderMap,
    raw_body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let sig_header = headers.get("x-webhook-signature").and_then(|v| v.to_str().ok());

    if let Err(e) = verify_hmac_sha256(
        sig_header,
        &raw_body,
        state.config.gateway.webhook_signing_secret.as_deref(),
    ) {
        warn!(source = %source, error = %e, "rejected inbound webhook with invalid signature");
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"error": e.to_string()}))));
    }

    let payload: TelephonyWebhook = serde_json::from_slice(&raw_body).map_err(|e| {
        warn!(source = %source, error = %e, "malformed webhook payload");
        (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid payload"})))
    })?;

    info!(source = %source, call_sid = ?payload.call_sid, "inbound telephony webhook");

    let channel = if source == "sms" { "sms" } else { "voice" };
    let identifier = payload
        .call_sid
        .clone()
        .or_else(|| payload.from.clone())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, Json(json!({"error": "missing call_sid/from"}))))?;

    let company = state.companies.get_company(&payload.company_id).await.map_err(|e| {
        (StatusCode::NOT_FOUND, Json(json!({"error": e.to_string()})))
    })?;

    let response = state
        .orchestrator
        .process_turn(TurnRequest {
            company: &company,
            channel,
            identifier: &identifier,
            user_text: &payload.body,
            caller_id: payload.from.as_deref(),
            call_sid: payload.call_sid.as_deref(),
            force_new_session: false,
        })
        .await;

    Ok(Json(json!({
        "reply": response.reply,
        "session_id": response.session_id,
        "requires_transfer": response.requires_transfer,
    })))
}
