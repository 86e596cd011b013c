//! POST /turn — the one HTTP surface every channel adapter ultimately calls
//! through (spec.md §6.1 `processTurn`). Telephony/SMS webhooks (see
//! `webhooks.rs`) and the test console both normalize their payload into
//! this same shape before handing off to the orchestrator.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use receptionist_orchestrator::TurnRequest;

use crate::app::AppState;
use crate::company_store::CompanyStore;

#[derive(Debug, Deserialize)]
pub struct TurnApiRequest {
    pub company_id: String,
    pub channel: String,
    pub user_text: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub caller_phone: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub force_new_session: bool,
}

pub async fn turn_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TurnApiRequest>,
) -> Result<Json<receptionist_orchestrator::TurnResponse>, (StatusCode, Json<serde_json::Value>)> {
    let company = state.companies.get_company(&req.company_id).await.map_err(|e| {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": e.to_string()})),
        )
    })?;

    // spec.md §3: call-SID identifies a voice session, phone a SMS session,
    // a generated token a web/test one. A `fresh-` prefixed or missing
    // web/test session id always starts a clean session.
    let (identifier, force_new) = resolve_identifier(&req);

    if let Some(phone) = req.caller_phone.as_deref() {
        if let Ok(Some(existing)) = state.customers.find_by_phone(&req.company_id, phone) {
            debug!(customer_id = %existing.id, "inbound caller matched an existing customer record");
        }
    }

    let response = state
        .orchestrator
        .process_turn(TurnRequest {
            company: &company,
            channel: &req.channel,
            identifier: &identifier,
            user_text: &req.user_text,
            caller_id: req.caller_phone.as_deref(),
            call_sid: req.call_sid.as_deref(),
            force_new_session: force_new,
        })
        .await;

    Ok(Json(response))
}

fn resolve_identifier(req: &TurnApiRequest) -> (String, bool) {
    match req.channel.as_str() {
        "voice" | "phone" => (
            req.call_sid
                .clone()
                .or_else(|| req.session_id.clone())
                .unwrap_or_else(fresh_token),
            req.force_new_session,
        ),
        "sms" => (
            req.caller_phone
                .clone()
                .or_else(|| req.session_id.clone())
                .unwrap_or_else(fresh_token),
            req.force_new_session,
        ),
        _ => match &req.session_id {
            Some(sid) if !sid.starts_with("fresh-") => (sid.clone(), req.force_new_session),
            Some(sid) => (sid.clone(), true),
            None => (fresh_token(), true),
        },
    }
}

fn fresh_token() -> String {
    format!("fresh-{}", Uuid::new_v4())
}
