//! Booking finalizer (spec.md §4.7): idempotent insert, then fire-and-forget
//! calendar + SMS side effects that must never block the turn response.

use std::sync::Arc;

use async_trait::async_trait;
use receptionist_core::config::{BookingOutcomeMode, Company};
use receptionist_core::{render_placeholders, Urgency};
use receptionist_sessions::Session;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::store::BookingStore;
use crate::types::{BookingRequest, BookingStatus};

/// spec.md §6.6 Calendar Client.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn create_booking_event(
        &self,
        company_id: &str,
        summary: &str,
        start_hint: &str,
    ) -> std::result::Result<CalendarEvent, String>;
}

pub struct CalendarEvent {
    pub event_id: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Stub calendar client: no tenant in this deployment has a live calendar
/// integration wired up yet, so this always reports "not configured" rather
/// than guessing at an event shape.
pub struct NoopCalendarClient;

#[async_trait]
impl CalendarClient for NoopCalendarClient {
    async fn create_booking_event(
        &self,
        _company_id: &str,
        _summary: &str,
        _start_hint: &str,
    ) -> std::result::Result<CalendarEvent, String> {
        Err("calendar integration not configured".to_string())
    }
}

/// spec.md §6.7 SMS Client.
#[async_trait]
pub trait SmsClient: Send + Sync {
    async fn send_booking_confirmation(&self, company_id: &str, to: &str, body: &str) -> std::result::Result<(), String>;
    async fn schedule_reminder(&self, company_id: &str, to: &str, body: &str, lead_hours: u32) -> std::result::Result<(), String>;
}

pub struct NoopSmsClient;

#[async_trait]
impl SmsClient for NoopSmsClient {
    async fn send_booking_confirmation(&self, _company_id: &str, _to: &str, _body: &str) -> std::result::Result<(), String> {
        Err("sms integration not configured".to_string())
    }

    async fn schedule_reminder(&self, _company_id: &str, _to: &str, _body: &str, _lead_hours: u32) -> std::result::Result<(), String> {
        Err("sms integration not configured".to_string())
    }
}

fn default_final_script(mode: BookingOutcomeMode) -> &'static str {
    match mode {
        BookingOutcomeMode::ConfirmedOnCall => "You're all set — we'll see you then, {name}.",
        BookingOutcomeMode::PendingDispatch => "Thanks {name}, a technician will be dispatched shortly.",
        BookingOutcomeMode::CallbackRequired => "Thanks {name}, someone will call you back to confirm a time.",
        BookingOutcomeMode::TransferToScheduler => "Let me connect you with scheduling to lock in a time.",
        BookingOutcomeMode::AfterHoursHold => "We're closed right now, but we've got your request — {name}, we'll follow up first thing.",
    }
}

/// Finalize a booking: idempotent insert, then spawn the calendar/SMS side
/// effects so the caller-facing response is never blocked on an external
/// service (spec.md §4.7 "never block the turn response").
#[instrument(skip(store, calendar, sms, session, company), fields(session_id = %session.id))]
pub async fn finalize(
    store: &Arc<dyn BookingStore>,
    calendar: &Arc<dyn CalendarClient>,
    sms: &Arc<dyn SmsClient>,
    session: &Session,
    company: &Company,
    is_asap: bool,
) -> Result<(BookingRequest, String)> {
    if let Some(existing) = store.find_by_session(&session.id).await? {
        info!("booking already finalized for this session, returning existing record");
        let script = render_final_script(company, &existing);
        return Ok((existing, script));
    }

    let outcome = &company.front_desk_behavior.booking_outcome;
    let case_id = format!("CASE-{}", Uuid::now_v7());
    let status = match outcome.mode {
        BookingOutcomeMode::ConfirmedOnCall => BookingStatus::FakeConfirmed,
        BookingOutcomeMode::PendingDispatch => BookingStatus::PendingDispatch,
        BookingOutcomeMode::CallbackRequired => BookingStatus::CallbackQueued,
        BookingOutcomeMode::TransferToScheduler => BookingStatus::Transferred,
        BookingOutcomeMode::AfterHoursHold => BookingStatus::AfterHours,
    };

    let booking = BookingRequest {
        id: String::new(),
        company_id: session.key.company_id.clone(),
        session_id: session.id.clone(),
        customer_id: None,
        status,
        outcome_mode: outcome.mode.as_key().to_string(),
        case_id,
        slots: session.collected_slots.clone(),
        issue: session.discovery.issue.clone(),
        urgency: session.discovery.urgency,
        channel: session.key.channel.as_str().to_string(),
        call_sid: None,
        caller_phone: session.collected_slots.get("phone").cloned(),
        calendar_event_id: None,
        calendar_event_start: None,
        calendar_event_end: None,
        final_script_used: None,
        created_at: chrono::Utc::now().to_rfc3339(),
        completed_at: Some(chrono::Utc::now().to_rfc3339()),
    };

    let inserted = store.insert(booking).await?;
    let script = render_final_script(company, &inserted);

    spawn_side_effects(store.clone(), calendar.clone(), sms.clone(), company.clone(), inserted.clone(), is_asap);

    Ok((inserted, script))
}

fn render_final_script(company: &Company, booking: &BookingRequest) -> String {
    let outcome = &company.front_desk_behavior.booking_outcome;
    let template = if booking.urgency == Urgency::Urgent && outcome.use_asap_variant {
        outcome.asap_variant_script.clone()
    } else {
        None
    }
    .or_else(|| outcome.custom_final_script.clone())
    .or_else(|| outcome.final_scripts.get(&booking.outcome_mode).cloned())
    .unwrap_or_else(|| default_final_script(outcome.mode).to_string());

    render_placeholders(
        &template,
        &[
            ("name", booking.slots.get("name").map(String::as_str)),
            ("timePreference", booking.slots.get("time").map(String::as_str)),
            ("caseId", Some(booking.case_id.as_str())),
            ("companyName", Some(company.name.as_str())),
        ],
    )
}

fn spawn_side_effects(
    store: Arc<dyn BookingStore>,
    calendar: Arc<dyn CalendarClient>,
    sms: Arc<dyn SmsClient>,
    company: Company,
    booking: BookingRequest,
    is_asap: bool,
) {
    tokio::spawn(async move {
        if company.calendar_config.enabled {
            let summary = format!("{} — {}", company.name, booking.issue.clone().unwrap_or_default());
            let hint = booking.slots.get("time").cloned().unwrap_or_default();
            match calendar.create_booking_event(company.company_id.as_str(), &summary, &hint).await {
                Ok(event) => {
                    if let Err(e) = store
                        .update_calendar_fields(&booking.id, &event.event_id, event.start.as_deref(), event.end.as_deref())
                        .await
                    {
                        warn!("failed to persist calendar event fields: {e}");
                    }
                }
                Err(e) => warn!("calendar event creation failed: {e}"),
            }
        }

        if company.sms_config.enabled {
            if let Some(phone) = booking.caller_phone.clone() {
                let confirmation = format!("Your appointment is confirmed. Case {}.", booking.case_id);
                if let Err(e) = sms.send_booking_confirmation(company.company_id.as_str(), &phone, &confirmation).await {
                    warn!("sms confirmation send failed: {e}");
                }
                if !is_asap && company.sms_config.reminder_lead_hours > 0 {
                    let reminder = format!("Reminder: your appointment is coming up. Case {}.", booking.case_id);
                    if let Err(e) = sms
                        .schedule_reminder(company.company_id.as_str(), &phone, &reminder, company.sms_config.reminder_lead_hours)
                        .await
                    {
                        warn!("sms reminder scheduling failed: {e}");
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::config::BookingOutcome;
    use receptionist_core::CompanyId;

    #[test]
    fn final_script_renders_name_placeholder() {
        let mut outcome = BookingOutcome::default();
        outcome.mode = BookingOutcomeMode::PendingDispatch;
        let company = Company {
            company_id: "acme".into(),
            name: "Acme HVAC".into(),
            trade: "hvac".into(),
            service_areas: vec![],
            front_desk_behavior: receptionist_core::config::FrontDeskBehavior {
                booking_slots: vec![],
                conversation_stages: Default::default(),
                detection_triggers: Default::default(),
                discovery_consent: Default::default(),
                name_spelling_variants: Default::default(),
                fast_path_booking: Default::default(),
                booking_outcome: outcome,
                escalation: Default::default(),
                loop_prevention: Default::default(),
                access_flow: Default::default(),
                caller_vocabulary: Default::default(),
                filler_words: Default::default(),
                name_stop_words: vec![],
                common_first_names: vec![],
                stt_protected_words: vec![],
                booking_abort_phrases: vec![],
                silence_prompts: vec![],
                silence_transfer_after: 3,
            },
            calendar_config: Default::default(),
            sms_config: Default::default(),
        };
        let mut slots = std::collections::HashMap::new();
        slots.insert("name".to_string(), "Mark".to_string());
        let booking = BookingRequest {
            id: "b1".into(),
            company_id: CompanyId::from("acme"),
            session_id: receptionist_core::SessionId::new(),
            customer_id: None,
            status: BookingStatus::PendingDispatch,
            outcome_mode: "pending_dispatch".into(),
            case_id: "CASE-1".into(),
            slots,
            issue: None,
            urgency: Urgency::Normal,
            channel: "voice".into(),
            call_sid: None,
            caller_phone: None,
            calendar_event_id: None,
            calendar_event_start: None,
            calendar_event_end: None,
            final_script_used: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        };
        let script = render_final_script(&company, &booking);
        assert!(script.contains("Mark"));
    }
}
