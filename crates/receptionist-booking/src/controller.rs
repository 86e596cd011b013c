//! Booking Flow Controller (spec.md §4.6): cascades through the tenant's
//! `bookingSlots[]` in order, running the first incomplete slot's sub-flow.

use std::sync::Arc;

use receptionist_core::config::{Company, SlotType};
use receptionist_sessions::Session;
use receptionist_slots::slot_is_complete;
use tracing::instrument;

use crate::abort::{matches_abort_phrase, silence_abort_triggered};
use crate::finalizer::{finalize, CalendarClient, SmsClient};
use crate::interruption::{looks_like_interruption, resume_booking_block};
use crate::loop_prevention::next_prompt;
use crate::mid_call::evaluate as evaluate_mid_call;
use crate::store::BookingStore;
use crate::types::SubFlowResult;
use crate::{address_flow, name_flow, phone_flow, time_flow};

/// What the turn orchestrator should do after running the booking cascade
/// for this turn.
pub enum BookingTurnOutcome {
    /// Say `text` and keep the session in BOOKING mode.
    Reply(String),
    /// Say `text`; this is a question interrupting the flow, to be answered
    /// by the LLM with `resume_hint` appended afterward by the caller.
    Interruption { resume_hint: String },
    /// Say `text` and transition the session to COMPLETE with a
    /// `message_taken`/escalated outcome.
    Escalate(String),
    /// Booking was aborted by the caller; say `text` and move to COMPLETE.
    Aborted(String),
    /// All required slots are complete; `text` is the finalized outcome script.
    Finalized(String),
}

/// Run one turn of the booking cascade. `caller_id` is the inbound caller
/// ID if the channel provided one (spec.md §4.6.2 offer-caller-id).
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn run_turn(
    session: &mut Session,
    company: &Company,
    text: &str,
    caller_id: Option<&str>,
    store: &Arc<dyn BookingStore>,
    calendar: &Arc<dyn CalendarClient>,
    sms: &Arc<dyn SmsClient>,
) -> BookingTurnOutcome {
    let behavior = &company.front_desk_behavior;

    if matches_abort_phrase(text, &behavior.booking_abort_phrases) {
        let script = "No problem — we won't schedule anything right now. Reach out anytime.".to_string();
        return BookingTurnOutcome::Aborted(script);
    }

    'cascade: for def in &behavior.booking_slots {
        let value = session.collected_slots.get(&def.slot_id).cloned();
        let meta = session.booking.meta_mut(&def.slot_id);

        if silence_abort_triggered(meta.confirm_silence_count) && meta.pending_confirm {
            let script = "Since I haven't heard back, we'll hold off on scheduling for now.".to_string();
            return BookingTurnOutcome::Aborted(script);
        }

        if slot_is_complete(&def.slot_type, value.as_deref(), meta, def.confirm_back, def.ask_full_name) {
            continue;
        }

        // Address access sub-flow is a nested state machine resumed
        // independently of the parent address slot's own completeness.
        if def.slot_type == SlotType::Address {
            if let Some(step) = meta.breakdown_step.clone() {
                if step.starts_with("access_") {
                    let result = address_flow::run_access(meta, &behavior.access_flow, text);
                    match result {
                        SubFlowResult::Reply(prompt) => {
                            let cfg = &behavior.loop_prevention;
                            let (rendered, escalate) = next_prompt(cfg, session.booking.meta_mut(&def.slot_id), &prompt);
                            if escalate {
                                return BookingTurnOutcome::Escalate(behavior.escalation.offer_message.clone());
                            }
                            return BookingTurnOutcome::Reply(rendered);
                        }
                        // Access sub-flow complete; the address slot itself
                        // may now be complete too — let the cascade re-check
                        // it (and any remaining slots) rather than finalizing.
                        SubFlowResult::Continue => continue 'cascade,
                        SubFlowResult::EscalateTransfer(text) => return BookingTurnOutcome::Escalate(text),
                        SubFlowResult::Abort(text) => return BookingTurnOutcome::Aborted(text),
                    }
                }
            }
        }

        if looks_like_interruption(text, looks_like_slot_answer(&def.slot_type, text)) {
            let summary = summarize_collected(session);
            return BookingTurnOutcome::Interruption {
                resume_hint: resume_booking_block(&summary, &def.question),
            };
        }

        if !def.mid_call_rules.is_empty() {
            let extracted_anything = extract_any(&def.slot_type, text, behavior);
            if !extracted_anything {
                if let Some((response, escalate)) = evaluate_mid_call(
                    &def.mid_call_rules,
                    &mut meta.mid_call_rules,
                    text,
                    session.metrics.total_turns,
                    &def.question,
                ) {
                    if escalate {
                        return BookingTurnOutcome::Escalate(response);
                    }
                    return BookingTurnOutcome::Reply(response);
                }
            }
        }

        let mut value_slot = value;
        let result = match &def.slot_type {
            SlotType::Name => name_flow::run(
                def,
                &mut value_slot,
                meta,
                text,
                &behavior.name_stop_words,
                &behavior.common_first_names,
                &behavior.name_spelling_variants.precomputed_variant_map,
                session.metrics.total_turns,
            ),
            SlotType::Phone => phone_flow::run(def, &mut value_slot, meta, text, caller_id),
            SlotType::Address => address_flow::run(def, &mut value_slot, meta, text, &behavior.access_flow, &company.trade),
            SlotType::Time => time_flow::run(def, &mut value_slot, meta, text),
            SlotType::Email | SlotType::Custom { .. } => {
                // No dedicated extractor for these slot kinds yet; fall back
                // to a plain confirm-back gate on whatever text arrived.
                value_slot = Some(text.trim().to_string());
                SubFlowResult::Continue
            }
        };

        if let Some(v) = &value_slot {
            session.collected_slots.insert(def.slot_id.clone(), v.clone());
        }

        match result {
            SubFlowResult::Reply(prompt) => {
                let cfg = &behavior.loop_prevention;
                let (rendered, escalate) = next_prompt(cfg, session.booking.meta_mut(&def.slot_id), &prompt);
                if escalate {
                    return BookingTurnOutcome::Escalate(behavior.escalation.offer_message.clone());
                }
                return BookingTurnOutcome::Reply(rendered);
            }
            // This slot is now complete; let the cascade move on to the
            // next incomplete slot instead of finalizing prematurely.
            SubFlowResult::Continue => continue 'cascade,
            SubFlowResult::EscalateTransfer(text) => return BookingTurnOutcome::Escalate(text),
            SubFlowResult::Abort(text) => return BookingTurnOutcome::Aborted(text),
        }
    }

    let is_asap = session
        .collected_slots
        .get("time")
        .map(|t| t == "asap")
        .unwrap_or(false);
    match finalize(store, calendar, sms, session, company, is_asap).await {
        Ok((booking, script)) => {
            session.try_set_mode(receptionist_core::Mode::Complete, false);
            session.booking.completed_at = Some(chrono::Utc::now().to_rfc3339());
            session.booking.booking_request_id = Some(booking.id.clone());
            session.booking.outcome_mode = Some(booking.outcome_mode.clone());
            BookingTurnOutcome::Finalized(script)
        }
        Err(e) => {
            tracing::error!("booking finalization failed: {e}");
            BookingTurnOutcome::Reply(
                "I'm having trouble finalizing that booking — let me get someone to follow up with you.".to_string(),
            )
        }
    }
}

fn looks_like_slot_answer(slot_type: &SlotType, text: &str) -> bool {
    match slot_type {
        SlotType::Phone => receptionist_slots::extract_phone(text).is_some(),
        SlotType::Address => receptionist_slots::extract_address(text).is_some(),
        SlotType::Time => receptionist_slots::extract_time(text).is_some(),
        SlotType::Name | SlotType::Email | SlotType::Custom { .. } => false,
    }
}

fn extract_any(slot_type: &SlotType, text: &str, behavior: &receptionist_core::config::FrontDeskBehavior) -> bool {
    match slot_type {
        SlotType::Name => receptionist_slots::extract_name(
            text,
            true,
            &behavior.name_stop_words,
            &behavior.common_first_names,
            &[],
        )
        .is_some(),
        SlotType::Phone => receptionist_slots::extract_phone(text).is_some(),
        SlotType::Address => receptionist_slots::extract_address(text).is_some(),
        SlotType::Time => receptionist_slots::extract_time(text).is_some(),
        SlotType::Email | SlotType::Custom { .. } => false,
    }
}

fn summarize_collected(session: &Session) -> String {
    if session.collected_slots.is_empty() {
        return "nothing yet".to_string();
    }
    session
        .collected_slots
        .values()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}
