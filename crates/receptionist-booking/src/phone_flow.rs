//! Phone sub-flow (spec.md §4.6.2): `NONE -> OFFERED_CALLER_ID? ->
//! BREAKDOWN_AREA_CODE? -> BREAKDOWN_REST? -> CONFIRM_PENDING -> COMPLETE`.

use receptionist_core::config::BookingSlotDef;
use receptionist_sessions::SlotMeta;
use receptionist_slots::extract_phone;

use crate::types::SubFlowResult;

fn is_affirmative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    matches!(t.as_str(), "yes" | "yeah" | "yep" | "sure" | "correct" | "that's right" | "yup")
}

fn is_negative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    t == "no" || t.starts_with("no ") || t.starts_with("no,")
}

fn wants_text_me(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("text me") || t.contains("use that number") || t.contains("same number")
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    def: &BookingSlotDef,
    value: &mut Option<String>,
    meta: &mut SlotMeta,
    text: &str,
    caller_id: Option<&str>,
) -> SubFlowResult {
    // CONFIRM_PENDING: waiting on yes/no for the collected number.
    if value.is_some() && def.confirm_back && meta.pending_confirm {
        if is_affirmative(text) {
            meta.pending_confirm = false;
            meta.confirmed = true;
            return SubFlowResult::Continue;
        }
        if is_negative(text) {
            *value = None;
            meta.pending_confirm = false;
            meta.breakdown_step = None;
            return SubFlowResult::Reply(def.question.clone());
        }
    }

    // OFFERED_CALLER_ID: still waiting on the first-touch yes/no.
    if def.offer_caller_id && meta.breakdown_step.as_deref() == Some("offered_caller_id") {
        if is_affirmative(text) || (def.accept_text_me && wants_text_me(text)) {
            *value = caller_id.map(str::to_string);
            meta.breakdown_step = None;
            return finish_or_confirm(def, value, meta);
        }
        meta.breakdown_step = None;
        // Falls through to normal extraction below for the caller's own number.
    } else if def.offer_caller_id && value.is_none() && meta.breakdown_step.is_none() && caller_id.is_some() {
        meta.breakdown_step = Some("offered_caller_id".to_string());
        let prompt = def
            .caller_id_prompt
            .clone()
            .unwrap_or_else(|| format!("Is {} a good number to reach you?", caller_id.unwrap_or_default()));
        return SubFlowResult::Reply(prompt);
    }

    // BREAKDOWN_AREA_CODE / BREAKDOWN_REST: two-step breakdown in progress.
    if def.break_down_if_unclear {
        if meta.breakdown_step.as_deref() == Some("area_code") {
            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() == 3 {
                meta.spelling_variant_answer = Some(digits); // reuse as area-code stash
                meta.breakdown_step = Some("rest".to_string());
                return SubFlowResult::Reply(
                    def.rest_of_number_prompt
                        .clone()
                        .unwrap_or_else(|| "And the rest of the number?".to_string()),
                );
            }
            return SubFlowResult::Reply(
                def.area_code_prompt
                    .clone()
                    .unwrap_or_else(|| "What's the area code?".to_string()),
            );
        }
        if meta.breakdown_step.as_deref() == Some("rest") {
            let rest: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            if rest.len() >= 7 {
                let area = meta.spelling_variant_answer.take().unwrap_or_default();
                *value = Some(format!("{area}{rest}"));
                meta.breakdown_step = None;
                return finish_or_confirm(def, value, meta);
            }
            return SubFlowResult::Reply(
                def.rest_of_number_prompt
                    .clone()
                    .unwrap_or_else(|| "And the rest of the number?".to_string()),
            );
        }
    }

    if let Some(extracted) = extract_phone(text) {
        *value = Some(extracted.digits);
        return finish_or_confirm(def, value, meta);
    }

    if def.break_down_if_unclear {
        meta.breakdown_step = Some("area_code".to_string());
        return SubFlowResult::Reply(
            def.area_code_prompt
                .clone()
                .unwrap_or_else(|| "Let's break that down — what's the area code?".to_string()),
        );
    }

    SubFlowResult::Reply(def.question.clone())
}

fn finish_or_confirm(def: &BookingSlotDef, value: &Option<String>, meta: &mut SlotMeta) -> SubFlowResult {
    if def.confirm_back && !meta.confirmed {
        meta.pending_confirm = true;
        let prompt = def
            .confirm_prompt
            .clone()
            .unwrap_or_else(|| "I have {value} down — is that the right number?".to_string())
            .replace("{value}", value.as_deref().unwrap_or(""));
        return SubFlowResult::Reply(prompt);
    }
    SubFlowResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::config::SlotType;

    fn def(confirm_back: bool, offer_caller_id: bool, breakdown: bool) -> BookingSlotDef {
        BookingSlotDef {
            slot_id: "phone".into(),
            slot_type: SlotType::Phone,
            question: "What's the best callback number?".into(),
            confirm_prompt: Some("I have {value} — is that right?".into()),
            reprompt_variants: vec![],
            required: true,
            confirm_back,
            ask_full_name: false,
            ask_missing_name_part: false,
            offer_caller_id,
            caller_id_prompt: None,
            accept_text_me: true,
            break_down_if_unclear: breakdown,
            area_code_prompt: None,
            rest_of_number_prompt: None,
            city_prompt: None,
            zip_prompt: None,
            partial_address_prompt: None,
            address_confirm_level: Default::default(),
            accept_partial_address: false,
            use_google_maps_validation: false,
            unit_number_mode: Default::default(),
            unit_prompt_variants: vec![],
            offer_asap: false,
            asap_phrase: None,
            spell_out_email: false,
            offer_to_send_text: false,
            confirm_spelling: false,
            last_name_question: None,
            first_name_question: None,
            mid_call_rules: vec![],
            offer_morning_afternoon: false,
        }
    }

    #[test]
    fn clean_number_with_confirm_back_asks_to_confirm() {
        let d = def(true, false, false);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "239-555-1234", None);
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert!(meta.pending_confirm);
    }

    #[test]
    fn confirming_clears_pending_and_completes() {
        let d = def(true, false, false);
        let mut value = Some("2395551234".to_string());
        let mut meta = SlotMeta {
            pending_confirm: true,
            ..Default::default()
        };
        let result = run(&d, &mut value, &mut meta, "yes", None);
        assert_eq!(result, SubFlowResult::Continue);
        assert!(meta.confirmed);
    }

    #[test]
    fn caller_id_offer_accepted_skips_extraction() {
        let d = def(false, true, false);
        let mut value = None;
        let mut meta = SlotMeta {
            breakdown_step: Some("offered_caller_id".to_string()),
            ..Default::default()
        };
        let result = run(&d, &mut value, &mut meta, "yes that works", Some("2395559999"));
        assert_eq!(result, SubFlowResult::Continue);
        assert_eq!(value.as_deref(), Some("2395559999"));
    }

    #[test]
    fn breakdown_flow_concatenates_area_code_and_rest() {
        let d = def(false, false, true);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let first = run(&d, &mut value, &mut meta, "not sure", None);
        assert!(matches!(first, SubFlowResult::Reply(_)));
        assert_eq!(meta.breakdown_step.as_deref(), Some("area_code"));
        let second = run(&d, &mut value, &mut meta, "239", None);
        assert_eq!(meta.breakdown_step.as_deref(), Some("rest"));
        assert!(matches!(second, SubFlowResult::Reply(_)));
        let third = run(&d, &mut value, &mut meta, "5551234", None);
        assert_eq!(third, SubFlowResult::Continue);
        assert_eq!(value.as_deref(), Some("2395551234"));
    }
}
