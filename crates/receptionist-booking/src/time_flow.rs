//! Time sub-flow (spec.md §4.6.4): day preference + window/specific time,
//! with ASAP detection and an optional binary morning/afternoon fallback
//! after repeated failed extractions.

use receptionist_core::config::BookingSlotDef;
use receptionist_sessions::SlotMeta;
use receptionist_slots::extract_time;

use crate::types::SubFlowResult;

fn is_affirmative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    matches!(t.as_str(), "yes" | "yeah" | "yep" | "sure" | "correct" | "that's right" | "yup")
}

fn is_negative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    t == "no" || t.starts_with("no ") || t.starts_with("no,")
}

pub fn run(def: &BookingSlotDef, value: &mut Option<String>, meta: &mut SlotMeta, text: &str) -> SubFlowResult {
    if value.is_some() && def.confirm_back && meta.pending_confirm {
        if is_affirmative(text) {
            meta.pending_confirm = false;
            meta.confirmed = true;
            return SubFlowResult::Continue;
        }
        if is_negative(text) {
            *value = None;
            meta.pending_confirm = false;
        }
    }

    // Binary morning/afternoon fallback after two failed attempts.
    if meta.confirm_silence_count >= 2 && def.offer_morning_afternoon && meta.breakdown_step.as_deref() == Some("offered_binary") {
        let lower = text.to_lowercase();
        if lower.contains("morning") {
            *value = Some("morning".to_string());
            meta.breakdown_step = None;
            return finish_or_confirm(def, value, meta);
        }
        if lower.contains("afternoon") {
            *value = Some("afternoon".to_string());
            meta.breakdown_step = None;
            return finish_or_confirm(def, value, meta);
        }
    }

    if let Some(extracted) = extract_time(text) {
        let rendered = if extracted.is_asap {
            "asap".to_string()
        } else {
            [extracted.day_preference, extracted.window, extracted.specific]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        };
        *value = Some(rendered);
        meta.confirm_silence_count = 0;
        return finish_or_confirm(def, value, meta);
    }

    meta.confirm_silence_count += 1;
    if meta.confirm_silence_count >= 2 && def.offer_morning_afternoon {
        meta.breakdown_step = Some("offered_binary".to_string());
        return SubFlowResult::Reply("Would mornings or afternoons generally work better?".to_string());
    }
    SubFlowResult::Reply(def.question.clone())
}

fn finish_or_confirm(def: &BookingSlotDef, value: &Option<String>, meta: &mut SlotMeta) -> SubFlowResult {
    if def.confirm_back && !meta.confirmed {
        meta.pending_confirm = true;
        let prompt = def
            .confirm_prompt
            .clone()
            .unwrap_or_else(|| "I've got {value} down — does that work?".to_string())
            .replace("{value}", value.as_deref().unwrap_or(""));
        return SubFlowResult::Reply(prompt);
    }
    SubFlowResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::config::SlotType;

    fn def(confirm_back: bool, offer_binary: bool) -> BookingSlotDef {
        BookingSlotDef {
            slot_id: "time".into(),
            slot_type: SlotType::Time,
            question: "When works best for you?".into(),
            confirm_prompt: None,
            reprompt_variants: vec![],
            required: true,
            confirm_back,
            ask_full_name: false,
            ask_missing_name_part: false,
            offer_caller_id: false,
            caller_id_prompt: None,
            accept_text_me: false,
            break_down_if_unclear: false,
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
            offer_morning_afternoon: offer_binary,
        }
    }

    #[test]
    fn asap_phrase_is_detected() {
        let d = def(false, false);
        let mut value = None;
        let mut meta = SlotMeta::default();
        run(&d, &mut value, &mut meta, "as soon as possible please");
        assert_eq!(value.as_deref(), Some("asap"));
    }

    #[test]
    fn two_failed_attempts_offers_binary_choice() {
        let d = def(false, true);
        let mut value = None;
        let mut meta = SlotMeta::default();
        run(&d, &mut value, &mut meta, "umm I don't know");
        let second = run(&d, &mut value, &mut meta, "hard to say");
        assert!(matches!(second, SubFlowResult::Reply(_)));
        assert_eq!(meta.breakdown_step.as_deref(), Some("offered_binary"));
    }
}
