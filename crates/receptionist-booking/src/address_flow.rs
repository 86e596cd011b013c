//! Address sub-flow (spec.md §4.6.3): `NONE -> COLLECTING -> BREAKDOWN_CITY ->
//! UNIT_PENDING -> CONFIRM_PENDING -> ACCESS_FLOW -> COMPLETE`.

use receptionist_core::config::{AccessFlow, AddressConfirmLevel, BookingSlotDef, UnitNumberMode};
use receptionist_sessions::SlotMeta;
use receptionist_slots::extract_address;

use crate::types::SubFlowResult;

fn is_affirmative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    matches!(t.as_str(), "yes" | "yeah" | "yep" | "sure" | "correct" | "that's right" | "yup")
}

fn is_negative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    t == "no" || t.starts_with("no ") || t.starts_with("no,") || t == "none" || t == "no unit"
}

fn looks_like_garbage(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t.ends_with('?') || t.len() < 4 || t.eq_ignore_ascii_case("i'm not sure what you said")
}

fn mentions_unit(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("apt") || lower.contains("unit") || lower.contains('#')
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    def: &BookingSlotDef,
    value: &mut Option<String>,
    meta: &mut SlotMeta,
    text: &str,
    access: &AccessFlow,
    trade: &str,
) -> SubFlowResult {
    // CONFIRM_PENDING
    if value.is_some() && def.confirm_back && meta.pending_confirm {
        if is_affirmative(text) {
            meta.pending_confirm = false;
            meta.confirmed = true;
            return maybe_enter_access_flow(def, meta, access, trade);
        }
        if is_negative(text) {
            *value = None;
            meta.pending_confirm = false;
            meta.breakdown_step = None;
            return SubFlowResult::Reply(def.question.clone());
        }
    }

    // UNIT_PENDING: waiting on a unit-number answer.
    if meta.breakdown_step.as_deref() == Some("unit_pending") {
        meta.breakdown_step = None;
        if is_negative(text) {
            meta.unit_number = None;
        } else {
            meta.unit_number = Some(text.trim().to_string());
        }
        return finish_or_confirm(def, meta);
    }

    // BREAKDOWN_CITY: address lacked ZIP/state and tenant wants more.
    if meta.breakdown_step.as_deref() == Some("breakdown_city") {
        if looks_like_garbage(text) {
            return SubFlowResult::Reply(
                def.city_prompt.clone().unwrap_or_else(|| "What city is that in?".to_string()),
            );
        }
        let street = value.clone().unwrap_or_default();
        *value = Some(format!("{street}, {}", text.trim()));
        meta.breakdown_step = None;
        return maybe_ask_unit(def, value, meta);
    }

    if looks_like_garbage(text) {
        return SubFlowResult::Reply(def.question.clone());
    }

    if let Some(extracted) = extract_address(text) {
        let has_zip_or_state = extracted.zip.is_some() || extracted.state.is_some();
        if !has_zip_or_state && def.address_confirm_level != AddressConfirmLevel::StreetOnly {
            *value = Some(extracted.street);
            meta.breakdown_step = Some("breakdown_city".to_string());
            return SubFlowResult::Reply(
                def.city_prompt.clone().unwrap_or_else(|| "What city is that in?".to_string()),
            );
        }
        let mut full = extracted.street;
        if let Some(zip) = &extracted.zip {
            full.push_str(&format!(" {zip}"));
        }
        *value = Some(full);
        return maybe_ask_unit(def, value, meta);
    }

    SubFlowResult::Reply(def.question.clone())
}

fn maybe_ask_unit(def: &BookingSlotDef, value: &Option<String>, meta: &mut SlotMeta) -> SubFlowResult {
    let should_ask = match def.unit_number_mode {
        UnitNumberMode::Always => true,
        UnitNumberMode::Never => false,
        UnitNumberMode::Auto => value.as_deref().map(mentions_unit).unwrap_or(false),
    };
    if should_ask && meta.unit_number.is_none() {
        meta.breakdown_step = Some("unit_pending".to_string());
        let prompt = def
            .unit_prompt_variants
            .first()
            .cloned()
            .unwrap_or_else(|| "Is there an apartment or unit number?".to_string());
        return SubFlowResult::Reply(prompt);
    }
    finish_or_confirm(def, meta)
}

fn finish_or_confirm(def: &BookingSlotDef, meta: &mut SlotMeta) -> SubFlowResult {
    if def.confirm_back && !meta.confirmed {
        meta.pending_confirm = true;
        return SubFlowResult::Reply(
            def.confirm_prompt
                .clone()
                .unwrap_or_else(|| "I have that address — is that correct?".to_string()),
        );
    }
    SubFlowResult::Continue
}

/// spec.md §4.6.3 Access sub-flow: activated post-confirmation when the
/// tenant has it enabled and the trade applies. Modeled as its own small
/// state machine nested in the same `SlotMeta`, reusing the
/// property/unit/gate fields reserved for it.
fn maybe_enter_access_flow(
    _def: &BookingSlotDef,
    meta: &mut SlotMeta,
    access: &AccessFlow,
    trade: &str,
) -> SubFlowResult {
    if !access.enabled || (!access.trade_applicability.is_empty() && !access.trade_applicability.iter().any(|t| t.eq_ignore_ascii_case(trade)))
    {
        return SubFlowResult::Continue;
    }

    if access.property_type_enabled && meta.property_type.is_none() {
        meta.breakdown_step = Some("access_property_type".to_string());
        return SubFlowResult::Reply(
            access
                .property_type_question
                .clone()
                .unwrap_or_else(|| "Is this a house, condo, apartment, or commercial property?".to_string()),
        );
    }

    if meta.gated.is_none() {
        meta.breakdown_step = Some("access_gated".to_string());
        return SubFlowResult::Reply(
            access
                .gated_question
                .clone()
                .unwrap_or_else(|| "Is the property in a gated community?".to_string()),
        );
    }

    SubFlowResult::Continue
}

/// Continue the access sub-flow from a follow-up answer. Called by the
/// controller only while `breakdown_step` still starts with `access_`.
pub fn run_access(meta: &mut SlotMeta, access: &AccessFlow, text: &str) -> SubFlowResult {
    let step = meta.breakdown_step.clone().unwrap_or_default();

    if meta.access_follow_ups_asked >= access.max_follow_ups {
        meta.breakdown_step = None;
        // Never loop: give up and record "unknown" (spec.md §4.6.3).
        meta.gate_access_type.get_or_insert_with(|| "unknown_or_not_given".to_string());
        return SubFlowResult::Continue;
    }

    match step.as_str() {
        "access_property_type" => {
            meta.property_type = Some(text.trim().to_lowercase());
            let is_multi = matches!(meta.property_type.as_deref(), Some("condo") | Some("apartment") | Some("commercial"));
            if is_multi {
                meta.breakdown_step = Some("access_unit".to_string());
                return SubFlowResult::Reply(
                    access.unit_question.clone().unwrap_or_else(|| "What's the unit number?".to_string()),
                );
            }
            meta.breakdown_step = Some("access_gated".to_string());
            SubFlowResult::Reply(
                access
                    .gated_question
                    .clone()
                    .unwrap_or_else(|| "Is the property in a gated community?".to_string()),
            )
        }
        "access_unit" => {
            meta.unit_number.get_or_insert_with(|| text.trim().to_string());
            meta.breakdown_step = Some("access_gated".to_string());
            SubFlowResult::Reply(
                access
                    .gated_question
                    .clone()
                    .unwrap_or_else(|| "Is the property in a gated community?".to_string()),
            )
        }
        "access_gated" => {
            let gated = is_affirmative(text);
            meta.gated = Some(gated);
            if !gated {
                meta.breakdown_step = None;
                return SubFlowResult::Continue;
            }
            meta.breakdown_step = Some("access_gate_type".to_string());
            SubFlowResult::Reply(
                access
                    .gate_access_type_question
                    .clone()
                    .unwrap_or_else(|| "Is the gate code, guard, or both?".to_string()),
            )
        }
        "access_gate_type" => {
            let lower = text.to_lowercase();
            meta.gate_access_type = Some(lower.clone());
            if lower.contains("code") {
                meta.breakdown_step = Some("access_gate_code".to_string());
                return SubFlowResult::Reply(
                    access
                        .gate_code_question
                        .clone()
                        .unwrap_or_else(|| "What's the gate code?".to_string()),
                );
            }
            if lower.contains("guard") {
                meta.guard_notified = true;
                meta.breakdown_step = None;
                return SubFlowResult::Reply(
                    access
                        .gate_guard_notify_prompt
                        .clone()
                        .unwrap_or_else(|| "Please let the guard know we're coming.".to_string()),
                );
            }
            meta.access_follow_ups_asked += 1;
            SubFlowResult::Reply(
                access
                    .gate_access_type_question
                    .clone()
                    .unwrap_or_else(|| "Is the gate code, guard, or both?".to_string()),
            )
        }
        "access_gate_code" => {
            meta.gate_code = Some(text.trim().to_string());
            meta.breakdown_step = None;
            SubFlowResult::Continue
        }
        _ => SubFlowResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::config::SlotType;

    fn def(confirm_back: bool, unit_mode: UnitNumberMode) -> BookingSlotDef {
        BookingSlotDef {
            slot_id: "address".into(),
            slot_type: SlotType::Address,
            question: "What's the service address?".into(),
            confirm_prompt: Some("Got it — is that correct?".into()),
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
            unit_number_mode: unit_mode,
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
    fn address_without_zip_triggers_city_breakdown() {
        let d = def(false, UnitNumberMode::Never);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "123 Main Street", &AccessFlow::default(), "hvac");
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert_eq!(meta.breakdown_step.as_deref(), Some("breakdown_city"));
    }

    #[test]
    fn address_with_zip_skips_breakdown() {
        let d = def(false, UnitNumberMode::Never);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "123 Main Street 33901", &AccessFlow::default(), "hvac");
        assert_eq!(result, SubFlowResult::Continue);
        assert!(value.unwrap().contains("33901"));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let d = def(false, UnitNumberMode::Never);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "huh?", &AccessFlow::default(), "hvac");
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert!(value.is_none());
    }

    #[test]
    fn access_flow_gated_with_code_collects_code() {
        let access = AccessFlow {
            enabled: true,
            trade_applicability: vec![],
            property_type_enabled: false,
            max_follow_ups: 2,
            ..Default::default()
        };
        let mut meta = SlotMeta {
            breakdown_step: Some("access_gated".to_string()),
            ..Default::default()
        };
        let r1 = run_access(&mut meta, &access, "yes it's gated");
        assert!(matches!(r1, SubFlowResult::Reply(_)));
        let r2 = run_access(&mut meta, &access, "it's a code");
        assert!(matches!(r2, SubFlowResult::Reply(_)));
        let r3 = run_access(&mut meta, &access, "4821");
        assert_eq!(r3, SubFlowResult::Continue);
        assert_eq!(meta.gate_code.as_deref(), Some("4821"));
    }
}
