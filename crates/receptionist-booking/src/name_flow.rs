//! Name sub-flow (spec.md §4.6.1): `NONE -> PARTIAL -> CONFIRM_PENDING ->
//! SPELLING_VARIANT_PENDING -> LAST_NAME_PENDING -> COMPLETE`.

use receptionist_core::config::BookingSlotDef;
use receptionist_sessions::{NameTokenGuess, SlotMeta};
use receptionist_slots::extract_name;

use crate::types::SubFlowResult;

const MAX_MISSING_PART_ATTEMPTS: u32 = 2;

fn is_affirmative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    matches!(t.as_str(), "yes" | "yeah" | "yep" | "sure" | "correct" | "that's right" | "yup")
}

fn is_negative(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').to_lowercase();
    t == "no" || t.starts_with("no ") || t.starts_with("no,")
}

/// Strip a leading "no"/"no,"/"no " off a negation so a trailing correction
/// ("no, Gonzales") can be re-fed through the name extractor in the same turn.
fn strip_negation_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    if let Some(rest) = lower.strip_prefix("no,") {
        return trimmed[trimmed.len() - rest.len()..].trim_start();
    }
    if let Some(rest) = lower.strip_prefix("no ") {
        return trimmed[trimmed.len() - rest.len()..].trim_start();
    }
    if lower == "no" {
        return "";
    }
    trimmed
}

/// Look up a precomputed spelling variant for `first_name`, if any (spec.md
/// §4.6.1: "must be precomputed admin-side — never scan at runtime").
fn find_spelling_variant<'a>(
    precomputed: &'a std::collections::HashMap<String, Vec<String>>,
    first_name: &str,
) -> Option<&'a [String]> {
    precomputed
        .get(&first_name.to_lowercase())
        .map(|v| v.as_slice())
}

/// "Is that Mark with a K or Marc with a C?" — one question per option,
/// keyed off each variant's distinguishing last letter.
fn spelling_variant_question(options: &[String]) -> String {
    let parts: Vec<String> = options
        .iter()
        .map(|o| {
            let last = o.chars().last().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
            format!("{o} with a {last}")
        })
        .collect();
    format!("Is that {}?", parts.join(" or "))
}

fn parse_spelling_choice(text: &str, options: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    if lower.contains("first") || lower.contains("option 1") || lower.contains("option one") {
        return options.first().cloned();
    }
    if lower.contains("second") || lower.contains("option 2") || lower.contains("option two") {
        return options.get(1).cloned();
    }
    for opt in options {
        if lower.contains(&opt.to_lowercase()) {
            return Some(opt.clone());
        }
        // "with a K" / "with a C" style answers: match the option's distinguishing char.
        if let Some(last_char) = opt.chars().last() {
            let marker = format!("with a {}", last_char.to_lowercase());
            if lower.contains(&marker) {
                return Some(opt.clone());
            }
        }
    }
    None
}

/// Run the name sub-flow for one turn. Returns `Continue` when the slot is
/// already satisfied by the extractor output and the controller should move
/// on without emitting a prompt of its own.
#[allow(clippy::too_many_arguments)]
pub fn run(
    def: &BookingSlotDef,
    value: &mut Option<String>,
    meta: &mut SlotMeta,
    text: &str,
    stop_words: &[String],
    common_first_names: &[String],
    precomputed_variant_map: &std::collections::HashMap<String, Vec<String>>,
    turn_number: u32,
) -> SubFlowResult {
    // SPELLING_VARIANT_PENDING: waiting on a disambiguating answer.
    if meta.asked_spelling_variant && meta.spelling_variant_answer.is_none() {
        let Some(first) = meta.first.clone() else {
            meta.asked_spelling_variant = false;
            return SubFlowResult::Continue;
        };
        let options = find_spelling_variant(precomputed_variant_map, &first)
            .map(|s| s.to_vec())
            .unwrap_or_default();
        if let Some(chosen) = parse_spelling_choice(text, &options) {
            meta.spelling_variant_answer = Some(chosen.clone());
            meta.first = Some(chosen);
            return advance_after_first_name(def, value, meta);
        }
        // Ambiguous — never guess (spec.md §4.6.1).
        return SubFlowResult::Reply(format!(
            "Sorry, could you clarify — is that {}?",
            options.join(" or ")
        ));
    }

    // DUPLICATE_CONFIRM_PENDING: one-turn suspicious-duplicate guard.
    if meta.duplicate_confirm_pending {
        meta.duplicate_confirm_pending = false;
        if is_affirmative(text) {
            return SubFlowResult::Continue;
        }
        if is_negative(text) {
            let remainder = strip_negation_prefix(text);
            if let Some(extracted) = extract_name(remainder, true, stop_words, common_first_names, &[]) {
                let first = meta.first.clone().unwrap_or_default();
                meta.last = Some(extracted.name.clone());
                *value = Some(format!("{first} {}", extracted.name));
                return finalize_if_complete(def, value, meta);
            }
        }
        meta.last = None;
        return SubFlowResult::Reply("Got it — what's your last name?".to_string());
    }

    // LAST_NAME_PENDING: caller previously gave only a first name.
    if meta.first.is_some() && meta.last.is_none() && meta.asked_missing_part_once {
        if let Some(extracted) = extract_name(text, true, stop_words, common_first_names, &[]) {
            let candidate = extracted.name;
            let first = meta.first.clone().unwrap_or_default();
            let repeats_first = candidate.eq_ignore_ascii_case(&first);

            // Suspicious-duplicate guard (spec.md §4.6.1): a repeat of a
            // *common* first name is plausibly a genuine two-word name
            // ("Mark Mark") and gets a clarifying question, checked before
            // the generic retry counter below so it isn't shadowed by it.
            if repeats_first && common_first_names.iter().any(|n| n.eq_ignore_ascii_case(&first)) {
                meta.duplicate_confirm_pending = true;
                return SubFlowResult::Reply(format!(
                    "Just to double-check, is your last name also {first}?"
                ));
            }
            if repeats_first {
                meta.missing_part_attempts += 1;
                if meta.missing_part_attempts >= MAX_MISSING_PART_ATTEMPTS {
                    return SubFlowResult::EscalateTransfer(
                        "I'm having trouble catching your last name — let me get you someone who can help."
                            .to_string(),
                    );
                }
                return SubFlowResult::Reply(
                    "I think I already have your first name — what's your last name?".to_string(),
                );
            }
            meta.last = Some(candidate.clone());
            *value = Some(format!("{first} {candidate}"));
            return SubFlowResult::Continue;
        }
        return SubFlowResult::Reply("And your last name?".to_string());
    }

    // Explicit pattern anywhere: "my name is X", "last name is Y", etc.
    if let Some(extracted) = extract_name(
        text,
        value.is_none(),
        stop_words,
        common_first_names,
        &[value.as_deref().unwrap_or("")],
    ) {
        let candidate = extracted.name;
        let is_single_token = !candidate.contains(' ');

        if !is_single_token {
            *value = Some(candidate);
            return finalize_if_complete(def, value, meta);
        }

        // Single token: decide assumed-first vs assumed-last.
        meta.first = Some(candidate.clone());
        meta.assumed_single_token_as = Some(if common_first_names.iter().any(|n| n.eq_ignore_ascii_case(&candidate)) {
            NameTokenGuess::First
        } else {
            NameTokenGuess::Last
        });
        *value = Some(candidate.clone());

        // A precomputed spelling variant takes priority over the generic
        // confirm-back question — asking "with a K or with a C" settles
        // both spelling and confirmation in one turn (spec.md §4.6.1).
        if meta.spelling_variant_answer.is_none() {
            if let Some(options) = find_spelling_variant(precomputed_variant_map, &candidate) {
                if options.len() >= 2 {
                    meta.asked_spelling_variant = true;
                    return SubFlowResult::Reply(spelling_variant_question(options));
                }
            }
        }

        if def.confirm_back && !meta.last_confirmed {
            meta.nameprompt_turn(turn_number);
            return SubFlowResult::Reply(format!(
                "Just to confirm, I have your name as {}?",
                value.clone().unwrap_or_default()
            ));
        }
        return advance_after_first_name(def, value, meta);
    }

    // CONFIRM_PENDING: waiting on yes/no for a single-token name.
    if value.is_some() && def.confirm_back && !meta.last_confirmed {
        if is_affirmative(text) {
            meta.last_confirmed = true;
            return advance_after_first_name(def, value, meta);
        }
        if is_negative(text) {
            *value = None;
            meta.first = None;
            meta.last = None;
            return SubFlowResult::Reply(def.question.clone());
        }
    }

    SubFlowResult::Reply(def.question.clone())
}

fn advance_after_first_name(def: &BookingSlotDef, value: &mut Option<String>, meta: &mut SlotMeta) -> SubFlowResult {
    if def.ask_full_name && meta.last.is_none() {
        meta.asked_missing_part_once = true;
        let prompt = match meta.assumed_single_token_as {
            Some(NameTokenGuess::First) | None => def
                .last_name_question
                .clone()
                .unwrap_or_else(|| "And your last name?".to_string()),
            Some(NameTokenGuess::Last) => def
                .first_name_question
                .clone()
                .unwrap_or_else(|| "And your first name?".to_string()),
        };
        return SubFlowResult::Reply(prompt);
    }
    finalize_if_complete(def, value, meta)
}

fn finalize_if_complete(_def: &BookingSlotDef, value: &mut Option<String>, _meta: &mut SlotMeta) -> SubFlowResult {
    if value.is_some() {
        SubFlowResult::Continue
    } else {
        SubFlowResult::Reply("Sorry, could you repeat your name?".to_string())
    }
}

trait NamePromptTrace {
    fn nameprompt_turn(&mut self, turn: u32);
}

impl NamePromptTrace for SlotMeta {
    /// Records a `nameTrace`-equivalent marker (spec.md §4.6.1 "Record a
    /// `nameTrace` on each prompt"). `breakdown_step` doubles as the trace
    /// slot for the name flow since it's otherwise unused outside the
    /// phone/address breakdown sub-flows.
    fn nameprompt_turn(&mut self, turn: u32) {
        self.breakdown_step = Some(format!("name_prompt@{turn}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::config::SlotType;

    fn def(confirm_back: bool, ask_full_name: bool) -> BookingSlotDef {
        BookingSlotDef {
            slot_id: "name".into(),
            slot_type: SlotType::Name,
            question: "What's your name?".into(),
            confirm_prompt: None,
            reprompt_variants: vec![],
            required: true,
            confirm_back,
            ask_full_name,
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
            offer_morning_afternoon: false,
        }
    }

    #[test]
    fn full_name_in_one_shot_completes_immediately() {
        let d = def(true, true);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "my name is Mark Smith", &[], &[], &Default::default(), 1);
        assert_eq!(result, SubFlowResult::Continue);
        assert_eq!(value.as_deref(), Some("Mark Smith"));
    }

    #[test]
    fn single_token_with_confirm_back_asks_to_confirm() {
        let d = def(true, false);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "Mark", &[], &["Mark".to_string()], &Default::default(), 1);
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert_eq!(value.as_deref(), Some("Mark"));
        assert!(!meta.last_confirmed);
    }

    #[test]
    fn confirming_single_token_without_full_name_completes() {
        let d = def(true, false);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta::default();
        let result = run(&d, &mut value, &mut meta, "yes", &[], &[], &Default::default(), 2);
        assert_eq!(result, SubFlowResult::Continue);
        assert!(meta.last_confirmed);
    }

    #[test]
    fn confirming_single_token_with_full_name_asks_missing_part() {
        let d = def(true, true);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta::default();
        meta.assumed_single_token_as = Some(NameTokenGuess::First);
        let result = run(&d, &mut value, &mut meta, "yes", &[], &[], &Default::default(), 2);
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert!(meta.asked_missing_part_once);
    }

    #[test]
    fn last_name_pending_concatenates_without_replacing_first() {
        let d = def(false, true);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta {
            first: Some("Mark".to_string()),
            asked_missing_part_once: true,
            ..Default::default()
        };
        let result = run(&d, &mut value, &mut meta, "Smith", &[], &[], &Default::default(), 3);
        assert_eq!(result, SubFlowResult::Continue);
        assert_eq!(value.as_deref(), Some("Mark Smith"));
        assert_eq!(meta.last.as_deref(), Some("Smith"));
    }

    #[test]
    fn duplicate_first_name_as_last_triggers_confirm() {
        let d = def(false, true);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta {
            first: Some("Mark".to_string()),
            asked_missing_part_once: true,
            ..Default::default()
        };
        let common = vec!["Mark".to_string()];
        let result = run(&d, &mut value, &mut meta, "Mark", &[], &common, &Default::default(), 3);
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert!(meta.duplicate_confirm_pending);
    }

    #[test]
    fn duplicate_confirm_rejection_with_correction_completes_in_one_turn() {
        let d = def(false, true);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta {
            first: Some("Mark".to_string()),
            asked_missing_part_once: true,
            duplicate_confirm_pending: true,
            ..Default::default()
        };
        let result = run(&d, &mut value, &mut meta, "no, Gonzales", &[], &[], &Default::default(), 3);
        assert_eq!(result, SubFlowResult::Continue);
        assert_eq!(value.as_deref(), Some("Mark Gonzales"));
        assert_eq!(meta.last.as_deref(), Some("Gonzales"));
        assert!(!meta.duplicate_confirm_pending);
    }

    #[test]
    fn duplicate_confirm_rejection_without_correction_resets_and_reasks() {
        let d = def(false, true);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta {
            first: Some("Mark".to_string()),
            asked_missing_part_once: true,
            duplicate_confirm_pending: true,
            ..Default::default()
        };
        let result = run(&d, &mut value, &mut meta, "no", &[], &[], &Default::default(), 3);
        assert_eq!(
            result,
            SubFlowResult::Reply("Got it — what's your last name?".to_string())
        );
        assert!(meta.last.is_none());
    }

    #[test]
    fn a_precomputed_variant_is_offered_on_first_mention() {
        let d = def(true, true);
        let mut value = None;
        let mut meta = SlotMeta::default();
        let mut variants = std::collections::HashMap::new();
        variants.insert("mark".to_string(), vec!["Mark".to_string(), "Marc".to_string()]);
        let result = run(&d, &mut value, &mut meta, "Mark", &[], &[], &variants, 1);
        assert_eq!(
            result,
            SubFlowResult::Reply("Is that Mark with a K or Marc with a C?".to_string())
        );
        assert!(meta.asked_spelling_variant);
    }

    #[test]
    fn spelling_variant_ambiguous_answer_never_guesses() {
        let d = def(false, false);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta {
            first: Some("Mark".to_string()),
            asked_spelling_variant: true,
            ..Default::default()
        };
        let mut variants = std::collections::HashMap::new();
        variants.insert("mark".to_string(), vec!["Mark".to_string(), "Marc".to_string()]);
        let result = run(&d, &mut value, &mut meta, "umm not sure", &[], &[], &variants, 2);
        assert!(matches!(result, SubFlowResult::Reply(_)));
        assert!(meta.spelling_variant_answer.is_none());
    }

    #[test]
    fn spelling_variant_clear_choice_overwrites_name() {
        let d = def(false, false);
        let mut value = Some("Mark".to_string());
        let mut meta = SlotMeta {
            first: Some("Mark".to_string()),
            asked_spelling_variant: true,
            ..Default::default()
        };
        let mut variants = std::collections::HashMap::new();
        variants.insert("mark".to_string(), vec!["Mark".to_string(), "Marc".to_string()]);
        let result = run(&d, &mut value, &mut meta, "with a C", &[], &[], &variants, 2);
        assert_eq!(result, SubFlowResult::Continue);
        assert_eq!(meta.first.as_deref(), Some("Marc"));
    }
}
