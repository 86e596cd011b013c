//! Consent detector (spec.md §4.3). A pure predicate over
//! `(text, tenant config, session context)`.

use receptionist_core::config::DetectionTriggers;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsentResult {
    pub has_consent: bool,
    pub matched_phrase: Option<String>,
    pub reason: &'static str,
}

fn no_consent(reason: &'static str) -> ConsentResult {
    ConsentResult {
        has_consent: false,
        matched_phrase: None,
        reason,
    }
}

fn yes_consent(reason: &'static str, matched_phrase: Option<String>) -> ConsentResult {
    ConsentResult {
        has_consent: true,
        matched_phrase,
        reason,
    }
}

const AFFIRMATIVE_WORDS: &[&str] = &["yes", "yeah", "sure", "absolutely", "ok", "okay", "please"];
const NEGATION_WORDS: &[&str] = &["not", "don't", "dont", "never", "no"];
const SCHEDULING_OFFER_MARKERS: &[&str] = &[
    "schedule", "appointment", "technician", "send", "come out", "back out",
];
const IMPLICIT_CONSENT_PHRASES: &[&str] = &["i need service", "send someone", "come out", "fix it"];

fn starts_with_affirmative(lower: &str) -> bool {
    AFFIRMATIVE_WORDS
        .iter()
        .any(|w| lower == *w || lower.starts_with(&format!("{w} ")) || lower.starts_with(&format!("{w},")))
}

fn contains_affirmative(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|tok| AFFIRMATIVE_WORDS.contains(&tok))
}

fn contains_negation(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|tok| NEGATION_WORDS.contains(&tok))
}

/// Evaluate consent for the current turn.
///
/// `consent_pending` is `session.booking.consentPending` (set by the
/// scenario cascade's consent-pending side effect). `last_agent_offered_scheduling`
/// is true iff the most recent agent turn's text matched one of the
/// scheduling-offer markers. `has_v110_discovery_flow` gates the implicit-
/// consent-phrase path (spec.md §4.3 rule 5).
pub fn detect_consent(
    text: &str,
    triggers: &DetectionTriggers,
    booking_requires_explicit_consent: bool,
    consent_pending: bool,
    last_agent_offered_scheduling: bool,
    has_v110_discovery_flow: bool,
) -> ConsentResult {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    // Anti-false-positive: a question is never consent.
    if trimmed.ends_with('?') {
        return no_consent("ends_with_question_mark");
    }
    // Acknowledgment + a lot of new content isn't consent either.
    if ["okay", "ok", "alright"].iter().any(|w| lower.starts_with(w)) {
        let word_count = lower.split_whitespace().count();
        if word_count > 9 {
            return no_consent("acknowledgment_with_trailing_content");
        }
    }

    // 1. Legacy bypass.
    if !booking_requires_explicit_consent {
        return yes_consent("consent_not_required_legacy_bypass", None);
    }

    // 2. Explicit wants-booking phrase.
    if let Some(phrase) = triggers.wants_booking.iter().find(|p| lower.contains(p.to_lowercase().as_str())) {
        return yes_consent("wants_booking_phrase_matched", Some(phrase.clone()));
    }

    // 3. Affirmative reply while consent is pending.
    if consent_pending && starts_with_affirmative(&lower) {
        return yes_consent("affirmative_while_consent_pending", None);
    }

    // 4. Agent offered scheduling, caller affirmed without negating.
    if last_agent_offered_scheduling && contains_affirmative(&lower) && !contains_negation(&lower) {
        return yes_consent("affirmed_after_scheduling_offer", None);
    }

    // 5. Implicit consent phrase, only under V110 discovery-flow mode.
    if has_v110_discovery_flow {
        if let Some(phrase) = IMPLICIT_CONSENT_PHRASES.iter().find(|p| lower.contains(*p)) {
            return yes_consent("implicit_consent_phrase_v110", Some(phrase.to_string()));
        }
    }

    no_consent("no_consent_signal_matched")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggers() -> DetectionTriggers {
        DetectionTriggers {
            wants_booking: vec!["book an appointment".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn question_never_grants_consent() {
        let r = detect_consent("can you send someone?", &triggers(), true, false, false, false);
        assert!(!r.has_consent);
    }

    #[test]
    fn explicit_wants_booking_phrase_grants_consent() {
        let r = detect_consent("I'd like to book an appointment please", &triggers(), true, false, false, false);
        assert!(r.has_consent);
    }

    #[test]
    fn affirmative_after_pending_grants_consent() {
        let r = detect_consent("yes that works", &triggers(), true, true, false, false);
        assert!(r.has_consent);
    }

    #[test]
    fn affirmative_after_offer_without_negation() {
        let r = detect_consent("sure, sounds good", &triggers(), true, false, true, false);
        assert!(r.has_consent);
    }

    #[test]
    fn negation_after_offer_blocks_consent() {
        let r = detect_consent("no I don't want that", &triggers(), true, false, true, false);
        assert!(!r.has_consent);
    }

    #[test]
    fn implicit_consent_requires_v110() {
        let r = detect_consent("please send someone", &triggers(), true, false, false, false);
        assert!(!r.has_consent);
        let r = detect_consent("please send someone", &triggers(), true, false, false, true);
        assert!(r.has_consent);
    }

    #[test]
    fn long_acknowledgment_with_new_content_is_not_consent() {
        let r = detect_consent(
            "okay well actually I also wanted to ask about your pricing for a new unit install",
            &triggers(),
            true,
            true,
            false,
            false,
        );
        assert!(!r.has_consent);
    }
}
