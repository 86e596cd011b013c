//! Deterministic post-response compliance check (spec.md §4.10): placeholder
//! leak, banned phrases, verbosity cap, mode-appropriate booking momentum.
//! Runs after a reply is generated and before it is returned to the caller;
//! its result is folded into the turn's audit record, never into the reply
//! text itself.

use receptionist_core::Mode;

use crate::types::ComplianceResult;

/// Replies longer than this many words are flagged as over-verbose for a
/// voice channel (spec.md §4.10 "verbosity cap").
const MAX_WORDS: usize = 60;

pub fn check(reply: &str, mode: Mode, banned_phrases: &[String]) -> ComplianceResult {
    let mut violations = Vec::new();
    let mut hard_fail = false;
    let mut hard_fail_reason = None;

    if reply.contains('{') && reply.contains('}') {
        violations.push("name_placeholder_leaked".to_string());
        hard_fail = true;
        hard_fail_reason.get_or_insert_with(|| "unrendered placeholder in reply".to_string());
    }

    let lower = reply.to_lowercase();
    for phrase in banned_phrases {
        if lower.contains(&phrase.to_lowercase()) {
            violations.push(format!("banned_phrase:{phrase}"));
            hard_fail = true;
            hard_fail_reason.get_or_insert_with(|| format!("banned phrase used: {phrase}"));
        }
    }

    let word_count = reply.split_whitespace().count();
    if word_count > MAX_WORDS {
        violations.push("verbosity_exceeded".to_string());
    }

    if mode == Mode::Booking && !reply.contains('?') && !reply.ends_with('.') {
        // A booking-mode reply with neither a question nor a terminal
        // statement is a momentum violation — it neither moves the slot
        // cascade forward nor closes it out.
        violations.push("booking_momentum_stalled".to_string());
    }

    let score = if violations.is_empty() {
        1.0
    } else {
        (1.0 - 0.25 * violations.len() as f64).max(0.0)
    };

    ComplianceResult {
        passed: !hard_fail,
        hard_fail,
        hard_fail_reason,
        score,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_reply_passes() {
        let result = check("Got it — what's your phone number?", Mode::Booking, &[]);
        assert!(result.passed);
        assert!(!result.hard_fail);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn unrendered_placeholder_hard_fails() {
        let result = check("Thanks {name}, we'll see you then.", Mode::Complete, &[]);
        assert!(!result.passed);
        assert!(result.hard_fail);
        assert!(result.violations.contains(&"name_placeholder_leaked".to_string()));
    }

    #[test]
    fn banned_phrase_hard_fails() {
        let banned = vec!["guaranteed".to_string()];
        let result = check("We have a guaranteed slot for you.", Mode::Discovery, &banned);
        assert!(result.hard_fail);
    }

    #[test]
    fn overly_long_reply_is_flagged_but_not_hard_failed() {
        let long_reply = "word ".repeat(61);
        let result = check(&long_reply, Mode::Discovery, &[]);
        assert!(result.passed);
        assert!(result.violations.contains(&"verbosity_exceeded".to_string()));
    }
}
