//! Abort handling (spec.md §4.6.9): tenant-configured abort phrases, or two
//! consecutive silences while a slot is `pendingConfirm`, end the booking
//! with a `message_taken` outcome.

pub fn matches_abort_phrase(text: &str, abort_phrases: &[String]) -> bool {
    let lower = text.to_lowercase();
    abort_phrases.iter().any(|p| lower.contains(&p.to_lowercase()))
}

pub fn silence_abort_triggered(consecutive_silences_during_pending_confirm: u32) -> bool {
    consecutive_silences_during_pending_confirm >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_phrase_matches_case_insensitively() {
        let phrases = vec!["never mind".to_string(), "cancel".to_string()];
        assert!(matches_abort_phrase("Actually, Never Mind", &phrases));
        assert!(!matches_abort_phrase("let's continue", &phrases));
    }

    #[test]
    fn two_consecutive_silences_trigger_abort() {
        assert!(!silence_abort_triggered(1));
        assert!(silence_abort_triggered(2));
    }
}
