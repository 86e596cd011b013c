//! Loop prevention (spec.md §4.6.5): tracks `askedCount` per slot and
//! rephrases or escalates once the tenant's `maxSameQuestion` is exceeded.

use receptionist_core::config::{LoopPrevention, OnLoopAction};
use receptionist_sessions::SlotMeta;

/// Record one more ask of `slot_id`'s question and decide how to present it.
/// Returns the prompt to use (possibly rephrased) and whether this ask
/// should escalate instead.
///
/// `base_question` is the sub-flow's own prompt text for its *current*
/// state (e.g. a name confirm prompt vs. a missing-last-name prompt are
/// different questions even though both belong to the `name` slot) — a
/// change in that text resets the counter instead of accumulating across
/// distinct questions.
pub fn next_prompt(cfg: &LoopPrevention, meta: &mut SlotMeta, base_question: &str) -> (String, bool) {
    if !cfg.enabled {
        return (base_question.to_string(), false);
    }

    if meta.last_asked_question.as_deref() != Some(base_question) {
        meta.asked_count = 0;
        meta.last_asked_question = Some(base_question.to_string());
    }

    meta.asked_count += 1;
    let next_count = meta.asked_count;

    if next_count <= cfg.max_same_question {
        return (base_question.to_string(), false);
    }

    match cfg.on_loop {
        OnLoopAction::Rephrase if next_count <= cfg.max_same_question + 1 => {
            (format!("{} {base_question}", cfg.rephrase_intro), false)
        }
        _ => (base_question.to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_threshold_returns_question_unchanged() {
        let cfg = LoopPrevention {
            enabled: true,
            max_same_question: 2,
            rephrase_intro: "Let me ask differently —".into(),
            on_loop: OnLoopAction::Rephrase,
        };
        let mut meta = SlotMeta::default();
        let (prompt, escalate) = next_prompt(&cfg, &mut meta, "What's your address?");
        assert_eq!(prompt, "What's your address?");
        assert!(!escalate);
    }

    #[test]
    fn exceeding_threshold_rephrases_then_escalates() {
        let cfg = LoopPrevention {
            enabled: true,
            max_same_question: 1,
            rephrase_intro: "Let me ask differently —".into(),
            on_loop: OnLoopAction::Rephrase,
        };
        let mut meta = SlotMeta::default();
        let (_p1, e1) = next_prompt(&cfg, &mut meta, "What's your address?");
        assert!(!e1);
        let (p2, e2) = next_prompt(&cfg, &mut meta, "What's your address?");
        assert!(p2.starts_with("Let me ask differently"));
        assert!(!e2);
        let (_p3, e3) = next_prompt(&cfg, &mut meta, "What's your address?");
        assert!(e3);
    }

    #[test]
    fn a_different_question_for_the_same_slot_does_not_inherit_the_count() {
        let cfg = LoopPrevention {
            enabled: true,
            max_same_question: 2,
            rephrase_intro: "Let me ask differently —".into(),
            on_loop: OnLoopAction::Rephrase,
        };
        let mut meta = SlotMeta::default();
        // Two asks of a confirm prompt, then the sub-flow moves on to a
        // distinct missing-last-name prompt — that shouldn't start at 3.
        let (_p1, e1) = next_prompt(&cfg, &mut meta, "Got it, Mark — is that right?");
        assert!(!e1);
        let (_p2, e2) = next_prompt(&cfg, &mut meta, "Got it, Mark — is that right?");
        assert!(!e2);
        let (p3, e3) = next_prompt(&cfg, &mut meta, "And what's your last name?");
        assert_eq!(p3, "And what's your last name?");
        assert!(!e3);
    }
}
