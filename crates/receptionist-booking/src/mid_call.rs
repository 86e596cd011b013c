//! Mid-call rules (spec.md §4.6.6): evaluated before asking the next slot
//! question, only when the current turn extracted no slot value.

use std::collections::HashMap;

use receptionist_core::config::{MidCallAction, MidCallRule};
pub use receptionist_sessions::MidCallRuleState;

/// Evaluate `rules` against `text`; returns the rendered response and
/// whether it should escalate instead of continuing, for the first rule
/// whose trigger matches and whose cooldown/budget allow it.
///
/// `states` is keyed by the rule's index in `rules` and lives on the slot's
/// own `SlotMeta` (persisted with the session), so a rule's `fired_count`
/// and `last_fired_turn` survive between turns instead of resetting every
/// time this is called.
pub fn evaluate(
    rules: &[MidCallRule],
    states: &mut HashMap<usize, MidCallRuleState>,
    text: &str,
    turn_number: u32,
    slot_question: &str,
) -> Option<(String, bool)> {
    let lower = text.to_lowercase();
    for (idx, rule) in rules.iter().enumerate() {
        if !lower.contains(&rule.trigger.to_lowercase()) {
            continue;
        }
        let state = states.entry(idx).or_default();
        if rule.max_per_call > 0 && state.fired_count >= rule.max_per_call {
            continue;
        }
        if let Some(last) = state.last_fired_turn {
            if turn_number.saturating_sub(last) < rule.cooldown_turns {
                continue;
            }
        }

        state.fired_count += 1;
        state.last_fired_turn = Some(turn_number);

        let mut rendered = rule.response_template.clone();
        if !rendered.contains("{slotQuestion}") {
            rendered.push(' ');
            rendered.push_str(slot_question);
        } else {
            rendered = rendered.replace("{slotQuestion}", slot_question);
        }
        let escalate = matches!(rule.action, MidCallAction::Escalate);
        return Some((rendered, escalate));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(trigger: &str, template: &str, cooldown: u32, max: u32, action: MidCallAction) -> MidCallRule {
        MidCallRule {
            trigger: trigger.to_string(),
            response_template: template.to_string(),
            cooldown_turns: cooldown,
            max_per_call: max,
            action,
        }
    }

    #[test]
    fn matching_rule_auto_appends_slot_question_when_missing() {
        let rules = vec![rule("how much", "Pricing varies by job.", 0, 5, MidCallAction::Continue)];
        let mut states = HashMap::new();
        let out = evaluate(&rules, &mut states, "how much will this cost", 1, "What's your address?").unwrap();
        assert!(out.0.contains("Pricing varies by job."));
        assert!(out.0.contains("What's your address?"));
        assert!(!out.1);
    }

    #[test]
    fn exhausted_budget_does_not_fire_again() {
        let rules = vec![rule("how much", "Pricing varies.", 0, 1, MidCallAction::Continue)];
        let mut states = HashMap::new();
        assert!(evaluate(&rules, &mut states, "how much", 1, "q").is_some());
        assert!(evaluate(&rules, &mut states, "how much", 2, "q").is_none());
    }

    #[test]
    fn budget_persists_across_separate_evaluate_calls_like_separate_turns() {
        // Regression: states must be threaded in from outside (as a
        // persisted SlotMeta field would be), not reconstructed fresh,
        // or the max_per_call budget can never be exhausted.
        let rules = vec![rule("how much", "Pricing varies.", 0, 1, MidCallAction::Continue)];
        let mut states = HashMap::new();
        assert!(evaluate(&rules, &mut states, "how much does it cost", 1, "q").is_some());
        let persisted = states.get(&0).cloned().unwrap();
        assert_eq!(persisted.fired_count, 1);

        let mut states_next_turn = states;
        assert!(evaluate(&rules, &mut states_next_turn, "how much does it cost", 2, "q").is_none());
    }
}
