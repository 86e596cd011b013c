//! Deterministic intercepts: zero-token, Tier-1 responses evaluated in
//! strict order before any other routing. Modeled as a plain ordered chain
//! of pure checks, each returning `Some(InterceptResult)` to short-circuit
//! the turn or `None` to fall through to the next check — a fixed chain,
//! not admin-configurable.

use receptionist_core::config::{Company, GreetingRule};
use receptionist_core::render_placeholders;
use receptionist_sessions::{Session, SessionLocks};
use receptionist_slots::is_effectively_silent;

pub struct InterceptResult {
    pub reply: String,
    pub match_source: &'static str,
    pub requires_transfer: bool,
}

impl InterceptResult {
    fn new(reply: impl Into<String>, match_source: &'static str) -> Self {
        Self {
            reply: reply.into(),
            match_source,
            requires_transfer: false,
        }
    }

    fn transfer(reply: impl Into<String>, match_source: &'static str) -> Self {
        Self {
            reply: reply.into(),
            match_source,
            requires_transfer: true,
        }
    }
}

/// Run the full intercept chain. `last_agent_text` is the previous
/// assistant turn's text, if any (used by the "repeat" meta-intent).
pub fn run(text: &str, session: &mut Session, company: &Company) -> Option<InterceptResult> {
    silence(text, session, company)
        .or_else(|| greeting(text, session, company))
        .or_else(|| escalation(text, company))
        .or_else(|| meta_intent(text, session))
}

fn silence(text: &str, session: &mut Session, company: &Company) -> Option<InterceptResult> {
    if !is_effectively_silent(text) {
        return None;
    }
    let behavior = &company.front_desk_behavior;
    // `silence_count` already reflects this turn (the orchestrator
    // increments it for every consecutive silent turn before running the
    // intercept chain), so a count of 1 is the caller's first silence.
    let count = session.metrics.silence_count;
    if count >= behavior.silence_transfer_after {
        return Some(InterceptResult::transfer(
            company.front_desk_behavior.escalation.transfer_message.clone(),
            "silence_transfer",
        ));
    }
    let prompts = &behavior.silence_prompts;
    let prompt = if prompts.is_empty() {
        "I'm sorry, could you repeat that?".to_string()
    } else {
        prompts[(count.saturating_sub(1) as usize) % prompts.len()].clone()
    };
    Some(InterceptResult::new(prompt, "silence_intercept"))
}

fn strip_filler_prefixes(text: &str) -> &str {
    let lower = text.trim().to_lowercase();
    for prefix in ["yes, ", "yeah, ", "uh ", "um "] {
        if lower.starts_with(prefix) {
            return text.trim()[prefix.len()..].trim();
        }
    }
    text.trim()
}

fn matches_greeting(text: &str, rule: &GreetingRule) -> bool {
    let candidate = strip_filler_prefixes(text).to_lowercase();
    let trigger = rule.trigger.to_lowercase();
    if rule.fuzzy {
        candidate.contains(&trigger)
    } else {
        candidate == trigger
    }
}

fn greeting(text: &str, session: &mut Session, company: &Company) -> Option<InterceptResult> {
    if session.locks.greeted {
        return None;
    }
    let rule = company
        .front_desk_behavior
        .conversation_stages
        .greeting_rules
        .iter()
        .find(|r| matches_greeting(text, r))?;

    let now = chrono::Local::now().format("%I:%M %p").to_string();
    let rendered = render_placeholders(
        &rule.response,
        &[("companyName", Some(company.name.as_str())), ("time", Some(now.as_str()))],
    );
    SessionLocks::set_once(&mut session.locks.greeted);
    Some(InterceptResult::new(rendered, "greeting_intercept"))
}

fn escalation(text: &str, company: &Company) -> Option<InterceptResult> {
    let esc = &company.front_desk_behavior.escalation;
    if !esc.enabled {
        return None;
    }
    let lower = text.to_lowercase();
    esc.trigger_phrases
        .iter()
        .any(|p| lower.contains(&p.to_lowercase()))
        .then(|| InterceptResult::transfer(esc.transfer_message.clone(), "escalation_intercept"))
}

const REPEAT_PATTERNS: &[&str] = &["say that again", "didn't catch that", "what did you say"];
const CONFIRM_INFO_PATTERNS: &[&str] = &["read that back", "can you confirm", "confirm what you have"];
const REPAIR_PATTERNS: &[&str] = &["you're not listening", "i already told you"];

fn meta_intent(text: &str, session: &mut Session) -> Option<InterceptResult> {
    let lower = text.to_lowercase();

    if REPEAT_PATTERNS.iter().any(|p| lower.contains(p)) {
        let last = session
            .turns
            .iter()
            .rev()
            .find(|t| matches!(t.role, receptionist_sessions::TurnRole::Assistant))
            .map(|t| t.text.clone());
        return Some(InterceptResult::new(
            last.unwrap_or_else(|| "Sorry, could you tell me what you need?".to_string()),
            "meta_repeat",
        ));
    }

    if CONFIRM_INFO_PATTERNS.iter().any(|p| lower.contains(p)) {
        if session.collected_slots.is_empty() {
            return Some(InterceptResult::new(
                "I don't have any details from you yet — what's going on?".to_string(),
                "meta_confirm_info",
            ));
        }
        let summary = session
            .collected_slots
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Some(InterceptResult::new(format!("Here's what I have — {summary}."), "meta_confirm_info"));
    }

    if let Some(slot) = query_slot_target(&lower) {
        let value = session.collected_slots.get(slot);
        let reply = match value {
            Some(v) => format!("I have your {slot} as {v}."),
            None => format!("I don't have a {slot} on file yet — what is it?"),
        };
        return Some(InterceptResult::new(reply, "meta_query_slot"));
    }

    if lower.contains("who was the technician") || lower.contains("which technician") {
        let reply = session
            .memory
            .facts
            .get("last_technician")
            .map(|t| format!("Our records show {t} was out last time."))
            .unwrap_or_else(|| "I don't see a technician on file for your last visit — I can have someone check.".to_string());
        return Some(InterceptResult::new(reply, "meta_query_tech_history"));
    }

    if REPAIR_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(InterceptResult::new(
            "I'm sorry about that — let's get this sorted. Could you tell me again?".to_string(),
            "meta_repair_behavior",
        ));
    }

    None
}

fn query_slot_target(lower: &str) -> Option<&'static str> {
    if !lower.contains("what") && !lower.contains("do you have") {
        return None;
    }
    if lower.contains("address") {
        Some("address")
    } else if lower.contains("name") {
        Some("name")
    } else if lower.contains("phone") || lower.contains("number") {
        Some("phone")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::{Channel, CompanyId};
    use receptionist_sessions::SessionKey;

    fn company() -> Company {
        Company {
            company_id: "acme".into(),
            name: "Acme HVAC".into(),
            trade: "hvac".into(),
            service_areas: vec![],
            front_desk_behavior: receptionist_core::config::FrontDeskBehavior {
                booking_slots: vec![],
                conversation_stages: receptionist_core::config::ConversationStages {
                    greeting_rules: vec![GreetingRule {
                        trigger: "hello".into(),
                        response: "Hi, thanks for calling {companyName}!".into(),
                        fuzzy: true,
                    }],
                },
                detection_triggers: Default::default(),
                discovery_consent: Default::default(),
                name_spelling_variants: Default::default(),
                fast_path_booking: Default::default(),
                booking_outcome: Default::default(),
                escalation: receptionist_core::config::Escalation {
                    enabled: true,
                    trigger_phrases: vec!["speak to a manager".into()],
                    transfer_message: "Connecting you now.".into(),
                    offer_message: "Want a transfer?".into(),
                },
                loop_prevention: Default::default(),
                access_flow: Default::default(),
                caller_vocabulary: Default::default(),
                filler_words: Default::default(),
                name_stop_words: vec![],
                common_first_names: vec![],
                stt_protected_words: vec![],
                booking_abort_phrases: vec![],
                silence_prompts: vec!["Still there?".into()],
                silence_transfer_after: 2,
            },
            calendar_config: Default::default(),
            sms_config: Default::default(),
        }
    }

    fn session() -> Session {
        Session::new(SessionKey::new(CompanyId::from("acme"), Channel::Voice, "CA1"))
    }

    #[test]
    fn silence_cycles_prompts_then_offers_transfer() {
        let mut s = session();
        let c = company();
        s.metrics.silence_count = 0;
        let r = run("", &mut s, &c).unwrap();
        assert_eq!(r.match_source, "silence_intercept");
        s.metrics.silence_count = 2;
        let r = run("", &mut s, &c).unwrap();
        assert!(r.requires_transfer);
    }

    #[test]
    fn greeting_fires_once_then_never_again() {
        let mut s = session();
        let c = company();
        let r = run("hello there", &mut s, &c).unwrap();
        assert!(r.reply.contains("Acme HVAC"));
        assert!(s.locks.greeted);
        assert!(run("hello there", &mut s, &c).is_none());
    }

    #[test]
    fn escalation_trigger_requires_transfer() {
        let mut s = session();
        s.locks.greeted = true;
        let c = company();
        let r = run("let me speak to a manager", &mut s, &c).unwrap();
        assert!(r.requires_transfer);
    }

    #[test]
    fn query_slot_returns_stored_value() {
        let mut s = session();
        s.locks.greeted = true;
        s.collected_slots.insert("phone".to_string(), "2395551234".to_string());
        let c = company();
        let r = run("what phone number do you have for me?", &mut s, &c).unwrap();
        assert!(r.reply.contains("2395551234"));
    }
}
