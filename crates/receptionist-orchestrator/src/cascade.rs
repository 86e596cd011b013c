//! Scenario Response Cascade (spec.md §4.5): the Tier-1.5 short-circuit that
//! answers from a pre-written scenario reply instead of calling the LLM.

use receptionist_core::config::{Company, DiscoveryConsent};
use receptionist_core::render_placeholders;
use receptionist_scenarios::{RetrievalResult, Scenario, ScenarioReply};
use receptionist_sessions::Session;

pub struct CascadeResult {
    pub reply: String,
    pub scenario_id: String,
    pub match_confidence: f32,
    pub consent_pending_set: bool,
}

const ISSUE_KEYWORDS: &[&str] = &["not cooling", "not heating", "broken", "leak", "leaking", "won't start", "no power"];
const POSITIVE_AFFIRMATIONS: &[&str] = &["sounds good", "great", "perfect", "awesome"];
const SCHEDULING_IMPLIED_MARKERS: &[&str] = &["we'll send", "get a tech out", "schedule", "let me get", "come take a look"];

/// Attempt the Tier-1.5 short-circuit. Returns `None` when no scenario
/// clears the threshold, or when the tenant has opted out of auto-replies
/// for this discovery lane (unless V110 owner-priority overrides).
pub fn try_short_circuit(
    user_text: &str,
    result: &RetrievalResult,
    company: &Company,
    tier1_threshold: f32,
    session: &mut Session,
    current_turn: u32,
) -> Option<CascadeResult> {
    let top = result.top_match.as_ref()?;
    if top.confidence < tier1_threshold {
        return None;
    }

    let consent = &company.front_desk_behavior.discovery_consent;
    let v110 = consent.is_v110();
    if !v110 && (consent.disable_scenario_auto_responses || consent.force_llm_discovery) {
        return None;
    }

    let reply_text = select_reply(top, user_text)?;
    if described_a_problem(user_text) && starts_with_positive_affirmation(&reply_text) {
        return None;
    }

    let rendered = render_scenario_reply(&reply_text, company);

    let mut consent_pending_set = false;
    if implies_scheduling(&reply_text) && !session.booking.consent_given {
        session.flags.insert("consent_pending".to_string(), true);
        session.booking.consent_turn = Some(current_turn);
        consent_pending_set = true;
    }

    let final_reply = if consent_pending_set {
        append_consent_question(rendered, consent)
    } else {
        rendered
    };

    Some(CascadeResult {
        reply: final_reply,
        scenario_id: top.scenario_id.clone(),
        match_confidence: top.confidence,
        consent_pending_set,
    })
}

fn select_reply(scenario: &Scenario, user_text: &str) -> Option<String> {
    let word_count = user_text.split_whitespace().count();
    let has_issue_keyword = {
        let lower = user_text.to_lowercase();
        ISSUE_KEYWORDS.iter().any(|k| lower.contains(k))
    };
    let prefer_full = word_count > 30 || (word_count > 15 && has_issue_keyword);

    match &scenario.reply {
        ScenarioReply::None => None,
        ScenarioReply::QuickOnly(q) => q.first().cloned(),
        ScenarioReply::FullOnly(f) => f.first().cloned(),
        ScenarioReply::Both { quick, full } => {
            if prefer_full {
                full.first().cloned()
            } else {
                quick.first().cloned()
            }
        }
    }
}

fn described_a_problem(text: &str) -> bool {
    let lower = text.to_lowercase();
    ISSUE_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn starts_with_positive_affirmation(reply: &str) -> bool {
    let lower = reply.trim().to_lowercase();
    POSITIVE_AFFIRMATIONS.iter().any(|p| lower.starts_with(p))
}

fn implies_scheduling(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    SCHEDULING_IMPLIED_MARKERS.iter().any(|m| lower.contains(m))
}

fn render_scenario_reply(template: &str, company: &Company) -> String {
    let areas = company.service_areas.join(", ");
    render_placeholders(
        template,
        &[
            ("callerName", None),
            ("companyName", Some(company.name.as_str())),
            ("serviceAreas", if areas.is_empty() { None } else { Some(areas.as_str()) }),
        ],
    )
}

fn append_consent_question(reply: String, consent: &DiscoveryConsent) -> String {
    match &consent.consent_question_template {
        Some(template) if consent.auto_inject_consent_in_scenarios => format!("{reply} {template}"),
        _ => reply,
    }
}
