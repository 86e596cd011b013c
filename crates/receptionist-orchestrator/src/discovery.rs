//! Discovery extraction (spec.md §4.8 step 10): a pattern-based extractor
//! that populates `session.discovery` from the caller's free text, plus the
//! single canonical urgency classifier (spec.md §9: "consolidate multiple
//! detection paths to one canonical urgency classifier with a single enum
//! output").

use receptionist_core::Urgency;
use receptionist_sessions::DiscoveryState;

const EMERGENCY_KEYWORDS: &[&str] = &["emergency", "flooding", "gas smell", "smoke", "sparks", "no heat and freezing"];
const URGENT_KEYWORDS: &[&str] = &["urgent", "as soon as possible", "asap", "right away", "today"];
const REPEAT_KEYWORDS: &[&str] = &["again", "still broken", "came out already", "same issue", "happened before"];

const TECH_MARKERS: &[&str] = &["technician", "tech came", "repairman", "service guy", "service person"];

/// Classify urgency from free text. The single, canonical entry point —
/// every other urgency signal in the system should route through this
/// function rather than re-deriving its own ad hoc keyword list.
pub fn classify_urgency(text: &str) -> Urgency {
    let lower = text.to_lowercase();
    if EMERGENCY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Urgency::Emergency
    } else if REPEAT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Urgency::RepeatIssue
    } else if URGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Urgency::Urgent
    } else {
        Urgency::Normal
    }
}

fn tech_mentioned(text: &str) -> bool {
    let lower = text.to_lowercase();
    TECH_MARKERS.iter().any(|m| lower.contains(m))
}

/// Extract issue/urgency/tech-mention signals from the current utterance
/// and merge them into `discovery`, never downgrading urgency once raised
/// and never clobbering an already-captured issue with an empty guess.
pub fn extract(text: &str, discovery: &mut DiscoveryState, min_confidence: f32) {
    discovery.turn_count += 1;

    let urgency = classify_urgency(text);
    if rank(urgency) > rank(discovery.urgency) {
        discovery.urgency = urgency;
    }

    if tech_mentioned(text) {
        discovery.tech_mentioned = true;
    }

    if discovery.issue.is_none() {
        if let Some(issue) = guess_issue(text, min_confidence) {
            discovery.issue = Some(issue);
        }
    }
}

fn rank(u: Urgency) -> u8 {
    match u {
        Urgency::Normal => 0,
        Urgency::RepeatIssue => 1,
        Urgency::Urgent => 2,
        Urgency::Emergency => 3,
    }
}

/// A conservative, low-precision issue guesser: long enough free text that
/// isn't itself a question is taken as a problem description. Real issue
/// classification is an external scenario-matching concern (spec.md §1
/// Non-goals); this only captures a raw snippet for the audit trail and
/// booking record.
fn guess_issue(text: &str, min_confidence: f32) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return None;
    }
    let word_count = trimmed.split_whitespace().count();
    let confidence = (word_count as f32 / 12.0).min(1.0);
    if word_count < 3 || confidence < min_confidence {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_keywords_outrank_everything() {
        assert_eq!(classify_urgency("I smell gas in the house"), Urgency::Emergency);
    }

    #[test]
    fn urgency_never_downgrades_once_raised() {
        let mut d = DiscoveryState::default();
        extract("I smell gas, please help", &mut d, 0.3);
        assert_eq!(d.urgency, Urgency::Emergency);
        extract("it's fine now actually", &mut d, 0.3);
        assert_eq!(d.urgency, Urgency::Emergency);
    }

    #[test]
    fn tech_mention_is_sticky() {
        let mut d = DiscoveryState::default();
        extract("the technician came out last month for this", &mut d, 0.3);
        assert!(d.tech_mentioned);
    }

    #[test]
    fn question_text_never_becomes_the_issue() {
        let mut d = DiscoveryState::default();
        extract("what time are you open tomorrow?", &mut d, 0.3);
        assert!(d.issue.is_none());
    }
}
