use serde::{Deserialize, Serialize};

/// Conversation mode (spec.md §3 `Session.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Discovery,
    Booking,
    Complete,
    Error,
}

impl Mode {
    /// spec.md testable property 3: mode only progresses
    /// DISCOVERY → BOOKING → COMPLETE, and only an explicit "new booking"
    /// keyword may regress COMPLETE back to DISCOVERY.
    pub fn can_transition_to(self, next: Mode, explicit_new_booking: bool) -> bool {
        use Mode::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Discovery, Booking) => true,
            (Booking, Complete) => true,
            (Discovery, Complete) => true,
            (Complete, Discovery) => explicit_new_booking,
            (_, Error) => true,
            (Error, _) => true,
            _ => false,
        }
    }
}

/// Legacy display phase (spec.md §3 `Session.phase`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Greeting,
    Discovery,
    Booking,
    Complete,
    Error,
}

impl From<Mode> for Phase {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Discovery => Phase::Discovery,
            Mode::Booking => Phase::Booking,
            Mode::Complete => Phase::Complete,
            Mode::Error => Phase::Error,
        }
    }
}

/// Canonical urgency enum (spec.md §8 testable property 8; §9 "consolidate
/// to one canonical urgency classifier with a single enum output").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    RepeatIssue,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::RepeatIssue => "repeat_issue",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Urgency::Normal),
            "repeat_issue" => Some(Urgency::RepeatIssue),
            "urgent" => Some(Urgency::Urgent),
            "emergency" => Some(Urgency::Emergency),
            _ => None,
        }
    }
}

/// Which brain produced the reply (spec.md Glossary: Tier-1/1.5/3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Tier1,
    Tier1_5,
    Tier3,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier1",
            Tier::Tier1_5 => "tier1.5",
            Tier::Tier3 => "tier3",
        }
    }
}

/// One agent intent label (spec.md §3 `Session.lastAgentIntent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentIntent {
    OfferSchedule,
    BookingSlotQuestion,
    Discovery,
    AskClarification,
    Transfer,
}

/// Render `{placeholder}` tokens in a template against a lookup table.
///
/// Unknown placeholders are left verbatim (a tenant typo shouldn't blank
/// half the sentence). When a placeholder resolves to an empty/missing
/// value, surrounding punctuation is cleaned up rather than leaving an
/// awkward double space or dangling comma (spec.md §4.5 "Placeholder
/// replacement").
pub fn render_placeholders(template: &str, values: &[(&str, Option<&str>)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        let token = format!("{{{key}}}");
        match value {
            Some(v) if !v.is_empty() => {
                out = out.replace(&token, v);
            }
            _ => {
                out = remove_placeholder_cleanly(&out, &token);
            }
        }
    }
    out
}

/// Remove a placeholder token and tidy the punctuation/whitespace left
/// behind, e.g. `"Thanks, {callerName}."` → `"Thanks."` rather than
/// `"Thanks, ."`.
fn remove_placeholder_cleanly(text: &str, token: &str) -> String {
    let mut out = text.replace(token, "");
    // Collapse ", ." and ",." patterns left by a missing name before punctuation.
    out = out.replace(" ,", ",");
    out = out.replace(", .", ".");
    out = out.replace(",.", ".");
    // Collapse doubled spaces created by removing an interior token.
    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_progression_is_monotonic() {
        assert!(Mode::Discovery.can_transition_to(Mode::Booking, false));
        assert!(Mode::Booking.can_transition_to(Mode::Complete, false));
        assert!(!Mode::Booking.can_transition_to(Mode::Discovery, false));
        assert!(!Mode::Complete.can_transition_to(Mode::Discovery, false));
        assert!(Mode::Complete.can_transition_to(Mode::Discovery, true));
    }

    #[test]
    fn placeholder_render_substitutes_known_values() {
        let out = render_placeholders(
            "Thanks, {callerName}! {companyName} will be in touch.",
            &[("callerName", Some("Mark")), ("companyName", Some("Acme HVAC"))],
        );
        assert_eq!(out, "Thanks, Mark! Acme HVAC will be in touch.");
    }

    #[test]
    fn placeholder_render_cleans_up_missing_name() {
        let out = render_placeholders("Thanks, {callerName}.", &[("callerName", None)]);
        assert_eq!(out, "Thanks.");
    }

    #[test]
    fn urgency_round_trips_through_canonical_strings() {
        for u in [
            Urgency::Normal,
            Urgency::RepeatIssue,
            Urgency::Urgent,
            Urgency::Emergency,
        ] {
            assert_eq!(Urgency::parse(u.as_str()), Some(u));
        }
    }
}
