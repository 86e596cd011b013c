use serde::{Deserialize, Serialize};

/// The reply payload a matched scenario can offer. Replaces duck-typing
/// over `quickReplies`/`fullReplies` presence (spec.md §9) with a sum type
/// the selection heuristic can match on exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioReply {
    QuickOnly(Vec<String>),
    FullOnly(Vec<String>),
    Both { quick: Vec<String>, full: Vec<String> },
    None,
}

impl ScenarioReply {
    pub fn from_parts(quick: Vec<String>, full: Vec<String>) -> Self {
        match (quick.is_empty(), full.is_empty()) {
            (true, true) => ScenarioReply::None,
            (false, true) => ScenarioReply::QuickOnly(quick),
            (true, false) => ScenarioReply::FullOnly(full),
            (false, false) => ScenarioReply::Both { quick, full },
        }
    }

    pub fn quick(&self) -> Option<&[String]> {
        match self {
            ScenarioReply::QuickOnly(q) => Some(q),
            ScenarioReply::Both { quick, .. } => Some(quick),
            _ => None,
        }
    }

    pub fn full(&self) -> Option<&[String]> {
        match self {
            ScenarioReply::FullOnly(f) => Some(f),
            ScenarioReply::Both { full, .. } => Some(full),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ScenarioReply::None)
    }
}

/// A ranked scenario candidate returned by the retriever (spec.md §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    pub name: String,
    pub scenario_type: String,
    pub reply: ScenarioReply,
    pub triggers: Vec<String>,
    pub confidence: f32,
    pub template_id: Option<String>,
    pub category_name: Option<String>,
}

/// Full retrieval result (spec.md §6.3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetrievalResult {
    pub scenarios: Vec<Scenario>,
    pub top_match: Option<Scenario>,
    pub top_match_confidence: f32,
    pub matching_trace: Vec<String>,
    pub total_available: usize,
}
