use async_trait::async_trait;
use thiserror::Error;

use crate::types::{RetrievalResult, Scenario, ScenarioReply};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario retrieval timed out")]
    Timeout,
    #[error("scenario retriever backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// spec.md §6.3 Scenario Retriever.
#[async_trait]
pub trait ScenarioRetriever: Send + Sync {
    async fn retrieve_relevant_scenarios(
        &self,
        company_id: &str,
        trade: &str,
        utterance: &str,
        template_id: Option<&str>,
        call_sid: Option<&str>,
    ) -> Result<RetrievalResult>;
}

/// A fixed-list stub retriever for tests and for tenants with no scenario
/// engine configured — the real scenario matcher is an external
/// collaborator, out of scope here.
#[derive(Default)]
pub struct StaticScenarioRetriever {
    pub scenarios: Vec<Scenario>,
}

impl StaticScenarioRetriever {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    pub fn empty() -> Self {
        Self { scenarios: Vec::new() }
    }
}

#[async_trait]
impl ScenarioRetriever for StaticScenarioRetriever {
    async fn retrieve_relevant_scenarios(
        &self,
        _company_id: &str,
        _trade: &str,
        utterance: &str,
        _template_id: Option<&str>,
        _call_sid: Option<&str>,
    ) -> Result<RetrievalResult> {
        let lower = utterance.to_lowercase();
        let mut matches: Vec<Scenario> = self
            .scenarios
            .iter()
            .filter(|s| s.triggers.iter().any(|t| lower.contains(&t.to_lowercase())))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

        let top_match = matches.first().cloned();
        let top_match_confidence = top_match.as_ref().map(|s| s.confidence).unwrap_or(0.0);
        let trace = matches
            .iter()
            .map(|s| format!("{}:{:.2}", s.scenario_id, s.confidence))
            .collect();

        Ok(RetrievalResult {
            total_available: self.scenarios.len(),
            scenarios: matches,
            top_match,
            top_match_confidence,
            matching_trace: trace,
        })
    }
}

/// Convenience constructor used by tests and the gateway's demo seed data.
pub fn scenario(
    scenario_id: &str,
    name: &str,
    scenario_type: &str,
    triggers: &[&str],
    quick: &[&str],
    full: &[&str],
    confidence: f32,
) -> Scenario {
    Scenario {
        scenario_id: scenario_id.to_string(),
        name: name.to_string(),
        scenario_type: scenario_type.to_string(),
        reply: ScenarioReply::from_parts(
            quick.iter().map(|s| s.to_string()).collect(),
            full.iter().map(|s| s.to_string()).collect(),
        ),
        triggers: triggers.iter().map(|s| s.to_string()).collect(),
        confidence,
        template_id: None,
        category_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retrieves_highest_confidence_match_first() {
        let retriever = StaticScenarioRetriever::new(vec![
            scenario("s1", "Low", "general", &["hello"], &["Hi!"], &[], 0.4),
            scenario("s2", "High", "general", &["hello"], &["Hey there!"], &[], 0.9),
        ]);
        let result = retriever
            .retrieve_relevant_scenarios("acme", "hvac", "hello there", None, None)
            .await
            .unwrap();
        assert_eq!(result.top_match.unwrap().scenario_id, "s2");
    }

    #[tokio::test]
    async fn no_trigger_match_returns_no_top_match() {
        let retriever = StaticScenarioRetriever::new(vec![scenario(
            "s1", "Greeting", "general", &["hello"], &["Hi!"], &[], 0.9,
        )]);
        let result = retriever
            .retrieve_relevant_scenarios("acme", "hvac", "my ac is broken", None, None)
            .await
            .unwrap();
        assert!(result.top_match.is_none());
    }
}
