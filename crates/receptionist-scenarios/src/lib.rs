pub mod retriever;
pub mod types;

pub use retriever::{scenario, ScenarioError, ScenarioRetriever, StaticScenarioRetriever};
pub use types::{RetrievalResult, Scenario, ScenarioReply};
