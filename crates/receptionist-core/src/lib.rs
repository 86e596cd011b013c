//! Shared types, tenant configuration, and error taxonomy for the
//! receptionist conversation core.

pub mod config;
pub mod config_reader;
pub mod error;
pub mod ids;
pub mod types;

pub use config::{AppConfig, Company};
pub use config_reader::AwConfigReader;
pub use error::{CoreError, Result};
pub use ids::{Channel, CompanyId, SessionId, TurnTraceId};
pub use types::{render_placeholders, AgentIntent, Mode, Phase, Tier, Urgency};
