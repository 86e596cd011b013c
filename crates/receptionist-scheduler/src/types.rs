use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Defines when and how often a job should run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run exactly once at the given UTC instant.
    Once { at: DateTime<Utc> },

    /// Run repeatedly with a fixed interval in seconds.
    Interval { every_secs: u64 },

    /// Run every day at the given hour and minute (UTC).
    Daily { hour: u8, minute: u8 },

    /// Run according to a cron expression (parsing support planned for a future phase).
    Cron { expression: String },
}

/// Lifecycle state of a job execution slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Missed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Missed => "missed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "missed" => Ok(JobStatus::Missed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// What a fired reminder job should do. Kept as a plain struct rather than a
/// BookingRequest reference so this crate doesn't need to depend on
/// `receptionist-booking` — the job queue only needs enough to place the SMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderAction {
    pub company_id: String,
    pub booking_id: String,
    pub phone: String,
    pub message: String,
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub schedule: Schedule,
    /// JSON-encoded `ReminderAction` (or any other opaque payload).
    pub action: String,
    pub status: JobStatus,
    pub last_run: Option<String>,
    pub next_run: Option<String>,
    pub run_count: u32,
    pub max_runs: Option<u32>,
    pub created_at: String,
    pub updated_at: String,
}
