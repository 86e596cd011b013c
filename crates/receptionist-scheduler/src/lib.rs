//! `receptionist-scheduler` — Tokio-based reminder scheduler with SQLite persistence.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table. The [`engine::SchedulerEngine`]
//! polls the database every second and fires any job whose `next_run` has
//! arrived, delivering it on an `mpsc` channel for the gateway to dispatch
//! (e.g. a reminder SMS per spec §4.7).
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                            |
//! |------------|-------------------------------------------------------|
//! | `Once`     | Single fire at an absolute UTC instant                |
//! | `Interval` | Repeat every N seconds                                |
//! | `Daily`    | Fire at HH:MM UTC every day                           |
//! | `Cron`     | Cron expression (parsing planned for a future phase)  |

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use types::{Job, JobStatus, ReminderAction, Schedule};
