use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use tracing::warn;

use crate::types::Schedule;

/// Compute the next UTC execution time for `schedule` starting *after* `from`.
///
/// Returns `None` when the schedule is exhausted (a `Once` job whose time has
/// already passed) or not yet supported (`Cron`).
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => {
            if *at > from {
                Some(*at)
            } else {
                None
            }
        }

        Schedule::Interval { every_secs } => Some(from + Duration::seconds(*every_secs as i64)),

        Schedule::Daily { hour, minute } => {
            let candidate = Utc
                .with_ymd_and_hms(from.year(), from.month(), from.day(), *hour as u32, *minute as u32, 0)
                .single()?;
            if candidate > from {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(1))
            }
        }

        Schedule::Cron { .. } => {
            warn!("cron schedule type is not yet supported; next_run will not be set");
            None
        }
    }
}
