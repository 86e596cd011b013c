//! `receptionist-booking` — the Booking Flow Controller and Finalizer
//! (spec.md §4.6–§4.7): per-slot sub-flow state machines, loop prevention,
//! mid-call rules, interruption handling, abort handling, and the
//! idempotent booking finalizer.

pub mod abort;
pub mod address_flow;
pub mod confirmation;
pub mod controller;
pub mod db;
pub mod error;
pub mod finalizer;
pub mod interruption;
pub mod loop_prevention;
pub mod mid_call;
pub mod name_flow;
pub mod phone_flow;
pub mod store;
pub mod time_flow;
pub mod types;

pub use controller::{run_turn, BookingTurnOutcome};
pub use error::{BookingError, Result};
pub use finalizer::{CalendarClient, CalendarEvent, NoopCalendarClient, NoopSmsClient, SmsClient};
pub use store::{BookingStore, SqliteBookingStore};
pub use types::{BookingRequest, BookingStatus, SubFlowResult};
