use serde::{Deserialize, Serialize};

/// A returning caller's directory entry, keyed by phone number within a
/// tenant (spec.md §3 `BookingRequest.customerId` implies a customer
/// lookup by caller-ID; this crate owns that lookup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub company_id: String,
    /// E.164-ish digits, same normalization as `collectedSlots["phone"]`.
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub service_address: Option<String>,
    pub notes: Option<String>,
    pub total_bookings: u32,
    pub last_booking_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
