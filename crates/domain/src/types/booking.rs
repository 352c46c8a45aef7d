//! Reservations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::PropertySummary;
use super::reference::Reference;
use super::user::UserSummary;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl_domain_status_conversions!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub property: Reference<PropertySummary>,
    pub user: Reference<UserSummary>,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: u32,
    pub total_amount: f64,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Number of nights between check-in and check-out
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Body of `POST /bookings`; the server fills in the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub property: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: u32,
    pub total_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}
