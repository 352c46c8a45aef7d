//! Resource types exchanged with the PropDesk backend
//!
//! Documents use MongoDB-style `_id` identifiers and camelCase field names.
//! Relations may come back as a bare id or as a populated sub-document; see
//! [`Reference`].

pub mod auth;
pub mod booking;
pub mod housekeeping;
pub mod maintenance;
pub mod pagination;
pub mod property;
pub mod reference;
pub mod user;

use std::collections::BTreeMap;

pub use auth::{AuthResponse, Credentials, LoginRequest, RefreshRequest, RegisterRequest};
pub use booking::{Booking, BookingStatus, NewBooking};
pub use housekeeping::{HousekeepingPriority, HousekeepingStatus, HousekeepingTask, NewHousekeepingTask};
pub use maintenance::{
    MaintenancePriority, MaintenanceRequest, MaintenanceStats, MaintenanceStatus,
    NewMaintenanceRequest,
};
pub use pagination::Page;
pub use property::{Property, PropertyDraft, PropertyFilters, PropertySummary, Review};
pub use reference::{Identified, Reference};
pub use user::{User, UserRole, UserSummary, UserUpdate};

/// Query string parameters; ordered so equal parameter sets render identically
pub type QueryParams = BTreeMap<String, String>;

/// Server acknowledgement such as `{ "message": "Property deleted" }`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
