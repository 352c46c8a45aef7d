//! Bookings

use propdesk_domain::{Booking, BookingStatus, NewBooking};
use serde_json::json;

use super::resource_path;
use crate::api::{ApiClient, RequestOptions};
use crate::errors::ApiError;

const BOOKINGS: &str = "/bookings";

impl ApiClient {
    /// Bookings visible to the caller (all of them for admins)
    pub async fn list_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.get_as(BOOKINGS, &Default::default(), RequestOptions::default()).await
    }

    pub async fn get_booking(&self, id: &str) -> Result<Booking, ApiError> {
        self.get_as(&resource_path(BOOKINGS, id), &Default::default(), RequestOptions::default())
            .await
    }

    pub async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, ApiError> {
        self.post_as(BOOKINGS, booking, RequestOptions::default()).await
    }

    pub async fn update_booking_status(&self, id: &str, status: BookingStatus) -> Result<Booking, ApiError> {
        let endpoint = format!("{}/status", resource_path(BOOKINGS, id));
        self.put_as(&endpoint, &json!({ "status": status }), RequestOptions::default()).await
    }
}
