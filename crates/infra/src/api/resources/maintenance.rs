//! Maintenance requests

use propdesk_domain::{MaintenanceRequest, MaintenanceStats, MessageResponse, NewMaintenanceRequest, QueryParams};
use serde::Serialize;

use super::resource_path;
use crate::api::{ApiClient, RequestOptions};
use crate::errors::ApiError;

const MAINTENANCE: &str = "/maintenance";

impl ApiClient {
    pub async fn list_maintenance_requests(&self, filters: &QueryParams) -> Result<Vec<MaintenanceRequest>, ApiError> {
        self.get_as(MAINTENANCE, filters, RequestOptions::default()).await
    }

    pub async fn create_maintenance_request(
        &self,
        request: &NewMaintenanceRequest,
    ) -> Result<MaintenanceRequest, ApiError> {
        self.post_as(MAINTENANCE, request, RequestOptions::default()).await
    }

    pub async fn update_maintenance_request<P>(&self, id: &str, patch: &P) -> Result<MaintenanceRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        self.put_as(&resource_path(MAINTENANCE, id), patch, RequestOptions::default()).await
    }

    pub async fn delete_maintenance_request(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete_as(&resource_path(MAINTENANCE, id), RequestOptions::default()).await
    }

    /// Aggregate counts and cost; shares the `maintenance` cache family, so
    /// any maintenance mutation refreshes it
    pub async fn maintenance_stats(&self) -> Result<MaintenanceStats, ApiError> {
        self.get_as("/maintenance/stats", &Default::default(), RequestOptions::default())
            .await
    }
}
