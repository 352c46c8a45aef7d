//! Housekeeping tasks

use propdesk_domain::{HousekeepingTask, MessageResponse, NewHousekeepingTask, QueryParams};
use serde::Serialize;

use super::resource_path;
use crate::api::{ApiClient, RequestOptions};
use crate::errors::ApiError;

const HOUSEKEEPING: &str = "/housekeeping";

impl ApiClient {
    /// Tasks matching `filters` (`status`, `priority`, `property`, ...)
    pub async fn list_housekeeping_tasks(&self, filters: &QueryParams) -> Result<Vec<HousekeepingTask>, ApiError> {
        self.get_as(HOUSEKEEPING, filters, RequestOptions::default()).await
    }

    pub async fn create_housekeeping_task(&self, task: &NewHousekeepingTask) -> Result<HousekeepingTask, ApiError> {
        self.post_as(HOUSEKEEPING, task, RequestOptions::default()).await
    }

    /// Update with any serializable patch, e.g. `json!({"status": "completed"})`
    pub async fn update_housekeeping_task<P>(&self, id: &str, patch: &P) -> Result<HousekeepingTask, ApiError>
    where
        P: Serialize + ?Sized,
    {
        self.put_as(&resource_path(HOUSEKEEPING, id), patch, RequestOptions::default()).await
    }

    pub async fn delete_housekeeping_task(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete_as(&resource_path(HOUSEKEEPING, id), RequestOptions::default()).await
    }
}
