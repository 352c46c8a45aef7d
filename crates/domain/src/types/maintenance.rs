//! Repair requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::PropertySummary;
use super::reference::Reference;
use super::user::UserSummary;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Completed,
}

impl_domain_status_conversions!(MaintenanceStatus {
    Pending => "pending",
    Assigned => "assigned",
    InProgress => "in-progress",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaintenancePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl_domain_status_conversions!(MaintenancePriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub property: Reference<PropertySummary>,
    pub issue: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: MaintenancePriority,
    #[serde(default)]
    pub status: MaintenanceStatus,
    #[serde(default)]
    pub technician: Option<Reference<UserSummary>>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub actual_cost: Option<f64>,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceRequest {
    pub property: String,
    pub issue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<MaintenancePriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Aggregates from `GET /maintenance/stats`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStats {
    pub total_requests: u64,
    pub pending_requests: u64,
    pub in_progress_requests: u64,
    pub completed_requests: u64,
    #[serde(default)]
    pub total_cost: f64,
}

impl MaintenanceStats {
    /// Requests that are neither pending, in progress nor completed
    pub fn assigned_requests(&self) -> u64 {
        self.total_requests.saturating_sub(
            self.pending_requests + self.in_progress_requests + self.completed_requests,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stats() {
        let stats: MaintenanceStats = serde_json::from_str(
            r#"{"totalRequests":10,"pendingRequests":3,"inProgressRequests":2,
                "completedRequests":4,"totalCost":1250.5}"#,
        )
        .unwrap();
        assert_eq!(stats.assigned_requests(), 1);
        assert!((stats.total_cost - 1250.5).abs() < f64::EPSILON);
    }

    #[test]
    fn priority_parses_from_wire() {
        assert_eq!("URGENT".parse::<MaintenancePriority>(), Ok(MaintenancePriority::Urgent));
        let status: MaintenanceStatus = serde_json::from_str(r#""in-progress""#).unwrap();
        assert_eq!(status, MaintenanceStatus::InProgress);
    }
}
