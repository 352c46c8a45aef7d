//! Cleaning and turnover tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::PropertySummary;
use super::reference::Reference;
use super::user::UserSummary;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HousekeepingStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl_domain_status_conversions!(HousekeepingStatus {
    Pending => "pending",
    InProgress => "in-progress",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HousekeepingPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl_domain_status_conversions!(HousekeepingPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingTask {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub property: Reference<PropertySummary>,
    #[serde(default)]
    pub room: Option<String>,
    pub task: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<Reference<UserSummary>>,
    #[serde(default)]
    pub status: HousekeepingStatus,
    #[serde(default)]
    pub priority: HousekeepingPriority,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHousekeepingTask {
    pub property: String,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<HousekeepingPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
