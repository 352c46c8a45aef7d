//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::Identified;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Owner,
    Staff,
    Guest,
    #[default]
    User,
}

impl_domain_status_conversions!(UserRole {
    Admin => "admin",
    Owner => "owner",
    Staff => "staff",
    Guest => "guest",
    User => "user",
});

/// User profile as returned by `/auth/me` and `/users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Populated form of a user reference (`name email`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Identified for UserSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial update for `PUT /users/:id`; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_user_with_mongo_id() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u1","name":"Admin User","email":"admin@example.com","role":"admin",
                "createdAt":"2024-01-05T10:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.is_admin());
        assert!(user.created_at.is_some());
    }

    #[test]
    fn empty_update_serializes_to_empty_object() {
        let body = serde_json::to_value(UserUpdate::default()).unwrap();
        assert_eq!(body, serde_json::json!({}));
    }
}
