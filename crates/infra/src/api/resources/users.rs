//! User administration

use propdesk_domain::{MessageResponse, QueryParams, User, UserRole, UserUpdate};

use super::resource_path;
use crate::api::{ApiClient, RequestOptions};
use crate::errors::ApiError;

const USERS: &str = "/users";

impl ApiClient {
    /// Users, optionally narrowed by role and a name/email search
    pub async fn list_users(&self, role: Option<UserRole>, search: Option<&str>) -> Result<Vec<User>, ApiError> {
        let mut params = QueryParams::new();
        if let Some(role) = role {
            params.insert("role".into(), role.as_str().into());
        }
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            params.insert("search".into(), search.into());
        }
        self.get_as(USERS, &params, RequestOptions::default()).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.get_as(&resource_path(USERS, id), &Default::default(), RequestOptions::default())
            .await
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        self.put_as(&resource_path(USERS, id), update, RequestOptions::default()).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete_as(&resource_path(USERS, id), RequestOptions::default()).await
    }
}
