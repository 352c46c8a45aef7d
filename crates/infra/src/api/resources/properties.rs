//! Property listings

use propdesk_domain::{MessageResponse, Property, PropertyDraft, PropertyFilters};

use super::resource_path;
use crate::api::client::decode;
use crate::api::{ApiClient, RequestOptions};
use crate::errors::ApiError;
use crate::http::{FormData, HttpMethod, UploadFile};

const PROPERTIES: &str = "/properties";
const IMAGE_FIELD: &str = "images";

fn draft_form(draft: &PropertyDraft) -> FormData {
    let form = draft
        .text_fields()
        .into_iter()
        .fold(FormData::new(), |form, (name, value)| form.text(name, value));
    draft
        .images
        .iter()
        .fold(form, |form, path| form.file(IMAGE_FIELD, UploadFile::from_path(path)))
}

impl ApiClient {
    pub async fn list_properties(&self, filters: &PropertyFilters) -> Result<Vec<Property>, ApiError> {
        self.get_as(PROPERTIES, &filters.to_params(), RequestOptions::default()).await
    }

    pub async fn get_property(&self, id: &str) -> Result<Property, ApiError> {
        self.get_as(&resource_path(PROPERTIES, id), &Default::default(), RequestOptions::default())
            .await
    }

    /// Create a property; images are uploaded as `images` file parts
    pub async fn create_property(&self, draft: &PropertyDraft) -> Result<Property, ApiError> {
        let reply = self
            .send_form(HttpMethod::Post, PROPERTIES, draft_form(draft), RequestOptions::default())
            .await?;
        decode(reply)
    }

    /// Update a property; images in the draft are appended to the existing ones
    pub async fn update_property(&self, id: &str, draft: &PropertyDraft) -> Result<Property, ApiError> {
        let reply = self
            .send_form(
                HttpMethod::Put,
                &resource_path(PROPERTIES, id),
                draft_form(draft),
                RequestOptions::default(),
            )
            .await?;
        decode(reply)
    }

    pub async fn delete_property(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete_as(&resource_path(PROPERTIES, id), RequestOptions::default()).await
    }
}
