//! Property listings

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::{Identified, Reference};
use super::user::UserSummary;
use super::QueryParams;

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    #[serde(default)]
    pub address: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub max_guests: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Server-relative image paths such as `/uploads/property-17.jpg`
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub owner: Option<Reference<UserSummary>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub user: Option<Reference<UserSummary>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Populated form of a property reference (`name location`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

impl Identified for PropertySummary {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Filters accepted by `GET /properties`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilters {
    pub location: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub guests: Option<u32>,
}

impl PropertyFilters {
    /// Render as query parameters, skipping unset filters
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(location) = &self.location {
            params.insert("location".into(), location.clone());
        }
        if let Some(min) = self.min_price {
            params.insert("minPrice".into(), min.to_string());
        }
        if let Some(max) = self.max_price {
            params.insert("maxPrice".into(), max.to_string());
        }
        if let Some(guests) = self.guests {
            params.insert("guests".into(), guests.to_string());
        }
        params
    }
}

/// Fields for creating or updating a property
///
/// Sent as multipart: scalar fields as text parts, each amenity as an
/// indexed `amenities[i]` part and each image file as an `images` part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub max_guests: Option<u32>,
    pub is_active: Option<bool>,
    pub amenities: Vec<String>,
    pub images: Vec<PathBuf>,
}

impl PropertyDraft {
    /// Scalar text fields in wire naming, unset ones omitted
    pub fn text_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                fields.push((name.to_string(), value));
            }
        };
        push("name", self.name.clone());
        push("description", self.description.clone());
        push("location", self.location.clone());
        push("address", self.address.clone());
        push("price", self.price.map(|v| v.to_string()));
        push("bedrooms", self.bedrooms.map(|v| v.to_string()));
        push("bathrooms", self.bathrooms.map(|v| v.to_string()));
        push("maxGuests", self.max_guests.map(|v| v.to_string()));
        push("isActive", self.is_active.map(|v| v.to_string()));
        for (index, amenity) in self.amenities.iter().enumerate() {
            fields.push((format!("amenities[{index}]"), amenity.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_populated_listing() {
        let json = r#"{
            "_id": "p1", "name": "Sunset Villa", "location": "Miami Beach", "price": 299,
            "bedrooms": 3, "maxGuests": 6, "amenities": ["Pool", "WiFi"],
            "owner": {"_id": "u9", "name": "John Owner", "email": "owner@example.com"},
            "rating": 4.8
        }"#;
        let property: Property = serde_json::from_str(json).unwrap();
        assert_eq!(property.max_guests, Some(6));
        assert!(property.is_active);
        assert_eq!(property.owner.as_ref().map(Reference::id), Some("u9"));
    }

    #[test]
    fn filters_skip_unset_values() {
        let filters = PropertyFilters {
            location: Some("Aspen".into()),
            guests: Some(4),
            ..PropertyFilters::default()
        };
        let params = filters.to_params();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("guests").map(String::as_str), Some("4"));
    }

    #[test]
    fn draft_indexes_amenities() {
        let draft = PropertyDraft {
            name: Some("Mountain Lodge".into()),
            max_guests: Some(8),
            amenities: vec!["Fireplace".into(), "Hot Tub".into()],
            ..PropertyDraft::default()
        };
        let fields = draft.text_fields();
        assert!(fields.contains(&("maxGuests".into(), "8".into())));
        assert!(fields.contains(&("amenities[0]".into(), "Fireplace".into())));
        assert!(fields.contains(&("amenities[1]".into(), "Hot Tub".into())));
    }
}
