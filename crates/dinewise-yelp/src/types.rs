//! Raw Yelp Fusion payloads. Every field the API may omit is optional or
//! defaulted; [`crate::normalize`] turns these into stable records.

use dinewise_core::BusinessHours;
use serde::{Deserialize, Deserializer};

/// Treats an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub businesses: Vec<RawBusiness>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBusiness {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i32>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<RawCategory>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub is_closed: Option<bool>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub display_phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub coordinates: Option<RawCoordinates>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hours: Vec<BusinessHours>,
    /// Older payloads name the hours block `business_hours`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub business_hours: Vec<BusinessHours>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub alias: Option<String>,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawCoordinates {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviews: Vec<RawReview>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReview {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_created: String,
    #[serde(default)]
    pub user: Option<RawReviewUser>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReviewUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// `{"error": {"code": "...", "description": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
