//! Stable restaurant records shared by the directory client, the cache and
//! the HTTP layer.

use std::fmt;

use serde::{Deserialize, Serialize};

const BUSINESS_PAGE_BASE: &str = "https://www.yelp.com/biz/";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Which path first wrote a cache row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Seed,
    Search,
    Nearby,
}

impl Provenance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Seed => "seed",
            Provenance::Search => "search",
            Provenance::Nearby => "nearby",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business as returned by search, from either the cache or the live
/// directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
    pub rating: f64,
    pub review_count: i32,
    pub price: Option<String>,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
    /// Meters from the search origin, when known.
    pub distance: Option<f64>,
    pub is_open: bool,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub yelp_url: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPeriod {
    pub day: u8,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub is_overnight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(default)]
    pub open: Vec<OpenPeriod>,
    #[serde(default)]
    pub hours_type: Option<String>,
    #[serde(default)]
    pub is_open_now: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDetail {
    pub id: String,
    pub name: String,
    pub rating: f64,
    pub review_count: i32,
    pub price: Option<String>,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
    pub photos: Vec<String>,
    pub is_open: bool,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub yelp_url: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub hours: Option<BusinessHours>,
    pub transactions: Vec<String>,
}

impl RestaurantDetail {
    /// Builds a reduced-fidelity detail record from a cached summary, used
    /// when the live directory cannot serve the business.
    ///
    /// Media, hours and transactions are never cached, so they come back
    /// empty; the business page URL is derived from the key.
    #[must_use]
    pub fn cache_only(summary: RestaurantSummary) -> Self {
        let yelp_url = Some(business_page_url(&summary.id));
        Self {
            id: summary.id,
            name: summary.name,
            rating: summary.rating,
            review_count: summary.review_count,
            price: summary.price,
            categories: summary.categories,
            image_url: None,
            photos: Vec::new(),
            is_open: true,
            address: summary.address,
            phone: summary.phone,
            yelp_url,
            coordinates: summary.coordinates,
            hours: None,
            transactions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub id: Option<String>,
    pub name: String,
    pub profile_url: Option<String>,
    pub image_url: Option<String>,
}

/// A review fetched from the directory. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReview {
    pub id: String,
    pub rating: f64,
    pub text: String,
    pub time_created: String,
    pub user: ReviewAuthor,
    pub url: Option<String>,
}

/// Public business page for a directory key.
#[must_use]
pub fn business_page_url(id: &str) -> String {
    format!("{BUSINESS_PAGE_BASE}{id}")
}
