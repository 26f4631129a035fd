//! HTTP client for the Yelp Fusion v3 API.
//!
//! Maps HTTP statuses onto [`YelpError`], caps numeric parameters to what the
//! API accepts, and returns normalized [`dinewise_core`] records.

use std::time::Duration;

use dinewise_core::{Coordinates, ExternalReview, PriceTier, RestaurantDetail, RestaurantSummary};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::YelpError;
use crate::normalize::{detail_from_raw, review_from_raw, summary_from_raw};
use crate::types::{ErrorEnvelope, RawBusiness, ReviewsResponse, SearchResponse};

const DEFAULT_BASE_URL: &str = "https://api.yelp.com/v3";

/// Largest page the search endpoints return.
pub const MAX_LIMIT: u32 = 50;
/// Largest radius the search endpoints accept.
pub const MAX_RADIUS_METERS: u32 = 40_000;
/// Search results beyond `limit + offset = 1000` are not served.
pub const MAX_RESULT_WINDOW: u32 = 1_000;

/// Parameters for [`YelpClient::search_businesses`].
///
/// Either `location` or `coordinates` must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessSearch {
    pub term: String,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub prices: Vec<PriceTier>,
    pub categories: Option<String>,
    pub radius_meters: Option<u32>,
    pub limit: u32,
    pub offset: u32,
}

/// One page of search results plus the API's total match count.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub total: u32,
    pub businesses: Vec<RestaurantSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub total: u32,
    pub reviews: Vec<ExternalReview>,
}

/// Client for the Yelp Fusion API.
///
/// Use [`YelpClient::new`] for production or [`YelpClient::with_base_url`] to
/// point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct YelpClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl YelpClient {
    /// Creates a client pointed at the production Yelp API.
    ///
    /// # Errors
    ///
    /// Returns [`YelpError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, YelpError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`YelpError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`YelpError::InvalidBaseUrl`] if `base_url` does not
    /// parse as an http(s) URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, YelpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("dinewise/0.1 (restaurant-discovery)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| YelpError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(YelpError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            });
        }

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: parsed,
        })
    }

    /// Searches businesses by term near a free-text location or a coordinate
    /// pair.
    ///
    /// `limit` is capped at [`MAX_LIMIT`], `radius_meters` at
    /// [`MAX_RADIUS_METERS`], and `offset` so that `limit + offset` stays
    /// within [`MAX_RESULT_WINDOW`].
    ///
    /// # Errors
    ///
    /// - [`YelpError::BadRequest`] if neither location nor coordinates are
    ///   given (no request is sent), or the API answers 400.
    /// - [`YelpError::RateLimited`] on HTTP 429.
    /// - [`YelpError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`YelpError::Http`] on network failure or timeout.
    /// - [`YelpError::Deserialize`] if the body does not match the expected shape.
    pub async fn search_businesses(
        &self,
        search: &BusinessSearch,
    ) -> Result<SearchPage, YelpError> {
        let location = search
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        if location.is_none() && search.coordinates.is_none() {
            return Err(YelpError::BadRequest(
                "either a location or coordinates must be provided".to_string(),
            ));
        }

        let limit = search.limit.clamp(1, MAX_LIMIT);
        let offset = search.offset.min(MAX_RESULT_WINDOW - limit);

        let mut params: Vec<(&str, String)> = vec![
            ("term", search.term.clone()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(location) = location {
            params.push(("location", location.to_string()));
        }
        if let Some(coords) = search.coordinates {
            params.push(("latitude", coords.latitude.to_string()));
            params.push(("longitude", coords.longitude.to_string()));
        }
        if let Some(price) = price_param(&search.prices) {
            params.push(("price", price));
        }
        if let Some(categories) = search.categories.as_deref() {
            params.push(("categories", categories.to_string()));
        }
        if let Some(radius) = search.radius_meters {
            params.push(("radius", radius.min(MAX_RADIUS_METERS).to_string()));
        }

        let url = self.endpoint(&["businesses", "search"])?;
        let response: SearchResponse = self
            .request_json(url, &params, format!("search(term={})", search.term))
            .await?;

        tracing::debug!(
            term = %search.term,
            returned = response.businesses.len(),
            total = response.total,
            "yelp search completed"
        );

        Ok(SearchPage {
            total: response.total,
            businesses: response
                .businesses
                .into_iter()
                .map(summary_from_raw)
                .collect(),
        })
    }

    /// Searches around a point. `radius_meters` is capped at
    /// [`MAX_RADIUS_METERS`] and `limit` at [`MAX_LIMIT`].
    ///
    /// # Errors
    ///
    /// Same as [`YelpClient::search_businesses`].
    pub async fn search_nearby(
        &self,
        coordinates: Coordinates,
        radius_meters: u32,
        categories: Option<&str>,
        limit: u32,
    ) -> Result<SearchPage, YelpError> {
        let search = BusinessSearch {
            term: "restaurants".to_string(),
            coordinates: Some(coordinates),
            categories: categories.map(ToOwned::to_owned),
            radius_meters: Some(radius_meters),
            limit,
            ..BusinessSearch::default()
        };
        self.search_businesses(&search).await
    }

    /// Fetches full business details.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`YelpClient::search_businesses`]; an unknown id
    /// surfaces as [`YelpError::UnexpectedStatus`] with status 404.
    pub async fn get_business(&self, id: &str) -> Result<RestaurantDetail, YelpError> {
        let url = self.endpoint(&["businesses", id])?;
        let raw: RawBusiness = self
            .request_json(url, &[], format!("business(id={id})"))
            .await?;
        Ok(detail_from_raw(raw))
    }

    /// Fetches the directory's review excerpts for a business.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`YelpClient::get_business`].
    pub async fn get_reviews(&self, id: &str) -> Result<ReviewPage, YelpError> {
        let url = self.endpoint(&["businesses", id, "reviews"])?;
        let response: ReviewsResponse = self
            .request_json(url, &[], format!("reviews(id={id})"))
            .await?;
        Ok(ReviewPage {
            total: response.total,
            reviews: response.reviews.into_iter().map(review_from_raw).collect(),
        })
    }

    /// Appends path segments to the base URL, percent-encoding each one so a
    /// business id can never escape its segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, YelpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| YelpError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
        context: String,
    ) -> Result<T, YelpError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(%url, "yelp rate limit hit");
            return Err(YelpError::RateLimited);
        }
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(YelpError::BadRequest(error_description(&body)));
        }
        if !status.is_success() {
            return Err(YelpError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| YelpError::Deserialize { context, source })
    }
}

fn price_param(prices: &[PriceTier]) -> Option<String> {
    if prices.is_empty() {
        return None;
    }
    Some(
        prices
            .iter()
            .map(|tier| tier.upstream_code())
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn error_description(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match (envelope.error.code, envelope.error.description) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (None, Some(description)) => description,
            (Some(code), None) => code,
            (None, None) => "bad request".to_string(),
        },
        Err(_) if body.trim().is_empty() => "bad request".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> YelpClient {
        YelpClient::with_base_url("key", 5, base).expect("client")
    }

    #[test]
    fn endpoint_escapes_business_ids() {
        let c = client("https://api.yelp.com/v3");
        let url = c.endpoint(&["businesses", "a/b?c"]).expect("url");
        assert_eq!(url.as_str(), "https://api.yelp.com/v3/businesses/a%2Fb%3Fc");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_in_base() {
        let c = client("http://127.0.0.1:9999/v3/");
        let url = c.endpoint(&["businesses", "search"]).expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:9999/v3/businesses/search");
    }

    #[test]
    fn price_param_joins_upstream_codes() {
        assert_eq!(
            price_param(&[PriceTier::One, PriceTier::Three]).as_deref(),
            Some("1,3")
        );
        assert!(price_param(&[]).is_none());
    }

    #[test]
    fn error_description_prefers_structured_body() {
        let body = r#"{"error":{"code":"VALIDATION_ERROR","description":"limit too large"}}"#;
        assert_eq!(error_description(body), "VALIDATION_ERROR: limit too large");
        assert_eq!(error_description(""), "bad request");
        assert_eq!(error_description("plain text"), "plain text");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = YelpClient::with_base_url("key", 5, "not a url");
        assert!(matches!(result, Err(YelpError::InvalidBaseUrl { .. })));
    }
}
