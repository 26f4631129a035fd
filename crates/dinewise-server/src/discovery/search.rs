use dinewise_core::{
    parse_price_list, PriceTier, Provenance, Region, RestaurantSummary, UNBOUND_LOCATION_CODE,
};
use dinewise_db::CacheFilter;
use dinewise_yelp::BusinessSearch;
use serde::Serialize;

use super::{Discovery, DiscoveryError};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 50;
const MIN_RATING_FLOOR: f64 = 1.0;
const MIN_RATING_CEILING: f64 = 5.0;
const DEFAULT_TERM: &str = "restaurants";

/// A search request after normalization. Build with [`SearchQuery::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub location: Option<String>,
    pub cuisine: Option<String>,
    pub prices: Vec<PriceTier>,
    pub min_rating: Option<f64>,
    pub limit: u32,
    pub offset: u32,
}

/// Which path answered a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    CachedDb,
    YelpApi,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub method: SearchMethod,
    pub restaurants: Vec<RestaurantSummary>,
}

impl SearchQuery {
    /// Normalizes raw request parameters.
    ///
    /// Blank strings become `None`; a location that is a region code is
    /// upper-cased; prices are parsed from a comma list; the minimum rating
    /// is clamped into 1–5 (non-finite values are ignored); `limit` is
    /// clamped into 1–50 (default 20) and `offset` to at least 0.
    #[must_use]
    pub fn normalize(
        text: Option<&str>,
        location: Option<&str>,
        cuisine: Option<&str>,
        price: Option<&str>,
        min_rating: Option<f64>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Self {
        let location = non_blank(location).map(|loc| match Region::from_code(&loc) {
            Some(region) => region.code().to_string(),
            None => loc,
        });

        Self {
            text: non_blank(text),
            location,
            cuisine: non_blank(cuisine),
            prices: price.map(parse_price_list).unwrap_or_default(),
            min_rating: min_rating
                .filter(|r| r.is_finite())
                .map(|r| r.clamp(MIN_RATING_FLOOR, MIN_RATING_CEILING)),
            limit: clamp_limit(limit),
            offset: offset
                .map_or(0, |o| u32::try_from(o.max(0)).unwrap_or(u32::MAX)),
        }
    }

    /// The region this query is bound to, if its location is a region code.
    #[must_use]
    pub fn region(&self) -> Option<Region> {
        self.location.as_deref().and_then(Region::from_code)
    }

    fn cache_filter(&self) -> CacheFilter {
        CacheFilter {
            text: self.text.clone(),
            cuisine: self.cuisine.clone(),
            prices: self
                .prices
                .iter()
                .map(|p| p.symbol().to_string())
                .collect(),
            min_rating: self.min_rating,
            limit: i64::from(self.limit),
            offset: i64::from(self.offset),
        }
    }

    /// Free text (or `restaurants`) followed by the cuisine hint.
    fn directory_term(&self) -> String {
        let base = self.text.as_deref().unwrap_or(DEFAULT_TERM);
        match self.cuisine.as_deref() {
            Some(cuisine) => format!("{base} {cuisine}"),
            None => base.to_string(),
        }
    }
}

impl Discovery {
    /// Answers a search from the cache when the location is a region code,
    /// otherwise from the live directory.
    ///
    /// There is no fallback between paths: a directory failure on the remote
    /// path is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Storage`] if the cache query fails, or the
    /// directory error kind on the remote path.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, DiscoveryError> {
        if let Some(region) = query.region() {
            let restaurants = self
                .store
                .find_by_region(region, &query.cache_filter())
                .await?;

            tracing::debug!(
                region = %region,
                returned = restaurants.len(),
                "search answered from cache"
            );

            return Ok(SearchOutcome {
                method: SearchMethod::CachedDb,
                restaurants,
            });
        }

        self.search_remote(query).await
    }

    async fn search_remote(&self, query: &SearchQuery) -> Result<SearchOutcome, DiscoveryError> {
        let search = BusinessSearch {
            term: query.directory_term(),
            location: query.location.clone(),
            prices: query.prices.clone(),
            limit: query.limit,
            offset: query.offset,
            ..BusinessSearch::default()
        };

        let page = self.directory.search(&search).await?;
        let returned = page.businesses.len();

        // The directory has no rating filter and lists unreviewed businesses.
        let restaurants: Vec<RestaurantSummary> = page
            .businesses
            .into_iter()
            .filter(|r| r.review_count > 0)
            .filter(|r| query.min_rating.is_none_or(|min| r.rating >= min))
            .collect();

        tracing::debug!(
            term = %search.term,
            returned,
            kept = restaurants.len(),
            "search answered from directory"
        );

        self.repair_cache(&restaurants, UNBOUND_LOCATION_CODE, Provenance::Search);

        Ok(SearchOutcome {
            method: SearchMethod::YelpApi,
            restaurants,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

pub(crate) fn clamp_limit(limit: Option<i64>) -> u32 {
    let clamped = limit.map_or(i64::from(DEFAULT_LIMIT), |l| {
        l.clamp(1, i64::from(MAX_LIMIT))
    });
    u32::try_from(clamped).unwrap_or(DEFAULT_LIMIT)
}
