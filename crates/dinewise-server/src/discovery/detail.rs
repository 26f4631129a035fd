use dinewise_core::{ExternalReview, RestaurantDetail};
use serde::Serialize;

use super::{Discovery, DiscoveryError};

/// Review excerpts shown with a restaurant.
pub const REVIEW_EXCERPTS: usize = 3;
pub const CACHE_ONLY_MESSAGE: &str = "Showing basic info (full details unavailable from Yelp)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailSource {
    YelpApi,
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailOutcome {
    pub source: DetailSource,
    pub restaurant: RestaurantDetail,
    pub reviews: Vec<ExternalReview>,
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewExcerpts {
    /// Review count reported by the directory.
    pub total: u32,
    pub reviews: Vec<ExternalReview>,
}

impl Discovery {
    /// Resolves full details from the live directory, falling back to the
    /// cached summary when the directory cannot serve the business.
    ///
    /// Review excerpts are fetched after the business and are best-effort: a
    /// failure yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::NotFound`] if the directory fails and nothing is cached.
    /// - [`DiscoveryError::Storage`] if the fallback cache lookup fails.
    pub async fn details(&self, yelp_id: &str) -> Result<DetailOutcome, DiscoveryError> {
        match self.directory.business(yelp_id).await {
            Ok(restaurant) => {
                let reviews = match self.directory.reviews(yelp_id).await {
                    Ok(page) => page.reviews.into_iter().take(REVIEW_EXCERPTS).collect(),
                    Err(error) => {
                        tracing::warn!(
                            yelp_id,
                            error = %error,
                            "review excerpts unavailable, returning details without them"
                        );
                        Vec::new()
                    }
                };

                Ok(DetailOutcome {
                    source: DetailSource::YelpApi,
                    restaurant,
                    reviews,
                    message: None,
                })
            }
            Err(error) => {
                tracing::warn!(
                    yelp_id,
                    error = %error,
                    "directory detail lookup failed, trying cache"
                );

                let cached = self.store.get(yelp_id).await?.ok_or_else(|| {
                    DiscoveryError::NotFound(
                        "Restaurant details unavailable. The business may have closed or moved."
                            .to_string(),
                    )
                })?;

                Ok(DetailOutcome {
                    source: DetailSource::Cache,
                    restaurant: RestaurantDetail::cache_only(cached),
                    reviews: Vec::new(),
                    message: Some(CACHE_ONLY_MESSAGE),
                })
            }
        }
    }

    /// Fetches directory review excerpts on their own, truncated to three.
    ///
    /// # Errors
    ///
    /// Returns the directory error kind.
    pub async fn review_excerpts(&self, yelp_id: &str) -> Result<ReviewExcerpts, DiscoveryError> {
        let page = self.directory.reviews(yelp_id).await?;
        Ok(ReviewExcerpts {
            total: page.total,
            reviews: page.reviews.into_iter().take(REVIEW_EXCERPTS).collect(),
        })
    }
}
