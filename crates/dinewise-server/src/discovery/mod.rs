//! Restaurant discovery: search routing between the local cache and the live
//! directory, strict-radius nearby search, and detail resolution with cache
//! fallback.

mod detail;
mod geo;
mod nearby;
mod search;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

use std::sync::Arc;

use dinewise_core::{Provenance, RestaurantSummary};
use dinewise_db::{DbError, NewCachedRestaurant};
use dinewise_yelp::{ErrorKind, YelpError};
use thiserror::Error;

pub use detail::{DetailOutcome, DetailSource, ReviewExcerpts};
pub use nearby::{NearbyOutcome, NearbyQuery};
pub use search::{SearchMethod, SearchOutcome, SearchQuery};
pub use traits::{DirectoryClient, PgRestaurantStore, RestaurantStore};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("directory rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("directory request failed: {0}")]
    Upstream(String),
    #[error("restaurant not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<YelpError> for DiscoveryError {
    fn from(error: YelpError) -> Self {
        let message = error.to_string();
        match error.kind() {
            ErrorKind::RateLimited => DiscoveryError::RateLimited(message),
            ErrorKind::BadRequest => DiscoveryError::BadRequest(message),
            ErrorKind::Upstream => DiscoveryError::Upstream(message),
        }
    }
}

/// Entry point for every read of restaurant data.
#[derive(Clone)]
pub struct Discovery {
    directory: Arc<dyn DirectoryClient>,
    store: Arc<dyn RestaurantStore>,
}

impl Discovery {
    pub fn new(directory: Arc<dyn DirectoryClient>, store: Arc<dyn RestaurantStore>) -> Self {
        Self { directory, store }
    }

    /// Writes live results back into the cache on a detached task.
    ///
    /// Never delays or fails the caller; errors are logged.
    fn repair_cache(
        &self,
        restaurants: &[RestaurantSummary],
        location_code: &str,
        provenance: Provenance,
    ) {
        if restaurants.is_empty() {
            return;
        }

        let records: Vec<NewCachedRestaurant> = restaurants
            .iter()
            .map(|r| NewCachedRestaurant::from_summary(r, location_code, provenance))
            .collect();
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            match store.upsert_all(&records).await {
                Ok(()) => tracing::debug!(
                    count = records.len(),
                    provenance = %provenance,
                    "cache repaired from live results"
                ),
                Err(error) => tracing::warn!(
                    error = %error,
                    count = records.len(),
                    provenance = %provenance,
                    "cache repair failed"
                ),
            }
        });
    }
}
