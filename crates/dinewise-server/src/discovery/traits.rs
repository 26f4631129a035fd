//! Seams between the discovery logic and its two data sources.

use async_trait::async_trait;
use dinewise_core::{Coordinates, Region, RestaurantDetail, RestaurantSummary};
use dinewise_db::{CacheFilter, DbError, NewCachedRestaurant};
use dinewise_yelp::{BusinessSearch, ReviewPage, SearchPage, YelpClient, YelpError};
use sqlx::PgPool;

/// Live business directory.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn search(&self, search: &BusinessSearch) -> Result<SearchPage, YelpError>;

    async fn nearby(
        &self,
        center: Coordinates,
        radius_meters: u32,
        categories: Option<&str>,
        limit: u32,
    ) -> Result<SearchPage, YelpError>;

    async fn business(&self, yelp_id: &str) -> Result<RestaurantDetail, YelpError>;

    async fn reviews(&self, yelp_id: &str) -> Result<ReviewPage, YelpError>;
}

#[async_trait]
impl DirectoryClient for YelpClient {
    async fn search(&self, search: &BusinessSearch) -> Result<SearchPage, YelpError> {
        self.search_businesses(search).await
    }

    async fn nearby(
        &self,
        center: Coordinates,
        radius_meters: u32,
        categories: Option<&str>,
        limit: u32,
    ) -> Result<SearchPage, YelpError> {
        self.search_nearby(center, radius_meters, categories, limit)
            .await
    }

    async fn business(&self, yelp_id: &str) -> Result<RestaurantDetail, YelpError> {
        self.get_business(yelp_id).await
    }

    async fn reviews(&self, yelp_id: &str) -> Result<ReviewPage, YelpError> {
        self.get_reviews(yelp_id).await
    }
}

/// Local cache of previously seen businesses.
#[async_trait]
pub trait RestaurantStore: Send + Sync {
    async fn get(&self, yelp_id: &str) -> Result<Option<RestaurantSummary>, DbError>;

    async fn find_by_region(
        &self,
        region: Region,
        filter: &CacheFilter,
    ) -> Result<Vec<RestaurantSummary>, DbError>;

    async fn upsert(&self, record: &NewCachedRestaurant) -> Result<(), DbError>;

    async fn upsert_all(&self, records: &[NewCachedRestaurant]) -> Result<(), DbError> {
        for record in records {
            self.upsert(record).await?;
        }
        Ok(())
    }
}

/// [`RestaurantStore`] over the `restaurant_cache` table.
#[derive(Debug, Clone)]
pub struct PgRestaurantStore {
    pool: PgPool,
}

impl PgRestaurantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantStore for PgRestaurantStore {
    async fn get(&self, yelp_id: &str) -> Result<Option<RestaurantSummary>, DbError> {
        let row = dinewise_db::get_cached_restaurant(&self.pool, yelp_id).await?;
        Ok(row.map(dinewise_db::CachedRestaurantRow::into_summary))
    }

    async fn find_by_region(
        &self,
        region: Region,
        filter: &CacheFilter,
    ) -> Result<Vec<RestaurantSummary>, DbError> {
        let rows = dinewise_db::find_by_region(&self.pool, region.code(), filter).await?;
        Ok(rows
            .into_iter()
            .map(dinewise_db::CachedRestaurantRow::into_summary)
            .collect())
    }

    async fn upsert(&self, record: &NewCachedRestaurant) -> Result<(), DbError> {
        dinewise_db::upsert_restaurant(&self.pool, record).await?;
        Ok(())
    }

    async fn upsert_all(&self, records: &[NewCachedRestaurant]) -> Result<(), DbError> {
        dinewise_db::upsert_restaurants(&self.pool, records).await?;
        Ok(())
    }
}
