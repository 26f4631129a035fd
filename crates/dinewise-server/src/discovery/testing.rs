//! In-memory doubles for the directory and the cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dinewise_core::{
    Coordinates, ExternalReview, Region, RestaurantDetail, RestaurantSummary, ReviewAuthor,
};
use dinewise_db::{CacheFilter, DbError, NewCachedRestaurant};
use dinewise_yelp::{BusinessSearch, ReviewPage, SearchPage, YelpError};

use super::traits::{DirectoryClient, RestaurantStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailKind {
    RateLimited,
    BadRequest,
    Upstream,
}

impl FailKind {
    fn to_error(self) -> YelpError {
        match self {
            FailKind::RateLimited => YelpError::RateLimited,
            FailKind::BadRequest => YelpError::BadRequest("bad location".to_string()),
            FailKind::Upstream => YelpError::UnexpectedStatus {
                status: 502,
                url: "http://directory.test".to_string(),
            },
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeDirectory {
    businesses: Vec<RestaurantSummary>,
    details: HashMap<String, RestaurantDetail>,
    reviews: HashMap<String, Vec<ExternalReview>>,
    failure: Option<FailKind>,
    pub(crate) reviews_fail: bool,
    calls: Mutex<Vec<&'static str>>,
    searches: Mutex<Vec<BusinessSearch>>,
    nearby_calls: Mutex<Vec<(Coordinates, u32, u32)>>,
}

impl FakeDirectory {
    pub(crate) fn with_businesses(businesses: Vec<RestaurantSummary>) -> Self {
        Self {
            businesses,
            ..Self::default()
        }
    }

    pub(crate) fn failing(kind: FailKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::default()
        }
    }

    pub(crate) fn with_detail(mut self, detail: RestaurantDetail) -> Self {
        self.details.insert(detail.id.clone(), detail);
        self
    }

    pub(crate) fn with_reviews(mut self, yelp_id: &str, reviews: Vec<ExternalReview>) -> Self {
        self.reviews.insert(yelp_id.to_string(), reviews);
        self
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn searches(&self) -> Vec<BusinessSearch> {
        self.searches.lock().expect("searches lock").clone()
    }

    pub(crate) fn nearby_calls(&self) -> Vec<(Coordinates, u32, u32)> {
        self.nearby_calls.lock().expect("nearby lock").clone()
    }

    fn record(&self, call: &'static str) -> Result<(), YelpError> {
        self.calls.lock().expect("calls lock").push(call);
        match self.failure {
            Some(kind) => Err(kind.to_error()),
            None => Ok(()),
        }
    }

    fn page(&self) -> SearchPage {
        SearchPage {
            total: u32::try_from(self.businesses.len()).unwrap_or(u32::MAX),
            businesses: self.businesses.clone(),
        }
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn search(&self, search: &BusinessSearch) -> Result<SearchPage, YelpError> {
        self.searches
            .lock()
            .expect("searches lock")
            .push(search.clone());
        self.record("search")?;
        Ok(self.page())
    }

    async fn nearby(
        &self,
        center: Coordinates,
        radius_meters: u32,
        _categories: Option<&str>,
        limit: u32,
    ) -> Result<SearchPage, YelpError> {
        self.nearby_calls
            .lock()
            .expect("nearby lock")
            .push((center, radius_meters, limit));
        self.record("nearby")?;
        Ok(self.page())
    }

    async fn business(&self, yelp_id: &str) -> Result<RestaurantDetail, YelpError> {
        self.record("business")?;
        self.details
            .get(yelp_id)
            .cloned()
            .ok_or_else(|| YelpError::UnexpectedStatus {
                status: 404,
                url: format!("http://directory.test/businesses/{yelp_id}"),
            })
    }

    async fn reviews(&self, yelp_id: &str) -> Result<ReviewPage, YelpError> {
        self.record("reviews")?;
        if self.reviews_fail {
            return Err(FailKind::Upstream.to_error());
        }
        let reviews = self.reviews.get(yelp_id).cloned().unwrap_or_default();
        Ok(ReviewPage {
            total: u32::try_from(reviews.len()).unwrap_or(u32::MAX),
            reviews,
        })
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<HashMap<String, NewCachedRestaurant>>,
    find_calls: Mutex<Vec<(Region, CacheFilter)>>,
    fail_reads: bool,
    fail_writes: bool,
}

fn storage_failure() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    pub(crate) fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) fn insert(&self, record: NewCachedRestaurant) {
        self.rows
            .lock()
            .expect("rows lock")
            .insert(record.yelp_id.clone(), record);
    }

    pub(crate) fn record(&self, yelp_id: &str) -> Option<NewCachedRestaurant> {
        self.rows.lock().expect("rows lock").get(yelp_id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.lock().expect("rows lock").len()
    }

    pub(crate) fn find_calls(&self) -> Vec<(Region, CacheFilter)> {
        self.find_calls.lock().expect("find lock").clone()
    }
}

fn to_summary(record: &NewCachedRestaurant) -> RestaurantSummary {
    RestaurantSummary {
        id: record.yelp_id.clone(),
        name: record.name.clone(),
        rating: record.rating,
        review_count: record.review_count,
        price: record.price.clone(),
        categories: record.categories.clone(),
        image_url: None,
        distance: None,
        is_open: true,
        address: record.address.clone(),
        phone: record.phone.clone(),
        yelp_url: None,
        coordinates: record.coordinates,
    }
}

#[async_trait]
impl RestaurantStore for MemoryStore {
    async fn get(&self, yelp_id: &str) -> Result<Option<RestaurantSummary>, DbError> {
        if self.fail_reads {
            return Err(storage_failure());
        }
        Ok(self.record(yelp_id).as_ref().map(to_summary))
    }

    async fn find_by_region(
        &self,
        region: Region,
        filter: &CacheFilter,
    ) -> Result<Vec<RestaurantSummary>, DbError> {
        self.find_calls
            .lock()
            .expect("find lock")
            .push((region, filter.clone()));
        if self.fail_reads {
            return Err(storage_failure());
        }
        let rows = self.rows.lock().expect("rows lock");
        let mut found: Vec<RestaurantSummary> = rows
            .values()
            .filter(|r| r.location_code == region.code() && r.review_count > 0)
            .map(to_summary)
            .collect();
        found.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(b.review_count.cmp(&a.review_count))
                .then(a.id.cmp(&b.id))
        });
        Ok(found)
    }

    async fn upsert(&self, record: &NewCachedRestaurant) -> Result<(), DbError> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        self.insert(record.clone());
        Ok(())
    }
}

/// Polls until detached cache repairs have written `expected` rows.
pub(crate) async fn wait_for_rows(store: &MemoryStore, expected: usize) {
    for _ in 0..100 {
        if store.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("cache repair did not write {expected} rows in time");
}

pub(crate) fn summary(id: &str, rating: f64, review_count: i32) -> RestaurantSummary {
    RestaurantSummary {
        id: id.to_string(),
        name: format!("Restaurant {id}"),
        rating,
        review_count,
        price: Some("$$".to_string()),
        categories: vec!["Pizza".to_string()],
        image_url: Some(format!("https://img.test/{id}.jpg")),
        distance: None,
        is_open: true,
        address: Some("1 Main St, New York, NY".to_string()),
        phone: Some("(212) 555-0100".to_string()),
        yelp_url: Some(format!("https://www.yelp.com/biz/{id}")),
        coordinates: None,
    }
}

pub(crate) fn detail(id: &str) -> RestaurantDetail {
    let s = summary(id, 4.5, 120);
    RestaurantDetail {
        id: s.id,
        name: s.name,
        rating: s.rating,
        review_count: s.review_count,
        price: s.price,
        categories: s.categories,
        image_url: s.image_url.clone(),
        photos: s.image_url.into_iter().collect(),
        is_open: true,
        address: s.address,
        phone: s.phone,
        yelp_url: s.yelp_url,
        coordinates: Some(Coordinates {
            latitude: 40.72,
            longitude: -73.99,
        }),
        hours: None,
        transactions: vec!["delivery".to_string()],
    }
}

pub(crate) fn review(id: &str) -> ExternalReview {
    ExternalReview {
        id: id.to_string(),
        rating: 5.0,
        text: "Great slices.".to_string(),
        time_created: "2024-05-01 18:30:00".to_string(),
        user: ReviewAuthor {
            id: Some(format!("user-{id}")),
            name: "Sam".to_string(),
            profile_url: None,
            image_url: None,
        },
        url: None,
    }
}
