use dinewise_core::{Coordinates, Provenance, RestaurantSummary, UNBOUND_LOCATION_CODE};
use dinewise_yelp::MAX_RADIUS_METERS;

use super::geo::haversine_meters;
use super::search::clamp_limit;
use super::{Discovery, DiscoveryError};

pub const DEFAULT_RADIUS_METERS: u32 = 5_000;
pub const MIN_RADIUS_METERS: u32 = 100;
const NEARBY_CATEGORIES: &str = "restaurants";

/// A validated point-radius search. `radius_meters` is the radius the
/// caller asked for; [`NearbyQuery::directory_radius`] is what is sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub center: Coordinates,
    pub radius_meters: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyOutcome {
    pub center: Coordinates,
    pub radius_meters: u32,
    pub restaurants: Vec<RestaurantSummary>,
}

impl NearbyQuery {
    /// Validates raw request parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::BadRequest`] when a coordinate is missing or
    /// out of range, or the radius is not positive.
    pub fn new(
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius_meters: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Self, DiscoveryError> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(DiscoveryError::BadRequest(
                "latitude and longitude are required".to_string(),
            ));
        };
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DiscoveryError::BadRequest(format!(
                "latitude must be between -90 and 90, got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(DiscoveryError::BadRequest(format!(
                "longitude must be between -180 and 180, got {longitude}"
            )));
        }

        let radius = radius_meters.unwrap_or(i64::from(DEFAULT_RADIUS_METERS));
        let radius_meters = u32::try_from(radius)
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| {
                DiscoveryError::BadRequest(format!("radius must be positive, got {radius}"))
            })?;

        Ok(Self {
            center: Coordinates {
                latitude,
                longitude,
            },
            radius_meters,
            limit: clamp_limit(limit),
        })
    }

    /// The requested radius clamped to what the directory accepts.
    #[must_use]
    pub fn directory_radius(&self) -> u32 {
        self.radius_meters.clamp(MIN_RADIUS_METERS, MAX_RADIUS_METERS)
    }
}

impl Discovery {
    /// Searches the live directory around a point and keeps only results
    /// whose distance from the center is within the requested radius.
    ///
    /// The directory treats its radius parameter as a hint, so distances are
    /// recomputed from coordinates where available. Results with no known
    /// distance or no reviews are dropped.
    ///
    /// # Errors
    ///
    /// Returns the directory error kind; cache writes never fail the call.
    pub async fn nearby(&self, query: &NearbyQuery) -> Result<NearbyOutcome, DiscoveryError> {
        let page = self
            .directory
            .nearby(
                query.center,
                query.directory_radius(),
                Some(NEARBY_CATEGORIES),
                query.limit,
            )
            .await?;

        let radius = f64::from(query.radius_meters);
        let returned = page.businesses.len();
        let restaurants: Vec<RestaurantSummary> = page
            .businesses
            .into_iter()
            .map(|mut r| {
                if let Some(coords) = r.coordinates {
                    r.distance = Some(haversine_meters(query.center, coords));
                }
                r
            })
            .filter(|r| r.distance.is_some_and(|d| d <= radius))
            .filter(|r| r.review_count > 0)
            .collect();

        if restaurants.len() < returned {
            tracing::debug!(
                returned,
                kept = restaurants.len(),
                radius_meters = query.radius_meters,
                "dropped nearby results outside radius or without reviews"
            );
        }

        self.repair_cache(&restaurants, UNBOUND_LOCATION_CODE, Provenance::Nearby);

        Ok(NearbyOutcome {
            center: query.center,
            radius_meters: query.radius_meters,
            restaurants,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::discovery::testing::{summary, wait_for_rows, FakeDirectory, MemoryStore};

    const CENTER: Coordinates = Coordinates {
        latitude: 40.758_0,
        longitude: -73.985_5,
    };

    fn at(id: &str, latitude: f64, longitude: f64) -> RestaurantSummary {
        let mut r = summary(id, 4.2, 12);
        r.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        r
    }

    #[test]
    fn new_applies_defaults() {
        let q = NearbyQuery::new(Some(40.0), Some(-73.0), None, None).expect("valid");
        assert_eq!(q.radius_meters, DEFAULT_RADIUS_METERS);
        assert_eq!(q.limit, 20);
    }

    #[test]
    fn new_rejects_bad_coordinates_and_radius() {
        for (lat, lng, radius) in [
            (None, Some(-73.0), None),
            (Some(40.0), None, None),
            (Some(91.0), Some(-73.0), None),
            (Some(40.0), Some(-181.0), None),
            (Some(40.0), Some(-73.0), Some(0)),
            (Some(40.0), Some(-73.0), Some(-5)),
        ] {
            let err = NearbyQuery::new(lat, lng, radius, None).expect_err("invalid");
            assert!(matches!(err, DiscoveryError::BadRequest(_)));
        }
    }

    #[test]
    fn directory_radius_is_clamped_but_requested_radius_kept() {
        let small = NearbyQuery::new(Some(40.0), Some(-73.0), Some(50), None).expect("valid");
        assert_eq!(small.radius_meters, 50);
        assert_eq!(small.directory_radius(), MIN_RADIUS_METERS);

        let huge = NearbyQuery::new(Some(40.0), Some(-73.0), Some(90_000), None).expect("valid");
        assert_eq!(huge.directory_radius(), MAX_RADIUS_METERS);
    }

    #[tokio::test]
    async fn small_radius_filters_on_the_requested_value() {
        // About 110 m north of the center.
        let directory = Arc::new(FakeDirectory::with_businesses(vec![
            at("next-door", 40.758_0 + 0.001, -73.985_5),
        ]));
        let discovery = Discovery::new(directory.clone(), Arc::new(MemoryStore::default()));

        let q = NearbyQuery::new(Some(CENTER.latitude), Some(CENTER.longitude), Some(50), None)
            .expect("valid");
        let outcome = discovery.nearby(&q).await.expect("nearby");
        assert!(outcome.restaurants.is_empty());
        assert_eq!(directory.nearby_calls()[0].1, MIN_RADIUS_METERS);
    }

    #[tokio::test]
    async fn results_beyond_the_radius_are_dropped() {
        // Roughly 1.1 km south, and roughly 9 km north-east.
        let directory = Arc::new(FakeDirectory::with_businesses(vec![
            at("close", 40.748_4, -73.985_7),
            at("far", 40.82, -73.92),
        ]));
        let discovery = Discovery::new(directory.clone(), Arc::new(MemoryStore::default()));

        let q = NearbyQuery::new(Some(CENTER.latitude), Some(CENTER.longitude), Some(2_000), None)
            .expect("valid");
        let outcome = discovery.nearby(&q).await.expect("nearby");

        let ids: Vec<&str> = outcome.restaurants.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["close"]);
        let distance = outcome.restaurants[0].distance.expect("distance");
        assert!(distance <= 2_000.0);
        assert_eq!(outcome.radius_meters, 2_000);
    }

    #[tokio::test]
    async fn upstream_distance_is_used_without_coordinates() {
        let mut inside = summary("inside", 4.0, 3);
        inside.distance = Some(150.0);
        let mut outside = summary("outside", 4.0, 3);
        outside.distance = Some(800.0);
        let unknown = summary("unknown", 4.0, 3);

        let directory = Arc::new(FakeDirectory::with_businesses(vec![inside, outside, unknown]));
        let discovery = Discovery::new(directory, Arc::new(MemoryStore::default()));

        let q = NearbyQuery::new(Some(40.0), Some(-73.0), Some(500), None).expect("valid");
        let outcome = discovery.nearby(&q).await.expect("nearby");
        let ids: Vec<&str> = outcome.restaurants.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["inside"]);
    }

    #[tokio::test]
    async fn unreviewed_results_are_dropped_and_kept_ones_cached() {
        let mut unreviewed = at("quiet", 40.758_1, -73.985_4);
        unreviewed.review_count = 0;
        let directory = Arc::new(FakeDirectory::with_businesses(vec![
            at("busy", 40.758_2, -73.985_6),
            unreviewed,
        ]));
        let store = Arc::new(MemoryStore::default());
        let discovery = Discovery::new(directory.clone(), store.clone());

        let q = NearbyQuery::new(Some(CENTER.latitude), Some(CENTER.longitude), None, Some(10))
            .expect("valid");
        let outcome = discovery.nearby(&q).await.expect("nearby");
        assert_eq!(outcome.restaurants.len(), 1);

        wait_for_rows(&store, 1).await;
        let row = store.record("busy").expect("cached");
        assert_eq!(row.provenance, Provenance::Nearby);
        assert_eq!(row.location_code, UNBOUND_LOCATION_CODE);

        let call = &directory.nearby_calls()[0];
        assert_eq!(call.1, DEFAULT_RADIUS_METERS);
        assert_eq!(call.2, 10);
    }
}
