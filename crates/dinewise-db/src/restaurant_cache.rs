//! Database operations for the `restaurant_cache` table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dinewise_core::{Coordinates, Provenance, RestaurantSummary};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

const KEY_MAX_CHARS: usize = 255;
const NAME_MAX_CHARS: usize = 255;
const LOCATION_CODE_MAX_CHARS: usize = 10;
const PRICE_MAX_CHARS: usize = 10;
const PHONE_MAX_CHARS: usize = 50;
const ADDRESS_MAX_CHARS: usize = 500;

const CACHE_COLUMNS: &str = "id, yelp_id, name, location_code, latitude, longitude, price, rating, \
     review_count, categories, phone, address, provider, provenance, last_fetched_at, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `restaurant_cache` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CachedRestaurantRow {
    pub id: i64,
    pub yelp_id: String,
    pub name: String,
    pub location_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub categories: Json<Vec<String>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub provider: String,
    pub provenance: String,
    pub last_fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CachedRestaurantRow {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    /// Converts the row into the summary shape shared with live results.
    ///
    /// The cache stores no media, distance or open state, so those come back
    /// as `None` / open.
    #[must_use]
    pub fn into_summary(self) -> RestaurantSummary {
        let coordinates = self.coordinates();
        RestaurantSummary {
            id: self.yelp_id,
            name: self.name,
            rating: self.rating,
            review_count: self.review_count,
            price: self.price,
            categories: self.categories.0,
            image_url: None,
            distance: None,
            is_open: true,
            address: self.address,
            phone: self.phone,
            yelp_url: None,
            coordinates,
        }
    }
}

/// Values written by [`upsert_restaurants`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCachedRestaurant {
    pub yelp_id: String,
    pub name: String,
    pub location_code: String,
    pub coordinates: Option<Coordinates>,
    pub price: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub categories: Vec<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub provenance: Provenance,
}

impl NewCachedRestaurant {
    #[must_use]
    pub fn from_summary(
        summary: &RestaurantSummary,
        location_code: &str,
        provenance: Provenance,
    ) -> Self {
        Self {
            yelp_id: summary.id.clone(),
            name: summary.name.clone(),
            location_code: location_code.to_string(),
            coordinates: summary.coordinates,
            price: summary.price.clone(),
            rating: summary.rating,
            review_count: summary.review_count,
            categories: summary.categories.clone(),
            phone: summary.phone.clone(),
            address: summary.address.clone(),
            provenance,
        }
    }
}

/// Filters applied by [`find_by_region`]. Empty / `None` fields do not
/// constrain the result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheFilter {
    pub text: Option<String>,
    pub cuisine: Option<String>,
    pub prices: Vec<String>,
    pub min_rating: Option<f64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for CacheFilter {
    fn default() -> Self {
        Self {
            text: None,
            cuisine: None,
            prices: Vec::new(),
            min_rating: None,
            limit: 20,
            offset: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the cached row for `yelp_id`, or `None` if it was never seen.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cached_restaurant(
    pool: &PgPool,
    yelp_id: &str,
) -> Result<Option<CachedRestaurantRow>, DbError> {
    let sql = format!("SELECT {CACHE_COLUMNS} FROM restaurant_cache WHERE yelp_id = $1");
    let row = sqlx::query_as::<_, CachedRestaurantRow>(&sql)
        .bind(yelp_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Returns the cached rows for `yelp_ids`, keyed by `yelp_id`. Unknown keys
/// are simply absent from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cached_restaurants(
    pool: &PgPool,
    yelp_ids: &[String],
) -> Result<HashMap<String, CachedRestaurantRow>, DbError> {
    if yelp_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql =
        format!("SELECT {CACHE_COLUMNS} FROM restaurant_cache WHERE yelp_id = ANY($1::TEXT[])");
    let rows = sqlx::query_as::<_, CachedRestaurantRow>(&sql)
        .bind(yelp_ids)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.yelp_id.clone(), row))
        .collect())
}

/// Returns region-bound rows matching every filter in `filter`.
///
/// Rows with zero reviews are never returned. `text` matches the name
/// case-insensitively as a substring, or a category exactly (categories are
/// stored lowercase). Results are ordered by rating, then review count,
/// both descending, with `yelp_id` as a stable tiebreak.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_by_region(
    pool: &PgPool,
    location_code: &str,
    filter: &CacheFilter,
) -> Result<Vec<CachedRestaurantRow>, DbError> {
    let name_pattern = filter
        .text
        .as_deref()
        .map(|text| format!("%{}%", escape_like(text)));

    let sql = format!(
        "SELECT {CACHE_COLUMNS} \
         FROM restaurant_cache \
         WHERE location_code = $1 \
           AND review_count > 0 \
           AND ($2::TEXT IS NULL \
                OR name ILIKE $3 \
                OR categories @> jsonb_build_array(lower($2::TEXT))) \
           AND ($4::TEXT IS NULL OR categories @> jsonb_build_array(lower($4::TEXT))) \
           AND (cardinality($5::TEXT[]) = 0 OR price = ANY($5::TEXT[])) \
           AND ($6::FLOAT8 IS NULL OR rating >= $6) \
         ORDER BY rating DESC, review_count DESC, yelp_id ASC \
         LIMIT $7 OFFSET $8"
    );

    let rows = sqlx::query_as::<_, CachedRestaurantRow>(&sql)
        .bind(location_code)
        .bind(filter.text.as_deref())
        .bind(name_pattern)
        .bind(filter.cuisine.as_deref())
        .bind(&filter.prices)
        .bind(filter.min_rating)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Inserts or refreshes a single cache row. Returns `true` when the row is new.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_restaurant(
    pool: &PgPool,
    restaurant: &NewCachedRestaurant,
) -> Result<bool, DbError> {
    let (new_count, _) = upsert_restaurants(pool, std::slice::from_ref(restaurant)).await?;
    Ok(new_count == 1)
}

/// Inserts new rows and refreshes existing ones in one statement.
///
/// Returns `(new_count, updated_count)`. Duplicate keys within the batch are
/// collapsed (the last occurrence wins). Records whose rating falls outside
/// 1.0–5.0, or whose key, name or region code exceed their column width, are
/// skipped; an over-long price, phone or address is stored as `NULL` so one
/// odd record cannot fail the batch. On conflict the mutable fields are
/// refreshed; `location_code` and `provenance` of an existing row are kept,
/// and stored coordinates survive an update that carries none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_restaurants(
    pool: &PgPool,
    restaurants: &[NewCachedRestaurant],
) -> Result<(u64, u64), DbError> {
    let batch = dedupe_by_key(restaurants);
    if batch.is_empty() {
        return Ok((0, 0));
    }

    let mut yelp_ids: Vec<String> = Vec::with_capacity(batch.len());
    let mut names: Vec<String> = Vec::with_capacity(batch.len());
    let mut location_codes: Vec<String> = Vec::with_capacity(batch.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(batch.len());
    let mut longitudes: Vec<Option<f64>> = Vec::with_capacity(batch.len());
    let mut prices: Vec<Option<String>> = Vec::with_capacity(batch.len());
    let mut ratings: Vec<f64> = Vec::with_capacity(batch.len());
    let mut review_counts: Vec<i32> = Vec::with_capacity(batch.len());
    let mut categories: Vec<serde_json::Value> = Vec::with_capacity(batch.len());
    let mut phones: Vec<Option<String>> = Vec::with_capacity(batch.len());
    let mut addresses: Vec<Option<String>> = Vec::with_capacity(batch.len());
    let mut provenances: Vec<String> = Vec::with_capacity(batch.len());

    for r in batch {
        yelp_ids.push(r.yelp_id.clone());
        names.push(r.name.clone());
        location_codes.push(r.location_code.clone());
        latitudes.push(r.coordinates.map(|c| c.latitude));
        longitudes.push(r.coordinates.map(|c| c.longitude));
        prices.push(bounded(r.price.as_deref(), PRICE_MAX_CHARS));
        ratings.push(r.rating);
        review_counts.push(r.review_count.max(0));
        categories.push(serde_json::Value::from(
            r.categories
                .iter()
                .map(|c| c.to_lowercase())
                .collect::<Vec<_>>(),
        ));
        phones.push(bounded(r.phone.as_deref(), PHONE_MAX_CHARS));
        addresses.push(bounded(r.address.as_deref(), ADDRESS_MAX_CHARS));
        provenances.push(r.provenance.as_str().to_string());
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO restaurant_cache \
             (yelp_id, name, location_code, latitude, longitude, price, rating, \
              review_count, categories, phone, address, provenance) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::float8[], $5::float8[], $6::text[], \
              $7::float8[], $8::int4[], $9::jsonb[], $10::text[], $11::text[], $12::text[]) \
         ON CONFLICT (yelp_id) DO UPDATE SET \
             name             = EXCLUDED.name, \
             rating           = EXCLUDED.rating, \
             price            = EXCLUDED.price, \
             categories       = EXCLUDED.categories, \
             review_count     = EXCLUDED.review_count, \
             address          = EXCLUDED.address, \
             phone            = EXCLUDED.phone, \
             latitude         = COALESCE(EXCLUDED.latitude, restaurant_cache.latitude), \
             longitude        = COALESCE(EXCLUDED.longitude, restaurant_cache.longitude), \
             last_fetched_at  = NOW() \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&yelp_ids)
    .bind(&names)
    .bind(&location_codes)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&prices)
    .bind(&ratings)
    .bind(&review_counts)
    .bind(&categories)
    .bind(&phones)
    .bind(&addresses)
    .bind(&provenances)
    .fetch_all(pool)
    .await?;

    let new_count = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated_count = rows.len() as u64 - new_count;

    Ok((new_count, updated_count))
}

/// `ON CONFLICT DO UPDATE` cannot touch the same row twice in one statement,
/// so keys must be unique within a batch.
fn dedupe_by_key(restaurants: &[NewCachedRestaurant]) -> Vec<&NewCachedRestaurant> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut batch: Vec<&NewCachedRestaurant> = Vec::with_capacity(restaurants.len());

    for r in restaurants
        .iter()
        .filter(|r| (1.0..=5.0).contains(&r.rating))
        .filter(|r| fits_required_columns(r))
    {
        if let Some(&idx) = positions.get(r.yelp_id.as_str()) {
            batch[idx] = r;
        } else {
            positions.insert(r.yelp_id.as_str(), batch.len());
            batch.push(r);
        }
    }

    batch
}

fn fits_required_columns(r: &NewCachedRestaurant) -> bool {
    let fits = r.yelp_id.chars().count() <= KEY_MAX_CHARS
        && r.name.chars().count() <= NAME_MAX_CHARS
        && r.location_code.chars().count() <= LOCATION_CODE_MAX_CHARS;
    if !fits {
        tracing::warn!(yelp_id = %r.yelp_id, "skipping cache record wider than its columns");
    }
    fits
}

fn bounded(value: Option<&str>, max_chars: usize) -> Option<String> {
    value
        .filter(|v| v.chars().count() <= max_chars)
        .map(str::to_string)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
