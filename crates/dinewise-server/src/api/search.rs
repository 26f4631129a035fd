use axum::{
    extract::State,
    Extension, Json,
};
use dinewise_core::{Coordinates, RestaurantSummary};
use serde::{Deserialize, Serialize};

use crate::discovery::{NearbyQuery, SearchMethod, SearchQuery};
use crate::middleware::RequestId;

use super::extract::ApiQuery;
use super::{map_discovery_error, ApiError, ApiResponse, AppState};

const NEARBY_METHOD: &str = "yelp_nearby_strict";

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    pub q: Option<String>,
    pub location: Option<String>,
    pub cuisine: Option<String>,
    pub price: Option<String>,
    pub rating_min: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchData {
    method: SearchMethod,
    total: usize,
    limit: u32,
    offset: u32,
    restaurants: Vec<RestaurantSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NearbyParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct NearbyData {
    method: &'static str,
    total: usize,
    radius_meters: u32,
    location: Coordinates,
    restaurants: Vec<RestaurantSummary>,
}

/// GET /api/v1/search
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let query = SearchQuery::normalize(
        params.q.as_deref(),
        params.location.as_deref(),
        params.cuisine.as_deref(),
        params.price.as_deref(),
        params.rating_min,
        params.limit,
        params.offset,
    );

    let outcome = state
        .discovery
        .search(&query)
        .await
        .map_err(|e| map_discovery_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        SearchData {
            method: outcome.method,
            total: outcome.restaurants.len(),
            limit: query.limit,
            offset: query.offset,
            restaurants: outcome.restaurants,
        },
    )))
}

/// GET /api/v1/search/nearby
pub(super) async fn nearby(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<NearbyParams>,
) -> Result<Json<ApiResponse<NearbyData>>, ApiError> {
    let query = NearbyQuery::new(params.latitude, params.longitude, params.radius, params.limit)
        .map_err(|e| map_discovery_error(req_id.0.clone(), e))?;

    let outcome = state
        .discovery
        .nearby(&query)
        .await
        .map_err(|e| map_discovery_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        NearbyData {
            method: NEARBY_METHOD,
            total: outcome.restaurants.len(),
            radius_meters: outcome.radius_meters,
            location: outcome.center,
            restaurants: outcome.restaurants,
        },
    )))
}
