use axum::{
    extract::State,
    Extension, Json,
};
use dinewise_core::{ExternalReview, RestaurantDetail};
use serde::Serialize;

use crate::discovery::{DetailSource, DiscoveryError};
use crate::middleware::RequestId;

use super::extract::ApiPath;
use super::{map_db_error, map_discovery_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct RestaurantData {
    source: DetailSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    restaurant: RestaurantDetail,
    reviews: Vec<ExternalReview>,
}

#[derive(Debug, Serialize)]
pub(super) struct DirectoryReviewsData {
    yelp_id: String,
    total: u32,
    reviews: Vec<ExternalReview>,
}

/// GET /api/v1/restaurants/{yelp_id}
pub(super) async fn get_restaurant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(yelp_id): ApiPath<String>,
) -> Result<Json<ApiResponse<RestaurantData>>, ApiError> {
    let outcome = state
        .discovery
        .details(&yelp_id)
        .await
        .map_err(|e| map_discovery_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        RestaurantData {
            source: outcome.source,
            message: outcome.message,
            restaurant: outcome.restaurant,
            reviews: outcome.reviews,
        },
    )))
}

/// GET /api/v1/restaurants/{yelp_id}/reviews
///
/// Any directory failure here is reported as `upstream_unavailable`.
pub(super) async fn list_directory_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(yelp_id): ApiPath<String>,
) -> Result<Json<ApiResponse<DirectoryReviewsData>>, ApiError> {
    let excerpts = match state.discovery.review_excerpts(&yelp_id).await {
        Ok(excerpts) => excerpts,
        Err(DiscoveryError::Storage(error)) => return Err(map_db_error(req_id.0, &error)),
        Err(error) => {
            tracing::warn!(yelp_id = %yelp_id, error = %error, "directory reviews unavailable");
            return Err(ApiError::new(
                req_id.0,
                "upstream_unavailable",
                format!("Unable to fetch reviews: {error}"),
            ));
        }
    };

    Ok(Json(ApiResponse::success(
        req_id.0,
        DirectoryReviewsData {
            yelp_id,
            total: excerpts.total,
            reviews: excerpts.reviews,
        },
    )))
}
