use axum::{
    extract::State,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dinewise_db::FlagsRow;
use serde::{Deserialize, Serialize};

use crate::middleware::{CurrentUser, RequestId};

use super::extract::{ApiJson, ApiPath};
use super::{load_cached, map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct FlagsUpdate {
    pub visited: Option<bool>,
    pub promo_opt_in: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct FlagsBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    yelp_id: String,
    visited: bool,
    promo_opt_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    exists: bool,
}

impl From<FlagsRow> for FlagsBody {
    fn from(row: FlagsRow) -> Self {
        Self {
            id: Some(row.id),
            yelp_id: row.yelp_id,
            visited: row.visited,
            promo_opt_in: row.promo_opt_in,
            updated_at: Some(row.updated_at),
            exists: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FlagsRestaurantInfo {
    name: String,
    address: Option<String>,
    rating: f64,
    price: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct FlagsListItem {
    #[serde(flatten)]
    flags: FlagsBody,
    restaurant: Option<FlagsRestaurantInfo>,
}

#[derive(Debug, Serialize)]
pub(super) struct FlagsListData {
    total: usize,
    flags: Vec<FlagsListItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct FlagsData {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    flags: FlagsBody,
}

/// PUT /api/v1/flags/{yelp_id}
///
/// Absent fields keep their value (false on create).
pub(super) async fn upsert_flags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(yelp_id): ApiPath<String>,
    ApiJson(body): ApiJson<FlagsUpdate>,
) -> Result<Json<ApiResponse<FlagsData>>, ApiError> {
    let row = dinewise_db::upsert_flags(
        &state.pool,
        user.id,
        &yelp_id,
        body.visited,
        body.promo_opt_in,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        FlagsData {
            message: Some("Flags saved"),
            flags: row.into(),
        },
    )))
}

/// GET /api/v1/flags
pub(super) async fn list_flags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<FlagsListData>>, ApiError> {
    let rows = dinewise_db::list_flags(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut cached = load_cached(
        &state.pool,
        &req_id.0,
        rows.iter().map(|r| r.yelp_id.clone()).collect(),
    )
    .await?;

    let flags: Vec<FlagsListItem> = rows
        .into_iter()
        .map(|row| FlagsListItem {
            restaurant: cached.remove(&row.yelp_id).map(|c| FlagsRestaurantInfo {
                name: c.name,
                address: c.address,
                rating: c.rating,
                price: c.price,
            }),
            flags: row.into(),
        })
        .collect();

    Ok(Json(ApiResponse::success(
        req_id.0,
        FlagsListData {
            total: flags.len(),
            flags,
        },
    )))
}

/// GET /api/v1/flags/{yelp_id}
///
/// Defaults with `exists: false` when unset.
pub(super) async fn get_flags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(yelp_id): ApiPath<String>,
) -> Result<Json<ApiResponse<FlagsData>>, ApiError> {
    let row = dinewise_db::get_flags(&state.pool, user.id, &yelp_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let flags = row.map_or_else(
        || FlagsBody {
            id: None,
            yelp_id,
            visited: false,
            promo_opt_in: false,
            updated_at: None,
            exists: false,
        },
        FlagsBody::from,
    );

    Ok(Json(ApiResponse::success(
        req_id.0,
        FlagsData {
            message: None,
            flags,
        },
    )))
}

/// DELETE /api/v1/flags/{yelp_id}
pub(super) async fn delete_flags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(yelp_id): ApiPath<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let deleted = dinewise_db::delete_flags(&state.pool, user.id, &yelp_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !deleted {
        return Err(ApiError::new(req_id.0, "not_found", "Flags not found"));
    }

    Ok(Json(ApiResponse::success(
        req_id.0,
        serde_json::json!({
            "message": "Flags deleted successfully",
            "yelp_id": yelp_id,
        }),
    )))
}
