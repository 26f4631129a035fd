use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::{CurrentUser, RequestId};

use super::extract::{ApiJson, ApiPath};
use super::{
    load_cached, map_db_error, ApiError, ApiResponse, AppState, CachedRestaurantInfo,
};

const MAX_YELP_ID_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub(super) struct AddWishlistRequest {
    pub yelp_id: String,
}

#[derive(Debug, Serialize)]
pub(super) struct WishlistEntry {
    id: i64,
    yelp_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct AddWishlistData {
    message: &'static str,
    wishlist_item: WishlistEntry,
}

#[derive(Debug, Serialize)]
pub(super) struct WishlistItem {
    id: i64,
    yelp_id: String,
    created_at: DateTime<Utc>,
    restaurant: Option<CachedRestaurantInfo>,
}

#[derive(Debug, Serialize)]
pub(super) struct WishlistData {
    total: usize,
    wishlist: Vec<WishlistItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct RemovedData {
    message: &'static str,
    yelp_id: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckData {
    yelp_id: String,
    in_wishlist: bool,
}

/// Trims a business key from a request body and checks its length.
pub(super) fn validate_yelp_id(req_id: &str, raw: &str) -> Result<String, ApiError> {
    let yelp_id = raw.trim();
    if yelp_id.is_empty() || yelp_id.chars().count() > MAX_YELP_ID_LEN {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("yelp_id must be 1-{MAX_YELP_ID_LEN} characters"),
        ));
    }
    Ok(yelp_id.to_owned())
}

/// POST /api/v1/wishlist
///
/// 201 when added, 200 when already present.
pub(super) async fn add_to_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<AddWishlistRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AddWishlistData>>), ApiError> {
    let yelp_id = validate_yelp_id(&req_id.0, &body.yelp_id)?;

    let (row, created) = dinewise_db::add_to_wishlist(&state.pool, user.id, &yelp_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let (status, message) = if created {
        (StatusCode::CREATED, "Restaurant added to wishlist")
    } else {
        (StatusCode::OK, "Restaurant already in wishlist")
    };

    Ok((
        status,
        Json(ApiResponse::success(
            req_id.0,
            AddWishlistData {
                message,
                wishlist_item: WishlistEntry {
                    id: row.id,
                    yelp_id: row.yelp_id,
                    created_at: row.created_at,
                },
            },
        )),
    ))
}

/// GET /api/v1/wishlist
///
/// Newest first, with cached restaurant facts.
pub(super) async fn list_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<WishlistData>>, ApiError> {
    let rows = dinewise_db::list_wishlist(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut cached = load_cached(
        &state.pool,
        &req_id.0,
        rows.iter().map(|r| r.yelp_id.clone()).collect(),
    )
    .await?;

    let wishlist: Vec<WishlistItem> = rows
        .into_iter()
        .map(|row| WishlistItem {
            restaurant: cached.remove(&row.yelp_id).map(CachedRestaurantInfo::from),
            id: row.id,
            yelp_id: row.yelp_id,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::success(
        req_id.0,
        WishlistData {
            total: wishlist.len(),
            wishlist,
        },
    )))
}

/// DELETE /api/v1/wishlist/{yelp_id}
pub(super) async fn remove_from_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(yelp_id): ApiPath<String>,
) -> Result<Json<ApiResponse<RemovedData>>, ApiError> {
    let removed = dinewise_db::remove_from_wishlist(&state.pool, user.id, &yelp_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !removed {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "Restaurant not found in wishlist",
        ));
    }

    Ok(Json(ApiResponse::success(
        req_id.0,
        RemovedData {
            message: "Restaurant removed from wishlist",
            yelp_id,
        },
    )))
}

/// GET /api/v1/wishlist/check/{yelp_id}
pub(super) async fn check_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(yelp_id): ApiPath<String>,
) -> Result<Json<ApiResponse<CheckData>>, ApiError> {
    let in_wishlist = dinewise_db::is_in_wishlist(&state.pool, user.id, &yelp_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        CheckData {
            yelp_id,
            in_wishlist,
        },
    )))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use dinewise_core::Provenance;
    use dinewise_db::NewCachedRestaurant;
    use serde_json::json;

    use super::validate_yelp_id;
    use crate::api::test_support::{app_with, send};
    use crate::discovery::testing::{summary, FakeDirectory, MemoryStore};

    #[test]
    fn yelp_id_is_trimmed_and_bounded() {
        assert_eq!(validate_yelp_id("r", "  abc ").expect("valid"), "abc");
        assert!(validate_yelp_id("r", "   ").is_err());
        assert!(validate_yelp_id("r", &"x".repeat(256)).is_err());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn malformed_bodies_use_the_error_envelope(pool: sqlx::PgPool) {
        let app = app_with(pool, FakeDirectory::default(), MemoryStore::default());
        let token = Some("token-bo");

        let (status, json) =
            send(&app, "POST", "/api/v1/wishlist", token, Some(json!({"yelp_id": 42}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(json["meta"]["request_id"].is_string());

        let (status, json) = send(&app, "POST", "/api/v1/wishlist", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");

        let (status, json) = send(&app, "DELETE", "/api/v1/reviews/not-a-number", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn wishlist_lifecycle(pool: sqlx::PgPool) {
        dinewise_db::upsert_restaurant(
            &pool,
            &NewCachedRestaurant::from_summary(&summary("lukes-lobster", 4.3, 50), "MAN", Provenance::Seed),
        )
        .await
        .expect("seed cache");

        let app = app_with(pool, FakeDirectory::default(), MemoryStore::default());
        let token = Some("token-ana");
        let body = json!({"yelp_id": "lukes-lobster"});

        let (status, json) = send(&app, "POST", "/api/v1/wishlist", token, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["wishlist_item"]["yelp_id"], "lukes-lobster");

        let (status, json) = send(&app, "POST", "/api/v1/wishlist", token, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Restaurant already in wishlist");

        let (_, json) = send(&app, "GET", "/api/v1/wishlist", token, None).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["wishlist"][0]["restaurant"]["name"], "Restaurant lukes-lobster");

        let (_, json) = send(&app, "GET", "/api/v1/wishlist/check/lukes-lobster", token, None).await;
        assert_eq!(json["in_wishlist"], true);

        let (_, json) = send(&app, "GET", "/api/v1/wishlist", Some("token-ben"), None).await;
        assert_eq!(json["total"], 0, "wishlists are per user");

        let (status, _) = send(&app, "DELETE", "/api/v1/wishlist/lukes-lobster", token, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, "DELETE", "/api/v1/wishlist/lukes-lobster", token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn uncached_entries_have_null_restaurant(pool: sqlx::PgPool) {
        let app = app_with(pool, FakeDirectory::default(), MemoryStore::default());
        let token = Some("token-cy");

        send(&app, "POST", "/api/v1/wishlist", token, Some(json!({"yelp_id": "unknown"}))).await;
        let (_, json) = send(&app, "GET", "/api/v1/wishlist", token, None).await;
        assert!(json["wishlist"][0]["restaurant"].is_null());
    }
}
