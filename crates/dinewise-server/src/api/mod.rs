mod auth;
mod extract;
mod flags;
mod restaurants;
mod reviews;
mod search;
mod wishlist;

use std::collections::HashMap;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use dinewise_core::Coordinates;
use dinewise_db::CachedRestaurantRow;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::discovery::{Discovery, DiscoveryError};
use crate::middleware::{request_id, require_user, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub discovery: Discovery,
}

/// Success envelope: `status: "success"`, the payload's fields, and `meta`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(flatten)]
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    database: &'static str,
    meta: ResponseMeta,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn success(request_id: String, data: T) -> Self {
        Self {
            status: "success",
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" | "upstream_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(100).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &dinewise_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Maps a discovery failure to its wire code. Storage causes are logged and
/// never echoed.
pub(super) fn map_discovery_error(request_id: String, error: DiscoveryError) -> ApiError {
    match error {
        DiscoveryError::RateLimited(message) => {
            ApiError::new(request_id, "rate_limited", message)
        }
        DiscoveryError::BadRequest(message) => ApiError::new(request_id, "bad_request", message),
        DiscoveryError::Upstream(message) => {
            tracing::warn!(error = %message, "directory request failed");
            ApiError::new(request_id, "upstream_error", message)
        }
        DiscoveryError::NotFound(message) => ApiError::new(request_id, "not_found", message),
        DiscoveryError::Storage(error) => map_db_error(request_id, &error),
    }
}

/// Basic cached facts attached to user-owned rows.
#[derive(Debug, Serialize)]
pub(super) struct CachedRestaurantInfo {
    pub id: String,
    pub name: String,
    pub rating: f64,
    pub price: Option<String>,
    pub categories: Vec<String>,
    pub review_count: i32,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl From<CachedRestaurantRow> for CachedRestaurantInfo {
    fn from(row: CachedRestaurantRow) -> Self {
        let coordinates = row.coordinates();
        Self {
            id: row.yelp_id,
            name: row.name,
            rating: row.rating,
            price: row.price,
            categories: row.categories.0,
            review_count: row.review_count,
            address: row.address,
            phone: row.phone,
            coordinates,
        }
    }
}

/// Loads cached rows for `yelp_ids` in one query.
pub(super) async fn load_cached(
    pool: &PgPool,
    request_id: &str,
    yelp_ids: Vec<String>,
) -> Result<HashMap<String, CachedRestaurantRow>, ApiError> {
    dinewise_db::get_cached_restaurants(pool, &yelp_ids)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/search", get(search::search))
        .route("/api/v1/search/nearby", get(search::nearby))
        .route(
            "/api/v1/restaurants/{yelp_id}",
            get(restaurants::get_restaurant),
        )
        .route(
            "/api/v1/restaurants/{yelp_id}/reviews",
            get(restaurants::list_directory_reviews),
        )
        .route("/api/v1/reviews", get(reviews::list_reviews))
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/me", get(auth::me))
        .route(
            "/api/v1/wishlist",
            get(wishlist::list_wishlist).post(wishlist::add_to_wishlist),
        )
        .route(
            "/api/v1/wishlist/{yelp_id}",
            delete(wishlist::remove_from_wishlist),
        )
        .route(
            "/api/v1/wishlist/check/{yelp_id}",
            get(wishlist::check_wishlist),
        )
        .route("/api/v1/reviews", axum::routing::post(reviews::create_review))
        .route(
            "/api/v1/reviews/{review_id}",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/api/v1/users/me/reviews", get(reviews::list_my_reviews))
        .route("/api/v1/flags", get(flags::list_flags))
        .route(
            "/api/v1/flags/{yelp_id}",
            get(flags::get_flags)
                .put(flags::upsert_flags)
                .delete(flags::delete_flags),
        )
        .layer(axum::middleware::from_fn_with_state(auth, require_user))
}

pub fn build_app(state: AppState, auth: AuthState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(public_router())
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors(cors_origins))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match dinewise_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                service: "dinewise",
                database: "ok",
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    service: "dinewise",
                    database: "unavailable",
                    meta,
                }),
            )
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{app_with, lazy_pool, send};
    use super::*;
    use crate::discovery::testing::{FakeDirectory, MemoryStore};

    #[test]
    fn error_codes_map_to_statuses() {
        for (code, status) in [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("upstream_error", StatusCode::BAD_REQUEST),
            ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
            ("forbidden", StatusCode::FORBIDDEN),
            ("upstream_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let response = ApiError::new("req-1", code, "message").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 100);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn success_envelope_flattens_payload() {
        #[derive(Serialize)]
        struct Payload {
            total: usize,
        }
        let json =
            serde_json::to_value(ApiResponse::success("req-9".to_string(), Payload { total: 3 }))
                .expect("serialize");
        assert_eq!(json["status"], "success");
        assert_eq!(json["total"], 3);
        assert_eq!(json["meta"]["request_id"], "req-9");
    }

    #[tokio::test]
    async fn health_reports_degraded_without_database() {
        let app = app_with(lazy_pool(), FakeDirectory::default(), MemoryStore::default());
        let (status, json) = send(&app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["database"], "unavailable");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok_with_database(pool: sqlx::PgPool) {
        let app = app_with(pool, FakeDirectory::default(), MemoryStore::default());
        let (status, json) = send(&app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = app_with(lazy_pool(), FakeDirectory::default(), MemoryStore::default());

        let (status, json) = send(&app, "GET", "/api/v1/wishlist", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json["meta"]["request_id"].is_string());

        let (status, json) = send(&app, "GET", "/api/v1/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn provisioning_failure_uses_the_error_envelope() {
        let app = app_with(lazy_pool(), FakeDirectory::default(), MemoryStore::default());

        let (status, json) = send(&app, "GET", "/api/v1/auth/me", Some("token-cy"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "internal_error");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn request_id_header_is_echoed() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let app = app_with(lazy_pool(), FakeDirectory::default(), MemoryStore::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/search?location=MAN")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(
            response.headers().get("x-request-id"),
            Some(&HeaderValue::from_static("abc-123"))
        );
    }
}
