//! Community reviews written by signed-in users.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dinewise_db::{ReviewRow, ReviewWithAuthorRow};
use serde::{Deserialize, Serialize};

use crate::middleware::{CurrentUser, RequestId};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::wishlist::validate_yelp_id;
use super::{load_cached, map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

const MAX_TEXT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub(super) struct CreateReviewRequest {
    pub yelp_id: String,
    pub rating: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReviewListQuery {
    pub yelp_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewAuthorInfo {
    id: i64,
    full_name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewRestaurantInfo {
    name: String,
    address: Option<String>,
    rating: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewItem {
    id: i64,
    yelp_id: String,
    rating: i16,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user: ReviewAuthorInfo,
    restaurant: Option<ReviewRestaurantInfo>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewListData {
    total: usize,
    reviews: Vec<ReviewItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewBody {
    id: i64,
    user_id: i64,
    yelp_id: String,
    rating: i16,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for ReviewBody {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            yelp_id: row.yelp_id,
            rating: row.rating,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewWriteData {
    message: &'static str,
    review: ReviewBody,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewDeletedData {
    message: &'static str,
    review_id: i64,
}

fn validate_rating(req_id: &str, rating: i64) -> Result<i16, ApiError> {
    match i16::try_from(rating) {
        Ok(r @ 1..=5) => Ok(r),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("rating must be between 1 and 5, got {rating}"),
        )),
    }
}

fn validate_text(req_id: &str, raw: &str) -> Result<String, ApiError> {
    let text = raw.trim();
    let chars = text.chars().count();
    if chars == 0 || chars > MAX_TEXT_CHARS {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("text must be 1-{MAX_TEXT_CHARS} characters"),
        ));
    }
    Ok(text.to_owned())
}

async fn enrich(
    state: &AppState,
    req_id: &str,
    rows: Vec<ReviewWithAuthorRow>,
) -> Result<Vec<ReviewItem>, ApiError> {
    let cached = load_cached(
        &state.pool,
        req_id,
        rows.iter().map(|r| r.yelp_id.clone()).collect(),
    )
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ReviewItem {
            restaurant: cached.get(&row.yelp_id).map(|c| ReviewRestaurantInfo {
                name: c.name.clone(),
                address: c.address.clone(),
                rating: c.rating,
            }),
            user: ReviewAuthorInfo {
                id: row.user_id,
                full_name: row.author_name,
            },
            id: row.id,
            yelp_id: row.yelp_id,
            rating: row.rating,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect())
}

/// Loads a review and checks the caller wrote it.
async fn owned_review(
    state: &AppState,
    req_id: &str,
    review_id: i64,
    user_id: i64,
    action: &str,
) -> Result<ReviewRow, ApiError> {
    let review = dinewise_db::get_review(&state.pool, review_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(req_id, "not_found", "Review not found"))?;

    if review.user_id != user_id {
        return Err(ApiError::new(
            req_id,
            "forbidden",
            format!("You can only {action} your own reviews"),
        ));
    }
    Ok(review)
}

/// POST /api/v1/reviews
pub(super) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewWriteData>>), ApiError> {
    let rid = &req_id.0;
    let yelp_id = validate_yelp_id(rid, &body.yelp_id)?;
    let rating = validate_rating(rid, body.rating)?;
    let text = validate_text(rid, &body.text)?;

    let row = dinewise_db::create_review(&state.pool, user.id, &yelp_id, rating, &text)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(review_id = row.id, user_id = user.id, yelp_id = %yelp_id, "review created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            req_id.0,
            ReviewWriteData {
                message: "Review created successfully",
                review: row.into(),
            },
        )),
    ))
}

/// GET /api/v1/reviews
///
/// Public, newest first.
pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> Result<Json<ApiResponse<ReviewListData>>, ApiError> {
    let yelp_id = query
        .yelp_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let rows = dinewise_db::list_reviews(&state.pool, yelp_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let reviews = enrich(&state, &req_id.0, rows).await?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        ReviewListData {
            total: reviews.len(),
            reviews,
        },
    )))
}

/// GET /api/v1/users/me/reviews
pub(super) async fn list_my_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ReviewListData>>, ApiError> {
    let rows = dinewise_db::list_reviews_by_user(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let reviews = enrich(&state, &req_id.0, rows).await?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        ReviewListData {
            total: reviews.len(),
            reviews,
        },
    )))
}

/// PATCH /api/v1/reviews/{review_id}
pub(super) async fn update_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(review_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewWriteData>>, ApiError> {
    let rid = &req_id.0;
    let rating = body.rating.map(|r| validate_rating(rid, r)).transpose()?;
    let text = body
        .text
        .as_deref()
        .map(|t| validate_text(rid, t))
        .transpose()?;

    owned_review(&state, rid, review_id, user.id, "update").await?;

    let row = dinewise_db::update_review(&state.pool, review_id, rating, text.as_deref())
        .await
        .map_err(|e| match e {
            dinewise_db::DbError::NotFound => ApiError::new(rid, "not_found", "Review not found"),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse::success(
        req_id.0,
        ReviewWriteData {
            message: "Review updated successfully",
            review: row.into(),
        },
    )))
}

/// DELETE /api/v1/reviews/{review_id}
pub(super) async fn delete_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(review_id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ReviewDeletedData>>, ApiError> {
    let rid = &req_id.0;
    owned_review(&state, rid, review_id, user.id, "delete").await?;

    let deleted = dinewise_db::delete_review(&state.pool, review_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", "Review not found"));
    }

    Ok(Json(ApiResponse::success(
        req_id.0,
        ReviewDeletedData {
            message: "Review deleted successfully",
            review_id,
        },
    )))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::{validate_rating, validate_text};
    use crate::api::test_support::{app_with, lazy_pool, send};
    use crate::discovery::testing::{FakeDirectory, MemoryStore};

    #[test]
    fn rating_must_be_one_to_five() {
        assert_eq!(validate_rating("r", 1).expect("valid"), 1);
        assert_eq!(validate_rating("r", 5).expect("valid"), 5);
        assert!(validate_rating("r", 0).is_err());
        assert!(validate_rating("r", 6).is_err());
        assert!(validate_rating("r", i64::MAX).is_err());
    }

    #[test]
    fn text_is_trimmed_and_bounded_in_characters() {
        assert_eq!(validate_text("r", "  tasty  ").expect("valid"), "tasty");
        assert!(validate_text("r", "   ").is_err());
        assert!(validate_text("r", &"é".repeat(1000)).is_ok());
        assert!(validate_text("r", &"a".repeat(1001)).is_err());
    }

    #[tokio::test]
    async fn writing_a_review_requires_auth() {
        let app = app_with(lazy_pool(), FakeDirectory::default(), MemoryStore::default());
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/reviews",
            None,
            Some(json!({"yelp_id": "x", "rating": 4, "text": "ok"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn review_lifecycle_enforces_ownership(pool: sqlx::PgPool) {
        let app = app_with(pool, FakeDirectory::default(), MemoryStore::default());
        let author = Some("token-dee");
        let stranger = Some("token-eli");

        let (status, json) = send(
            &app,
            "POST",
            "/api/v1/reviews",
            author,
            Some(json!({"yelp_id": "di-fara", "rating": 5, "text": "  Best slice.  "})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["review"]["text"], "Best slice.");
        let id = json["review"]["id"].as_i64().expect("review id");

        let (status, json) = send(&app, "GET", "/api/v1/reviews?yelp_id=di-fara", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["reviews"][0]["user"]["full_name"], "Diner dee");
        assert!(json["reviews"][0]["user"].get("email").is_none());

        let uri = format!("/api/v1/reviews/{id}");
        let (status, json) = send(&app, "PATCH", &uri, stranger, Some(json!({"rating": 1}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "forbidden");

        let (status, json) = send(&app, "PATCH", &uri, author, Some(json!({"rating": 4}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["review"]["rating"], 4);
        assert_eq!(json["review"]["text"], "Best slice.");

        let (status, _) = send(&app, "DELETE", &uri, stranger, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, json) = send(&app, "GET", "/api/v1/users/me/reviews", author, None).await;
        assert_eq!(json["total"], 1);

        let (status, _) = send(&app, "DELETE", &uri, author, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "DELETE", &uri, author, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn invalid_reviews_are_rejected(pool: sqlx::PgPool) {
        let app = app_with(pool, FakeDirectory::default(), MemoryStore::default());
        for body in [
            json!({"yelp_id": "x", "rating": 6, "text": "fine"}),
            json!({"yelp_id": "x", "rating": 3, "text": "   "}),
            json!({"yelp_id": "", "rating": 3, "text": "fine"}),
        ] {
            let (status, json) =
                send(&app, "POST", "/api/v1/reviews", Some("token-fay"), Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"]["code"], "validation_error");
        }
    }
}
