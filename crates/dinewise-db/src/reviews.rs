//! Database operations for the `reviews` table (reviews written by our users,
//! not the directory's).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const REVIEW_WITH_AUTHOR_SELECT: &str =
    "SELECT r.id, r.user_id, r.yelp_id, r.rating, r.text, r.created_at, r.updated_at, \
            u.full_name AS author_name \
     FROM reviews r \
     JOIN users u ON u.id = r.user_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub user_id: i64,
    pub yelp_id: String,
    pub rating: i16,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with its author.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewWithAuthorRow {
    pub id: i64,
    pub user_id: i64,
    pub yelp_id: String,
    pub rating: i16,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: String,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including CHECK violations
/// on rating or text length).
pub async fn create_review(
    pool: &PgPool,
    user_id: i64,
    yelp_id: &str,
    rating: i16,
    text: &str,
) -> Result<ReviewRow, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(
        "INSERT INTO reviews (user_id, yelp_id, rating, text) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, user_id, yelp_id, rating, text, created_at, updated_at",
    )
    .bind(user_id)
    .bind(yelp_id)
    .bind(rating)
    .bind(text)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a review by id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review(pool: &PgPool, id: i64) -> Result<Option<ReviewRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, user_id, yelp_id, rating, text, created_at, updated_at \
         FROM reviews WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns reviews newest first, optionally restricted to one business.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &PgPool,
    yelp_id: Option<&str>,
    limit: i64,
) -> Result<Vec<ReviewWithAuthorRow>, DbError> {
    let sql = format!(
        "{REVIEW_WITH_AUTHOR_SELECT} \
         WHERE ($1::TEXT IS NULL OR r.yelp_id = $1) \
         ORDER BY r.created_at DESC, r.id DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, ReviewWithAuthorRow>(&sql)
        .bind(yelp_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns every review written by `user_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews_by_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<ReviewWithAuthorRow>, DbError> {
    let sql = format!(
        "{REVIEW_WITH_AUTHOR_SELECT} \
         WHERE r.user_id = $1 \
         ORDER BY r.created_at DESC, r.id DESC"
    );
    let rows = sqlx::query_as::<_, ReviewWithAuthorRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Applies a partial update; `None` fields keep their stored value.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_review(
    pool: &PgPool,
    id: i64,
    rating: Option<i16>,
    text: Option<&str>,
) -> Result<ReviewRow, DbError> {
    sqlx::query_as::<_, ReviewRow>(
        "UPDATE reviews SET \
             rating     = COALESCE($2, rating), \
             text       = COALESCE($3, text), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, user_id, yelp_id, rating, text, created_at, updated_at",
    )
    .bind(id)
    .bind(rating)
    .bind(text)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Deletes a review. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_review(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
