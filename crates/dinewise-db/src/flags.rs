//! Per-user visit and promotion flags (`user_restaurant_flags`).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FlagsRow {
    pub id: i64,
    pub user_id: i64,
    pub yelp_id: String,
    pub visited: bool,
    pub promo_opt_in: bool,
    pub updated_at: DateTime<Utc>,
}

/// Creates or partially updates the flags for `(user_id, yelp_id)`.
///
/// On creation, missing values default to `false`. On update, missing
/// values keep what is stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_flags(
    pool: &PgPool,
    user_id: i64,
    yelp_id: &str,
    visited: Option<bool>,
    promo_opt_in: Option<bool>,
) -> Result<FlagsRow, DbError> {
    let row = sqlx::query_as::<_, FlagsRow>(
        "INSERT INTO user_restaurant_flags (user_id, yelp_id, visited, promo_opt_in) \
         VALUES ($1, $2, COALESCE($3, FALSE), COALESCE($4, FALSE)) \
         ON CONFLICT (user_id, yelp_id) DO UPDATE SET \
             visited      = COALESCE($3, user_restaurant_flags.visited), \
             promo_opt_in = COALESCE($4, user_restaurant_flags.promo_opt_in), \
             updated_at   = NOW() \
         RETURNING id, user_id, yelp_id, visited, promo_opt_in, updated_at",
    )
    .bind(user_id)
    .bind(yelp_id)
    .bind(visited)
    .bind(promo_opt_in)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_flags(
    pool: &PgPool,
    user_id: i64,
    yelp_id: &str,
) -> Result<Option<FlagsRow>, DbError> {
    let row = sqlx::query_as::<_, FlagsRow>(
        "SELECT id, user_id, yelp_id, visited, promo_opt_in, updated_at \
         FROM user_restaurant_flags WHERE user_id = $1 AND yelp_id = $2",
    )
    .bind(user_id)
    .bind(yelp_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns all of the user's flags, most recently updated first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_flags(pool: &PgPool, user_id: i64) -> Result<Vec<FlagsRow>, DbError> {
    let rows = sqlx::query_as::<_, FlagsRow>(
        "SELECT id, user_id, yelp_id, visited, promo_opt_in, updated_at \
         FROM user_restaurant_flags WHERE user_id = $1 \
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes the flags for `(user_id, yelp_id)`. Returns `false` if none existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_flags(pool: &PgPool, user_id: i64, yelp_id: &str) -> Result<bool, DbError> {
    let result =
        sqlx::query("DELETE FROM user_restaurant_flags WHERE user_id = $1 AND yelp_id = $2")
            .bind(user_id)
            .bind(yelp_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}
