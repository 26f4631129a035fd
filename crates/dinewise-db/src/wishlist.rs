//! Database operations for the `wishlist` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistRow {
    pub id: i64,
    pub user_id: i64,
    pub yelp_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AddedRow {
    #[sqlx(flatten)]
    row: WishlistRow,
    is_new: bool,
}

/// Adds `yelp_id` to the user's wishlist.
///
/// Idempotent: returns the existing row and `false` when the entry was
/// already present, or the new row and `true`. The conflict arm is a no-op
/// update so the row is returned in the same statement, even when another
/// request inserts or removes it concurrently.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn add_to_wishlist(
    pool: &PgPool,
    user_id: i64,
    yelp_id: &str,
) -> Result<(WishlistRow, bool), DbError> {
    let added = sqlx::query_as::<_, AddedRow>(
        "INSERT INTO wishlist (user_id, yelp_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, yelp_id) DO UPDATE SET yelp_id = EXCLUDED.yelp_id \
         RETURNING id, user_id, yelp_id, created_at, (xmax = 0) AS is_new",
    )
    .bind(user_id)
    .bind(yelp_id)
    .fetch_one(pool)
    .await?;

    Ok((added.row, added.is_new))
}

/// Returns the user's wishlist, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_wishlist(pool: &PgPool, user_id: i64) -> Result<Vec<WishlistRow>, DbError> {
    let rows = sqlx::query_as::<_, WishlistRow>(
        "SELECT id, user_id, yelp_id, created_at FROM wishlist \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Removes `yelp_id` from the user's wishlist. Returns `false` if it was not there.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn remove_from_wishlist(
    pool: &PgPool,
    user_id: i64,
    yelp_id: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND yelp_id = $2")
        .bind(user_id)
        .bind(yelp_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_in_wishlist(pool: &PgPool, user_id: i64, yelp_id: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM wishlist WHERE user_id = $1 AND yelp_id = $2)",
    )
    .bind(user_id)
    .bind(yelp_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
