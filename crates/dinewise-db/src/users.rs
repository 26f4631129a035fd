//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub firebase_uid: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creates the user for `firebase_uid` on first sight, otherwise refreshes
/// the stored email and display name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails (including an email already
/// owned by a different identity).
pub async fn upsert_user(
    pool: &PgPool,
    firebase_uid: &str,
    email: &str,
    full_name: &str,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (firebase_uid, email, full_name) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (firebase_uid) DO UPDATE SET \
             email      = EXCLUDED.email, \
             full_name  = EXCLUDED.full_name, \
             updated_at = NOW() \
         RETURNING id, firebase_uid, email, full_name, created_at, updated_at",
    )
    .bind(firebase_uid)
    .bind(email)
    .bind(full_name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
