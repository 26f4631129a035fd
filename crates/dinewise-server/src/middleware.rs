use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use dinewise_db::UserRow;
use dinewise_identity::IdentityVerifier;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The signed-in user, inserted by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

/// Identity verification plus the pool used to provision local users.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub pool: PgPool,
}

fn unauthorized(req_id: String, message: &'static str) -> Response {
    let mut res = ApiError::new(req_id, "unauthorized", message).into_response();
    res.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone())
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is inserted into request
/// extensions as [`RequestId`] and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Verifies the bearer ID token and provisions the local user on first sight.
///
/// A missing or rejected token is a 401 with `WWW-Authenticate: Bearer`.
pub async fn require_user(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let req_id = request_id_of(&req);
    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) else {
        return unauthorized(req_id, "missing bearer token");
    };

    let identity = match auth.verifier.verify(token).await {
        Ok(identity) => identity,
        Err(error) => {
            tracing::info!(error = %error, "rejected identity token");
            return unauthorized(req_id, "invalid or expired token");
        }
    };

    let user = match dinewise_db::upsert_user(
        &auth.pool,
        &identity.uid,
        &identity.email,
        identity.name_or_email(),
    )
    .await
    {
        Ok(user) => user,
        Err(error) => {
            tracing::error!(error = %error, uid = %identity.uid, "failed to provision user");
            return ApiError::new(req_id, "internal_error", "failed to load user").into_response();
        }
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
