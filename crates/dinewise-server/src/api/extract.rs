//! Extractors that report malformed input in the `ApiError` envelope instead
//! of axum's plain-text rejections.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, Extensions},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::ApiError;

pub(super) struct ApiQuery<T>(pub T);

pub(super) struct ApiPath<T>(pub T);

pub(super) struct ApiJson<T>(pub T);

fn request_id_of(extensions: &Extensions) -> String {
    extensions
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone())
}

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id_of(&parts.extensions),
                "bad_request",
                rejection.body_text(),
            )),
        }
    }
}

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id_of(&parts.extensions),
                "bad_request",
                rejection.body_text(),
            )),
        }
    }
}

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let req_id = request_id_of(req.extensions());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(JsonRejection::JsonDataError(rejection)) => Err(ApiError::new(
                req_id,
                "validation_error",
                rejection.body_text(),
            )),
            Err(rejection) => Err(ApiError::new(req_id, "bad_request", rejection.body_text())),
        }
    }
}
