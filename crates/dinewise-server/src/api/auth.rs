use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::{CurrentUser, RequestId};

use super::{ApiError, ApiResponse};

#[derive(Debug, Serialize)]
pub(super) struct UserBody {
    id: i64,
    email: String,
    full_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct MeData {
    user: UserBody,
}

/// GET /api/v1/auth/me
///
/// The caller, provisioned by the auth middleware.
pub(super) async fn me(
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MeData>>, ApiError> {
    Ok(Json(ApiResponse::success(
        req_id.0,
        MeData {
            user: UserBody {
                id: user.id,
                email: user.email,
                full_name: user.full_name,
                created_at: user.created_at,
            },
        },
    )))
}
