//! Authentication endpoints

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Patron handle
    #[serde(alias = "username")]
    pub handle: String,
    pub password: String,
}

/// Exchange credentials for a session token
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = String),
        (status = 400, description = "Malformed payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<String>> {
    let token = state
        .services
        .auth
        .login(&request.handle, &request.password)
        .await?;
    Ok(Json(token))
}
