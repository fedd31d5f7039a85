//! Patron endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, FineSummary, UpdateUser, User},
};

use super::guards::SameUser;

/// Register a patron
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Patron registered", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Handle already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateUser>, AppError>,
) -> AppResult<(StatusCode, Json<User>)> {
    request.validate()?;

    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Patron details", body = User),
        (status = 404, description = "Patron not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get(user_id).await?;
    Ok(Json(user))
}

/// Update one's own profile
#[utoipa::path(
    put,
    path = "/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Patron updated", body = User),
        (status = 401, description = "Not this patron", body = crate::error::ErrorResponse),
        (status = 409, description = "Handle already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    subject: SameUser,
    WithRejection(Json(request), _): WithRejection<Json<UpdateUser>, AppError>,
) -> AppResult<Json<User>> {
    request.validate()?;

    let user = state.services.users.update(subject.user_id, request).await?;
    Ok(Json(user))
}

/// Delete one's own account
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Patron deleted"),
        (status = 401, description = "Not this patron", body = crate::error::ErrorResponse),
        (status = 409, description = "Patron has loan history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    subject: SameUser,
) -> AppResult<StatusCode> {
    state.services.users.delete(subject.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Outstanding fine of one's own account
#[utoipa::path(
    get,
    path = "/users/{user_id}/fine",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Accumulated fine", body = FineSummary),
        (status = 401, description = "Not this patron", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_fine(
    State(state): State<crate::AppState>,
    subject: SameUser,
) -> AppResult<Json<FineSummary>> {
    let fine = state.services.users.fine(subject.user_id).await?;
    Ok(Json(fine))
}
