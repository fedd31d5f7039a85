//! Circulation endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::Loan,
};

use super::guards::LoggedIn;

/// Borrow a copy for the logged-in patron
#[utoipa::path(
    post,
    path = "/books/{book_id}/bookcopies/{copy_id}/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID"),
        ("copy_id" = Uuid, Path, description = "Book copy ID")
    ),
    responses(
        (status = 200, description = "Loan opened", body = Loan),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown patron or copy", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy is already borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    session: LoggedIn,
    WithRejection(Path((_book_id, copy_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .circulation
        .borrow(&session.handle, copy_id)
        .await?;
    Ok(Json(loan))
}

/// Return a copy held by the logged-in patron
#[utoipa::path(
    post,
    path = "/books/{book_id}/bookcopies/{copy_id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID"),
        ("copy_id" = Uuid, Path, description = "Book copy ID")
    ),
    responses(
        (status = 200, description = "Loan closed, with any overdue fine", body = Loan),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse),
        (status = 404, description = "No open loan of this copy for the patron", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_copy(
    State(state): State<crate::AppState>,
    session: LoggedIn,
    WithRejection(Path((_book_id, copy_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .circulation
        .return_copy(&session.handle, copy_id)
        .await?;
    Ok(Json(loan))
}

#[utoipa::path(
    get,
    path = "/loans/{loan_id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("loan_id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    _session: LoggedIn,
    WithRejection(Path(loan_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.get(loan_id).await?;
    Ok(Json(loan))
}
