//! Catalog endpoints: books and their copies

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
    models::{
        book::{Book, CreateBook, UpdateBook},
        book_copy::{BookCopy, CreateBookCopy, UpdateBookCopy},
    },
};

use super::guards::Librarian;

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{book_id}",
    tag = "books",
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(book_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(book_id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not a librarian", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    _librarian: Librarian,
    WithRejection(Json(request), _): WithRejection<Json<CreateBook>, AppError>,
) -> AppResult<(StatusCode, Json<Book>)> {
    request.validate()?;

    let book = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    put,
    path = "/books/{book_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 401, description = "Not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    _librarian: Librarian,
    WithRejection(Path(book_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBook>, AppError>,
) -> AppResult<Json<Book>> {
    request.validate()?;

    let book = state.services.catalog.update_book(book_id, request).await?;
    Ok(Json(book))
}

/// Delete a book and its copies. Refused once any copy has been lent.
#[utoipa::path(
    delete,
    path = "/books/{book_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book has loan history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    _librarian: Librarian,
    WithRejection(Path(book_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Register a physical copy of a book; the book's quantity goes up by one
#[utoipa::path(
    post,
    path = "/books/{book_id}/bookcopies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    request_body = CreateBookCopy,
    responses(
        (status = 201, description = "Copy created", body = BookCopy),
        (status = 401, description = "Not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Store failure, nothing written", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_copy(
    State(state): State<crate::AppState>,
    _librarian: Librarian,
    WithRejection(Path(book_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<CreateBookCopy>, AppError>,
) -> AppResult<(StatusCode, Json<BookCopy>)> {
    let copy = state.services.catalog.create_copy(book_id, request).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

#[utoipa::path(
    get,
    path = "/books/{book_id}/bookcopies/{copy_id}",
    tag = "books",
    params(
        ("book_id" = Uuid, Path, description = "Book ID"),
        ("copy_id" = Uuid, Path, description = "Book copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookCopy),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    WithRejection(Path((book_id, copy_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<Json<BookCopy>> {
    let copy = state.services.catalog.get_copy(book_id, copy_id).await?;
    Ok(Json(copy))
}

#[utoipa::path(
    put,
    path = "/books/{book_id}/bookcopies/{copy_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID"),
        ("copy_id" = Uuid, Path, description = "Book copy ID")
    ),
    request_body = UpdateBookCopy,
    responses(
        (status = 200, description = "Copy updated", body = BookCopy),
        (status = 401, description = "Not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_copy(
    State(state): State<crate::AppState>,
    _librarian: Librarian,
    WithRejection(Path((book_id, copy_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBookCopy>, AppError>,
) -> AppResult<Json<BookCopy>> {
    let copy = state
        .services
        .catalog
        .update_copy(book_id, copy_id, request)
        .await?;
    Ok(Json(copy))
}

#[utoipa::path(
    delete,
    path = "/books/{book_id}/bookcopies/{copy_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = Uuid, Path, description = "Book ID"),
        ("copy_id" = Uuid, Path, description = "Book copy ID")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 401, description = "Not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy has loan history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_copy(
    State(state): State<crate::AppState>,
    _librarian: Librarian,
    WithRejection(Path((book_id, copy_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_copy(book_id, copy_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
