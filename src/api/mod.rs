//! HTTP API: handlers, guards and routing

pub mod auth;
pub mod books;
pub mod guards;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login))
        // Catalog
        .route("/books", post(books::create_book))
        .route(
            "/books/:book_id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:book_id/bookcopies", post(books::create_copy))
        .route(
            "/books/:book_id/bookcopies/:copy_id",
            get(books::get_copy)
                .put(books::update_copy)
                .delete(books::delete_copy),
        )
        // Circulation
        .route("/books/:book_id/bookcopies/:copy_id/borrow", post(loans::borrow))
        .route("/books/:book_id/bookcopies/:copy_id/return", post(loans::return_copy))
        .route("/loans/:loan_id", get(loans::get_loan))
        // Users
        .route("/users", post(users::create_user))
        .route(
            "/users/:user_id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:user_id/fine", get(users::get_fine))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
