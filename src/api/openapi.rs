//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Server API",
        version = "1.0.0",
        description = "Catalog, patrons and circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        health::health_check,
        auth::login,
        // Books and copies
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::create_copy,
        books::get_copy,
        books::update_copy,
        books::delete_copy,
        // Circulation
        loans::borrow,
        loans::return_copy,
        loans::get_loan,
        // Users
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::get_fine,
    ),
    components(
        schemas(
            auth::LoginRequest,
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book_copy::BookCopy,
            crate::models::book_copy::CreateBookCopy,
            crate::models::book_copy::UpdateBookCopy,
            crate::models::loan::Loan,
            crate::models::loan::LoanState,
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::FineSummary,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check"),
        (name = "auth", description = "Sessions"),
        (name = "books", description = "Books and physical copies"),
        (name = "loans", description = "Borrowing and returning copies"),
        (name = "users", description = "Patrons")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_circulation_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc
            .paths
            .paths
            .contains_key("/books/{book_id}/bookcopies/{copy_id}/borrow"));
        assert!(doc.paths.paths.contains_key("/login"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
