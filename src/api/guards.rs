//! Access guards, as request extractors.
//!
//! A handler lists the guards it needs among its arguments. Guards run before
//! the handler body, and the first rejection short-circuits the request, so a
//! rejected call never reaches the handler. `Librarian` and `SameUser` both
//! start by extracting `LoggedIn`.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{error::AppError, AppState};

/// Path segment checked by [`SameUser`]
pub const USER_ID_PARAM: &str = "user_id";

/// A request carrying a valid session token
#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub handle: String,
}

#[async_trait]
impl FromRequestParts<AppState> for LoggedIn {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by an outer guard
        if let Some(session) = parts.extensions.get::<LoggedIn>() {
            return Ok(session.clone());
        }

        let header = parts.headers.get(AUTHORIZATION).ok_or_else(|| {
            tracing::debug!("Request without authorization header");
            AppError::HeaderRequired
        })?;

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::InvalidToken("Invalid authorization header format".to_string()))?;

        let handle = state.services.auth.validate_session(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            e
        })?;

        let session = LoggedIn { handle };
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

/// A logged-in patron whose role is librarian
#[derive(Debug, Clone)]
pub struct Librarian(pub LoggedIn);

#[async_trait]
impl FromRequestParts<AppState> for Librarian {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = LoggedIn::from_request_parts(parts, state).await?;
        state.services.auth.require_librarian(&session.handle).await?;
        Ok(Librarian(session))
    }
}

/// A logged-in patron acting on their own record (`/users/:user_id/...`).
/// Librarians are not exempt.
#[derive(Debug, Clone)]
pub struct SameUser {
    pub session: LoggedIn,
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for SameUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = LoggedIn::from_request_parts(parts, state).await?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state).await?;
        let user_id = params
            .get(USER_ID_PARAM)
            .ok_or_else(|| AppError::Internal("Route has no user id segment".to_string()))?
            .parse::<Uuid>()
            .map_err(|e| AppError::BadRequest(format!("Invalid user id: {}", e)))?;

        state
            .services
            .auth
            .require_same_user(&session.handle, user_id)
            .await?;

        Ok(SameUser { session, user_id })
    }
}
