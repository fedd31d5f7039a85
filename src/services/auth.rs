//! Credentials and sessions

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{Role, SessionClaims},
    repository::Repository,
};

use super::StoreTimeout;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Mints and checks session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    secret: String,
    issuer: String,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            issuer: config.issuer.clone(),
            ttl: Duration::minutes(config.session_ttl_minutes),
        }
    }

    pub fn issue(&self, handle: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            handle: handle.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        claims
            .create_token(&self.secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify a token and return the handle it carries
    pub fn validate(&self, token: &str) -> AppResult<String> {
        SessionClaims::from_token(token, &self.secret, &self.issuer)
            .map(|claims| claims.handle)
            .map_err(|e| AppError::InvalidToken(e.to_string()))
    }
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    sessions: SessionIssuer,
    timeout: StoreTimeout,
}

impl AuthService {
    pub fn new(repository: Repository, sessions: SessionIssuer, timeout: StoreTimeout) -> Self {
        Self {
            repository,
            sessions,
            timeout,
        }
    }

    /// Authenticate a patron by handle and return a session token
    pub async fn login(&self, handle: &str, password: &str) -> AppResult<String> {
        let hash = self
            .timeout
            .run(self.repository.patrons.password_hash(handle))
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid handle or password".to_string()))?;

        if !verify_password(&hash, password)? {
            tracing::debug!(handle, "Rejected login");
            return Err(AppError::Authentication(
                "Invalid handle or password".to_string(),
            ));
        }

        let token = self.sessions.issue(handle)?;
        tracing::info!(handle, "Patron logged in");
        Ok(token)
    }

    /// Resolve a bearer token to the patron handle it was issued for
    pub fn validate_session(&self, token: &str) -> AppResult<String> {
        self.sessions.validate(token)
    }

    /// Fail unless `handle` belongs to a librarian
    pub async fn require_librarian(&self, handle: &str) -> AppResult<()> {
        let role = self
            .timeout
            .run(self.repository.patrons.role_by_handle(handle))
            .await?;

        match role {
            Some(Role::Librarian) => Ok(()),
            _ => {
                tracing::warn!(handle, "Librarian action refused");
                Err(AppError::UnauthorizedRole)
            }
        }
    }

    /// Fail unless `handle` is the patron with id `user_id`
    pub async fn require_same_user(&self, handle: &str, user_id: Uuid) -> AppResult<()> {
        let id = self
            .timeout
            .run(self.repository.patrons.id_by_handle(handle))
            .await?;

        if id == Some(user_id) {
            Ok(())
        } else {
            tracing::warn!(handle, %user_id, "Action on another patron refused");
            Err(AppError::UnauthorizedSubject)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        books::MockCatalogStore, loans::MockLoanStore, users::MockPatronStore,
    };
    use std::sync::Arc;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            session_ttl_minutes: 5,
            issuer: "Library Server".to_string(),
        }
    }

    fn service(patrons: MockPatronStore) -> AuthService {
        let repository = Repository::new(
            Arc::new(MockCatalogStore::new()),
            Arc::new(patrons),
            Arc::new(MockLoanStore::new()),
        );
        AuthService::new(
            repository,
            SessionIssuer::new(&auth_config()),
            StoreTimeout::from_millis(1000),
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password(&hash, "hunter2").unwrap());
        assert!(!verify_password(&hash, "hunter3").unwrap());
    }

    #[tokio::test]
    async fn test_login_issues_token_for_handle() {
        let hash = hash_password("pw1234").unwrap();
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_password_hash()
            .returning(move |_| Ok(Some(hash.clone())));

        let service = service(patrons);
        let token = service.login("alice", "pw1234").await.unwrap();
        assert_eq!(service.validate_session(&token).unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password_and_unknown_handle() {
        let hash = hash_password("pw1234").unwrap();
        let mut patrons = MockPatronStore::new();
        patrons.expect_password_hash().returning(move |handle| {
            Ok((handle == "alice").then(|| hash.clone()))
        });

        let service = service(patrons);
        assert!(matches!(
            service.login("alice", "nope").await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            service.login("mallory", "pw1234").await,
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_expired_session_is_invalid() {
        let config = AuthConfig {
            session_ttl_minutes: -1,
            ..auth_config()
        };
        let token = SessionIssuer::new(&config).issue("alice").unwrap();
        let result = SessionIssuer::new(&auth_config()).validate(&token);
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_require_librarian() {
        let mut patrons = MockPatronStore::new();
        patrons.expect_role_by_handle().returning(|handle| {
            Ok(match handle {
                "libby" => Some(Role::Librarian),
                "sam" => Some(Role::Student),
                _ => None,
            })
        });

        let service = service(patrons);
        assert!(service.require_librarian("libby").await.is_ok());
        assert!(matches!(
            service.require_librarian("sam").await,
            Err(AppError::UnauthorizedRole)
        ));
        assert!(matches!(
            service.require_librarian("ghost").await,
            Err(AppError::UnauthorizedRole)
        ));
    }

    #[tokio::test]
    async fn test_role_lookup_failure_is_a_store_error() {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_role_by_handle()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let err = service(patrons).require_librarian("libby").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_require_same_user() {
        let alice = Uuid::new_v4();
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_id_by_handle()
            .returning(move |handle| Ok((handle == "alice").then_some(alice)));

        let service = service(patrons);
        assert!(service.require_same_user("alice", alice).await.is_ok());
        assert!(matches!(
            service.require_same_user("alice", Uuid::new_v4()).await,
            Err(AppError::UnauthorizedSubject)
        ));
        assert!(matches!(
            service.require_same_user("bob", alice).await,
            Err(AppError::UnauthorizedSubject)
        ));
    }
}
