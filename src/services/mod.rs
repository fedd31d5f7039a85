//! Business logic services

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod clock;
pub mod users;

use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::loan::LoanRules,
    repository::Repository,
};

use clock::Clock;

/// Upper bound on a single store round-trip
#[derive(Debug, Clone, Copy)]
pub struct StoreTimeout(Duration);

impl StoreTimeout {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Run a store call; expiry becomes a retryable `AppError::Timeout`
    pub async fn run<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.0, call).await {
            Ok(result) => result,
            Err(_) => {
                let ms = self.0.as_millis() as u64;
                tracing::warn!(timeout_ms = ms, "Store call timed out");
                Err(AppError::Timeout(ms))
            }
        }
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub circulation: circulation::CirculationService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let timeout = StoreTimeout::from_millis(config.circulation.store_timeout_ms);
        let rules = LoanRules {
            loan_period: chrono::Duration::days(config.circulation.loan_period_days),
            fine_per_day: config.circulation.fine_per_day,
        };
        let issuer = auth::SessionIssuer::new(&config.auth);

        Self {
            auth: auth::AuthService::new(repository.clone(), issuer, timeout),
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone(), timeout),
            users: users::UsersService::new(repository.clone(), clock.clone(), timeout),
            circulation: circulation::CirculationService::new(repository, clock, rules, timeout),
        }
    }
}
