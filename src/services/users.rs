//! Patron management service

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, FineSummary, UpdateUser, User},
    repository::Repository,
};

use super::{auth::hash_password, clock::Clock, StoreTimeout};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    timeout: StoreTimeout,
}

impl UsersService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, timeout: StoreTimeout) -> Self {
        Self {
            repository,
            clock,
            timeout,
        }
    }

    /// Register a new patron; the password is hashed before it is stored
    pub async fn register(&self, request: CreateUser) -> AppResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            student_id: request.student_id,
            role: request.role,
            handle: request.handle,
            email: request.email,
            password: hash_password(&request.password)?,
            total_fine: 0,
            registered_at: self.clock.now(),
        };

        let user = self
            .timeout
            .run(self.repository.patrons.save_user(&user))
            .await?;
        tracing::info!(user_id = %user.id, handle = %user.handle, role = %user.role, "Patron registered");
        Ok(user)
    }

    /// Get patron by ID
    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.timeout
            .run(self.repository.patrons.find_user(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Update profile fields; a new password is re-hashed
    pub async fn update(&self, id: Uuid, request: UpdateUser) -> AppResult<User> {
        let mut user = self.get(id).await?;

        if let Some(student_id) = request.student_id {
            user.student_id = student_id;
        }
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(password) = request.password {
            user.password = hash_password(&password)?;
        }

        self.timeout
            .run(self.repository.patrons.update_user(&user))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let deleted = self
            .timeout
            .run(self.repository.patrons.delete_user(id))
            .await?;
        if !deleted {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        tracing::info!(user_id = %id, "Patron deleted");
        Ok(())
    }

    /// Accumulated fine of a patron
    pub async fn fine(&self, id: Uuid) -> AppResult<FineSummary> {
        let total_fine = self
            .timeout
            .run(self.repository.patrons.total_fine(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        Ok(FineSummary {
            user_id: id,
            total_fine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::Role,
        repository::{books::MockCatalogStore, loans::MockLoanStore, users::MockPatronStore},
        services::{auth::verify_password, clock::SystemClock},
    };

    fn service(patrons: MockPatronStore) -> UsersService {
        let repository = Repository::new(
            Arc::new(MockCatalogStore::new()),
            Arc::new(patrons),
            Arc::new(MockLoanStore::new()),
        );
        UsersService::new(
            repository,
            Arc::new(SystemClock),
            StoreTimeout::from_millis(1000),
        )
    }

    fn stored_user(id: Uuid) -> User {
        User {
            id,
            student_id: "S-1".to_string(),
            role: Role::Student,
            handle: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: hash_password("old-pass").unwrap(),
            total_fine: 0,
            registered_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_save_user()
            .withf(|user| user.password != "secret" && user.total_fine == 0)
            .times(1)
            .returning(|user| Ok(user.clone()));

        let user = service(patrons)
            .register(CreateUser {
                handle: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.role, Role::Student);
        assert!(verify_password(&user.password, "secret").unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_handle_is_conflict() {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_save_user()
            .returning(|user| Err(AppError::Conflict(format!("Handle {} already exists", user.handle))));

        let err = service(patrons)
            .register(CreateUser {
                handle: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_rehashes_new_password() {
        let id = Uuid::new_v4();
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_find_user()
            .returning(move |id| Ok(Some(stored_user(id))));
        patrons
            .expect_update_user()
            .withf(|user| verify_password(&user.password, "new-pass").unwrap_or(false))
            .returning(|user| Ok(Some(user.clone())));

        let user = service(patrons)
            .update(
                id,
                UpdateUser {
                    email: Some("a@example.org".to_string()),
                    password: Some("new-pass".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(user.email, "a@example.org");
        assert_eq!(user.handle, "alice");
    }

    #[tokio::test]
    async fn test_missing_patron_is_not_found() {
        let mut patrons = MockPatronStore::new();
        patrons.expect_find_user().returning(|_| Ok(None));
        patrons.expect_total_fine().returning(|_| Ok(None));
        patrons.expect_delete_user().returning(|_| Ok(false));

        let service = service(patrons);
        let id = Uuid::new_v4();
        assert!(matches!(service.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.fine(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(id).await, Err(AppError::NotFound(_))));
    }
}
