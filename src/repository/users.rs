//! Patron store

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User},
};

use super::{is_foreign_key_violation, is_unique_violation};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatronStore: Send + Sync {
    async fn save_user(&self, user: &User) -> AppResult<User>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn update_user(&self, user: &User) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    async fn id_by_handle(&self, handle: &str) -> AppResult<Option<Uuid>>;
    async fn role_by_handle(&self, handle: &str) -> AppResult<Option<Role>>;
    async fn password_hash(&self, handle: &str) -> AppResult<Option<String>>;
    async fn total_fine(&self, id: Uuid) -> AppResult<Option<i64>>;
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn handle_taken(err: sqlx::Error, handle: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("Handle {} already exists", handle))
    } else {
        AppError::Database(err)
    }
}

#[async_trait]
impl PatronStore for UsersRepository {
    async fn save_user(&self, user: &User) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, student_id, role, handle, email, password, total_fine, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.student_id)
        .bind(user.role)
        .bind(&user.handle)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.total_fine)
        .bind(user.registered_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| handle_taken(e, &user.handle))
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Profile fields only: the fine total is owned by circulation
    async fn update_user(&self, user: &User) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET student_id = $2, handle = $3, email = $4, password = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.student_id)
        .bind(&user.handle)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| handle_taken(e, &user.handle))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict(format!("User {} has loan history", id))
                } else {
                    AppError::Database(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn id_by_handle(&self, handle: &str) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn role_by_handle(&self, handle: &str) -> AppResult<Option<Role>> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn password_hash(&self, handle: &str) -> AppResult<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    async fn total_fine(&self, id: Uuid) -> AppResult<Option<i64>> {
        let fine = sqlx::query_scalar::<_, i64>("SELECT total_fine FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(fine)
    }
}
