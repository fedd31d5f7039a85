//! User (patron) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Patron role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Librarian,
    Student,
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Librarian => "librarian",
            Role::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "librarian" => Ok(Role::Librarian),
            "student" => Ok(Role::Student),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role, stored as TEXT
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub student_id: String,
    pub role: Role,
    /// Unique login handle
    pub handle: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    /// Accumulated overdue fines, in the smallest currency unit
    pub total_fine: i64,
    pub registered_at: DateTime<Utc>,
}

/// Registration request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub role: Role,
    #[validate(length(min = 3, message = "Handle must be at least 3 characters"))]
    pub handle: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Update user request; absent fields are left untouched. The handle is
/// fixed at registration since sessions are bound to it.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    pub student_id: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
}

/// Outstanding fine of a patron
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FineSummary {
    pub user_id: Uuid,
    pub total_fine: i64,
}

/// JWT claims of a patron session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub handle: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Create a signed HS256 token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a token: signature, issuer and expiry (no leeway)
    pub fn from_token(
        token: &str,
        secret: &str,
        issuer: &str,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: i64) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            handle: "alice".to_string(),
            iss: "Library Server".to_string(),
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("librarian".parse::<Role>(), Ok(Role::Librarian));
        assert_eq!("Student".parse::<Role>(), Ok(Role::Student));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let token = claims(300).create_token("secret").unwrap();
        let parsed = SessionClaims::from_token(&token, "secret", "Library Server").unwrap();
        assert_eq!(parsed.handle, "alice");
    }

    #[test]
    fn test_token_rejections() {
        let expired = claims(-60).create_token("secret").unwrap();
        assert!(SessionClaims::from_token(&expired, "secret", "Library Server").is_err());

        let valid = claims(300).create_token("secret").unwrap();
        assert!(SessionClaims::from_token(&valid, "other", "Library Server").is_err());
        assert!(SessionClaims::from_token(&valid, "secret", "Someone Else").is_err());
        assert!(SessionClaims::from_token("not-a-jwt", "secret", "Library Server").is_err());
    }

    #[test]
    fn test_password_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            student_id: String::new(),
            role: Role::Student,
            handle: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "$argon2id$hash".to_string(),
            total_fine: 0,
            registered_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "student");
    }

    #[test]
    fn test_update_cannot_carry_a_handle() {
        let rename = serde_json::json!({ "handle": "alice2" });
        assert!(serde_json::from_value::<UpdateUser>(rename).is_err());

        let email = serde_json::json!({ "email": "alice@example.org" });
        let update: UpdateUser = serde_json::from_value(email).unwrap();
        assert_eq!(update.email.as_deref(), Some("alice@example.org"));
    }
}
