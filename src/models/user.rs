use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_COLUMNS: &str =
    "id, name, email, password_hash, refresh_token, created_at, updated_at";

/// A stored account. The hash and refresh token never leave the server.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal user listing used for assignment pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
}

/// Returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedInUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for LoggedInUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Profile fields that `PATCH /user/{field}` may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Email,
    Name,
    Password,
}

impl UserField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Email => "email",
            UserField::Name => "name",
            UserField::Password => "password",
        }
    }
}

impl FromStr for UserField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email" => Ok(UserField::Email),
            "name" => Ok(UserField::Name),
            "password" => Ok(UserField::Password),
            _ => Err(AppError::BadRequest("Invalid field type".into())),
        }
    }
}

/// Body of `PATCH /user/{field}`. `password` carries the current password on password changes.
#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_field_parsing() {
        assert_eq!("email".parse::<UserField>().unwrap(), UserField::Email);
        assert_eq!("password".parse::<UserField>().unwrap().as_str(), "password");
        assert!(matches!(
            "role".parse::<UserField>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            refresh_token: Some("token".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(LoggedInUser::from(&user).name, "Ada");
    }
}
