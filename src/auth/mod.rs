pub mod cookies;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use cookies::{cleared_cookies, session_cookies, ACCESS_COOKIE, REFRESH_COOKIE};
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{ensure_password, hash_password, verify_password};
pub use token::{generate_session, generate_token, verify_token, Claims, SessionTokens, TokenKind};

lazy_static! {
    // Display names: letters, digits, spaces and a little punctuation.
    pub(crate) static ref NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[\p{L}\p{N} .'_-]+$").unwrap();
}

/// Payload of `PUT /user/login`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Payload of `POST /user`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 50),
        regex(
            path = "NAME_REGEX",
            message = "Name may only contain letters, digits, spaces and . ' _ -"
        )
    )]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

impl RegisterRequest {
    /// Trims every field and rejects blank ones before the field-level validation runs.
    pub fn normalized(&self) -> Result<Self, crate::error::AppError> {
        let request = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
        };
        if [&request.name, &request.email, &request.password]
            .iter()
            .any(|value| value.trim().is_empty())
        {
            return Err(crate::error::AppError::BadRequest(
                "All fields are required".into(),
            ));
        }
        request.validate()?;
        Ok(request)
    }
}
