use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of both session tokens, matching the cookie max-age.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Which of the two session tokens a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Represents the claims encoded within a session JWT.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's id.
    pub sub: Uuid,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    pub kind: TokenKind,
}

/// Access and refresh token issued together at login.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET").map_err(|_| {
        log::error!("JWT_SECRET is not set");
        AppError::InternalServerError("JWT_SECRET not set".into())
    })
}

/// Signs a token of `kind` for `user_id` that expires in [`TOKEN_TTL_HOURS`].
///
/// Returns `AppError::InternalServerError` if `JWT_SECRET` is missing or encoding fails.
pub fn generate_token(user_id: Uuid, kind: TokenKind) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::InternalServerError("token expiry out of range".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        exp: expiration,
        kind,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret()?.as_bytes()),
    )
    .map_err(|e| {
        AppError::InternalServerError(format!(
            "Something went wrong while generating refresh and access token: {}",
            e
        ))
    })
}

pub fn generate_session(user_id: Uuid) -> Result<SessionTokens, AppError> {
    Ok(SessionTokens {
        access: generate_token(user_id, TokenKind::Access)?,
        refresh: generate_token(user_id, TokenKind::Refresh)?,
    })
}

/// Verifies a JWT and checks that it is of the `expected` kind.
///
/// Returns `AppError::Unauthorized` for malformed, expired or wrongly signed tokens and for
/// a refresh token presented where an access token is required.
pub fn verify_token(token: &str, expected: TokenKind) -> Result<Claims, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret()?.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if claims.kind != expected {
        return Err(AppError::Unauthorized("Invalid token: wrong token kind".into()));
    }
    Ok(claims)
}
