use crate::{
    auth::{
        cleared_cookies, ensure_password, generate_session, hash_password, session_cookies,
        AuthenticatedUser, LoginRequest, RegisterRequest, NAME_REGEX,
    },
    config::Config,
    error::AppError,
    models::{
        user::USER_COLUMNS, LoggedInUser, UpdateFieldRequest, User, UserField, UserSummary,
    },
    response::ApiResponse,
};
use actix_web::{get, patch, post, put, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

async fn find_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("user does not exist".into()))
}

async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(existing.is_some())
}

/// Two requests can both pass the up-front email check; the loser trips the unique
/// constraint and gets the same `400` as a plain duplicate.
fn email_conflict(err: sqlx::Error, email: &str, message: String) -> AppError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            log::debug!("unique violation on email {}", email);
            AppError::BadRequest(message)
        }
        other => other.into(),
    }
}

/// Register a new user
///
/// ## Responses:
/// - `201 Created`: the new user, without password hash or refresh token.
/// - `400 Bad Request`: a blank or malformed field, or the email is already registered.
#[post("")]
pub async fn register(
    pool: web::Data<PgPool>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.normalized()?;

    if email_taken(&pool, &request.email).await? {
        return Err(AppError::BadRequest(
            "User Already exists with this email".into(),
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&request.name)
    .bind(&request.email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await
    .map_err(|e| {
        email_conflict(
            e,
            &request.email,
            "User Already exists with this email".into(),
        )
    })?;

    log::info!("registered user {}", user.id);
    Ok(ApiResponse::created(user, "User registered successfully").into_response())
}

/// Login user
///
/// Issues an access and a refresh token, stores the refresh token and sets both as
/// HttpOnly cookies.
///
/// ## Responses:
/// - `200 OK`: `{id, name, email}`.
/// - `401 Unauthorized`: wrong password.
/// - `404 Not Found`: no user with that email.
#[put("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("email is required".into()));
    }
    LoginRequest {
        email: email.clone(),
        password: body.password.clone(),
    }
    .validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(&email)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("user doesnot exit".into()))?;

    ensure_password(
        &body.password,
        &user.password_hash,
        AppError::Unauthorized("Invalid user credentials".into()),
    )?;

    let tokens = generate_session(user.id)?;
    sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
        .bind(&tokens.refresh)
        .bind(user.id)
        .execute(&**pool)
        .await?;

    let response = ApiResponse::ok(LoggedInUser::from(&user), "user logged in successfully");
    let mut builder = response.builder();
    for cookie in session_cookies(&tokens, config.production) {
        builder.cookie(cookie);
    }
    Ok(builder.json(response))
}

/// Forgets the stored refresh token and clears both session cookies.
#[patch("/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = $1")
        .bind(user.id())
        .execute(&**pool)
        .await?;

    let response = ApiResponse::ok(json!({}), "user logged out successfully");
    let mut builder = response.builder();
    for cookie in cleared_cookies(config.production) {
        builder.cookie(cookie);
    }
    Ok(builder.json(response))
}

#[get("")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = find_user(&pool, user.id()).await?;
    Ok(ApiResponse::ok(json!({ "user": user }), "user fetched sucessfully").into_response())
}

/// Everyone except the caller, as `{id, email}`; used to pick assignees.
#[get("/all")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, email FROM users WHERE id <> $1 ORDER BY email",
    )
    .bind(user.id())
    .fetch_all(&**pool)
    .await?;

    Ok(ApiResponse::ok(users, "all users fetched successfully").into_response())
}

/// Makes user `key` a member of every task the caller belongs to.
///
/// Existing memberships are left as they are.
#[post("/add/{key}")]
pub async fn add_to_dashboard(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    key: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let target = find_user(&pool, key.into_inner()).await?;

    let task_ids: Vec<(Uuid,)> = sqlx::query_as("SELECT task_id FROM members WHERE user_id = $1")
        .bind(user.id())
        .fetch_all(&**pool)
        .await?;

    let mut tx = pool.begin().await?;
    for (task_id,) in &task_ids {
        sqlx::query(
            "INSERT INTO members (id, user_id, task_id, assigned_by) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, task_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(target.id)
        .bind(task_id)
        .bind(user.id())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    log::info!(
        "user {} added {} to {} tasks",
        user.id(),
        target.id,
        task_ids.len()
    );
    Ok(ApiResponse::created(json!({}), "user added to dashboard").into_response())
}

/// Checks `content` for the given field and returns the value to store.
///
/// Passwords come back hashed; the current password must be supplied to change it.
fn prepared_value(
    field: UserField,
    request: &UpdateFieldRequest,
    current: &User,
) -> Result<String, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("updation value cannot be empty".into()));
    }

    match field {
        UserField::Email => {
            let email = content.to_lowercase();
            if !validator::validate_email(&email) {
                return Err(AppError::BadRequest(format!("{} is a invalid email", content)));
            }
            Ok(email)
        }
        UserField::Name => {
            if content.chars().count() > 50 || !NAME_REGEX.is_match(content) {
                return Err(AppError::BadRequest(format!("{} is a invalid name", content)));
            }
            Ok(content.to_string())
        }
        UserField::Password => {
            let mismatch =
                || AppError::BadRequest("password does not match with current password".into());
            let existing = request
                .password
                .as_deref()
                .map(str::trim)
                .ok_or_else(mismatch)?;
            ensure_password(existing, &current.password_hash, mismatch())?;
            if content.len() < 6 {
                return Err(AppError::BadRequest(
                    "password must be at least 6 characters".into(),
                ));
            }
            hash_password(content)
        }
    }
}

/// Changes one profile field. The session ends afterwards: the stored refresh token and
/// both cookies are cleared.
#[patch("/{field}")]
pub async fn update_field(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    field: web::Path<String>,
    body: web::Json<UpdateFieldRequest>,
) -> Result<HttpResponse, AppError> {
    let field: UserField = field.parse()?;
    let current = find_user(&pool, user.id()).await?;
    let value = prepared_value(field, &body, &current)?;

    if field == UserField::Email && value != current.email && email_taken(&pool, &value).await? {
        return Err(AppError::BadRequest(format!(
            "user with {} email Already Exists",
            value
        )));
    }

    let column = match field {
        UserField::Email => "email",
        UserField::Name => "name",
        UserField::Password => "password_hash",
    };
    sqlx::query(&format!(
        "UPDATE users SET {} = $1, refresh_token = NULL, updated_at = NOW() WHERE id = $2",
        column
    ))
    .bind(&value)
    .bind(current.id)
    .execute(&**pool)
    .await
    .map_err(|e| {
        email_conflict(
            e,
            &value,
            format!("user with {} email Already Exists", value),
        )
    })?;

    let response = ApiResponse::ok(json!({}), format!("{} updated successfully", field.as_str()));
    let mut builder = response.builder();
    for cookie in cleared_cookies(config.production) {
        builder.cookie(cookie);
    }
    Ok(builder.json(response))
}
