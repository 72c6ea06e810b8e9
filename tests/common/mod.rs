#![allow(dead_code)]

use actix_web::dev::ServiceResponse;
use actix_web::test;
use chrono::FixedOffset;
use dotenv::dotenv;
use serde_json::{json, Value};
use sqlx::PgPool;
use taskdeck::auth::ACCESS_COOKIE;
use taskdeck::config::Config;
use uuid::Uuid;

/// Every test binary signs tokens with the same secret, so parallel tests agree.
pub const TEST_JWT_SECRET: &str = "integration_test_secret";

/// Connects to `DATABASE_URL` and brings the schema up to date.
pub async fn setup_pool() -> PgPool {
    dotenv().ok();
    std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    std::env::set_var("BCRYPT_COST", "4");
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub fn test_config() -> Config {
    Config::for_offset("postgres://unused", FixedOffset::east_opt(0).unwrap())
}

/// Builds the full application the way `main` does, minus CORS.
macro_rules! test_app {
    ($pool:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .app_data(actix_web::web::Data::new(crate::common::test_config()))
                .wrap(actix_web::middleware::Logger::default())
                .service(taskdeck::routes::health::health)
                .service(
                    actix_web::web::scope("/api/v1")
                        .wrap(taskdeck::auth::AuthMiddleware)
                        .configure(taskdeck::routes::config),
                ),
        )
        .await
    };
}

/// A unique address so parallel runs never collide on the email constraint.
pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, Uuid::new_v4().simple())
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }
}

pub async fn read_json<B: actix_web::body::MessageBody>(resp: ServiceResponse<B>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({}): {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    })
}

/// Registers and logs in a user, returning the access token from the login cookie.
pub async fn register_and_login<S, B>(app: &S, name: &str, email: &str, password: &str) -> TestUser
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    B: actix_web::body::MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/user")
        .set_json(json!({ "name": name, "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201, "registration of {} failed", email);
    let registered = read_json(resp).await;
    let id: Uuid = registered["data"]["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("registered user has an id");

    let req = test::TestRequest::put()
        .uri("/api/v1/user/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 200, "login of {} failed", email);
    let token = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == ACCESS_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .expect("login sets the access cookie");

    TestUser {
        id,
        email: email.to_string(),
        token,
    }
}

/// Users cascade to their tasks, checklists and memberships.
pub async fn cleanup_users(pool: &PgPool, emails: &[&str]) {
    for email in emails {
        let _ = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await;
    }
}
