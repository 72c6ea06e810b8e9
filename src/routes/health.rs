use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;

/// Upper bound on the database probe so a stuck pool cannot stall health checks.
const DB_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check endpoint
///
/// Returns the current status of the API, a timestamp and whether the database answers.
/// The endpoint itself always responds `200 OK`.
#[get("/health")]
pub async fn health(pool: web::Data<PgPool>) -> impl Responder {
    let probe = sqlx::query("SELECT 1").execute(&**pool);
    let database = match tokio::time::timeout(DB_PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => "up",
        Ok(Err(e)) => {
            log::warn!("health check could not reach the database: {}", e);
            "unavailable"
        }
        Err(_) => {
            log::warn!("health check timed out waiting for the database");
            "unavailable"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "database": database
    }))
}
