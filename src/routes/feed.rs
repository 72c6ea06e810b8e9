use crate::{
    auth::AuthenticatedUser,
    config::Config,
    dashboard::Dashboard,
    error::AppError,
    response::ApiResponse,
    timeline::DateWindow,
};
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

/// Optional `?timeline=` query parameter, shared with the task write endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub timeline: Option<String>,
}

impl TimelineQuery {
    /// Resolves the window if a timeline was given.
    pub fn window(&self, config: &Config) -> Result<Option<DateWindow>, AppError> {
        self.timeline
            .as_deref()
            .map(|timeline| DateWindow::resolve_named(timeline, &config.now()))
            .transpose()
    }
}

async fn dashboard(
    pool: &PgPool,
    config: &Config,
    user: AuthenticatedUser,
    timeline: &str,
) -> Result<HttpResponse, AppError> {
    let window = DateWindow::resolve_named(timeline, &config.now())?;
    let tasks = Dashboard::new(pool).tasks(user.id(), &window).await?;

    Ok(ApiResponse::ok(tasks, "homepage retrieved sucessfully").into_response())
}

/// Windowed task list, `GET /feed?timeline=today|week|month`.
///
/// ## Responses:
/// - `200 OK`: tasks due in the window plus every unscheduled task, each with its
///   checklist and the name of whoever assigned it.
/// - `400 Bad Request`: missing or unknown timeline.
#[get("")]
pub async fn dashboard_by_query(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    query: web::Query<TimelineQuery>,
) -> Result<HttpResponse, AppError> {
    let timeline = query
        .timeline
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("timeline param is required".into()))?;
    dashboard(&pool, &config, user, timeline).await
}

/// Same as [`dashboard_by_query`], with the timeline in the path.
#[get("/dashboard-tasks/{timeline}")]
pub async fn dashboard_by_path(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    timeline: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    dashboard(&pool, &config, user, &timeline).await
}

/// Category, priority and due-date distribution of the caller's tasks.
#[get("/tasks-analysis")]
pub async fn tasks_analysis(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let analysis = Dashboard::new(&pool).analysis(user.id()).await?;
    Ok(ApiResponse::ok(analysis, "analysis retrieved sucessfully").into_response())
}
