pub mod feed;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{error, web};

use crate::error::AppError;

/// Registers the `/user`, `/feed` and `/task` scopes along with extractor settings that
/// turn malformed bodies, queries and paths into the usual `400` error envelope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(16 * 1024)
            .error_handler(|err, _req| {
                let message = match &err {
                    error::JsonPayloadError::OverflowKnownLength { .. }
                    | error::JsonPayloadError::Overflow { .. } => "payload too large".to_string(),
                    other => other.to_string(),
                };
                AppError::BadRequest(message).into()
            }),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/user")
            .service(users::register)
            .service(users::get_user)
            .service(users::login)
            .service(users::logout)
            .service(users::list_users)
            .service(users::add_to_dashboard)
            .service(users::update_field),
    )
    .service(
        web::scope("/feed")
            .service(feed::dashboard_by_query)
            .service(feed::dashboard_by_path)
            .service(feed::tasks_analysis),
    )
    .service(
        web::scope("/task")
            .service(tasks::create_task)
            .service(tasks::get_task_for_view)
            .service(tasks::get_task_for_edit)
            .service(tasks::mark_checklist_item)
            .service(tasks::update_category)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}
