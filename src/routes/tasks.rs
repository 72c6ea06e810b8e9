use crate::{
    auth::AuthenticatedUser,
    config::Config,
    error::AppError,
    models::{
        checklist::CHECKLIST_COLUMNS, task::membership_roster, task::TASK_COLUMNS,
        CategoryRequest, ChecklistDiff, ChecklistInput, ChecklistItem, CreateTaskRequest,
        MarkRequest, Task, TaskCategory, TaskDetail, TaskMember, UpdateTaskRequest, UserSummary,
    },
    response::ApiResponse,
    routes::feed::TimelineQuery,
    timeline::DateWindow,
};
use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// `?key=` query parameter naming a task.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Uuid,
}

/// The edit view: the task with checklist and members, plus everyone who could be assigned.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEditView {
    pub task: TaskWithMembers,
    pub unassigned_users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskWithMembers {
    #[serde(flatten)]
    pub detail: TaskDetail,
    pub members: Vec<TaskMember>,
}

async fn fetch_task(pool: &PgPool, task_id: Uuid) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("task does not exists".into()))
}

async fn fetch_checklist(pool: &PgPool, task_id: Uuid) -> Result<Vec<ChecklistItem>, AppError> {
    Ok(sqlx::query_as::<_, ChecklistItem>(&format!(
        "SELECT {} FROM checklist_items WHERE task_id = $1 ORDER BY created_at, id",
        CHECKLIST_COLUMNS
    ))
    .bind(task_id)
    .fetch_all(pool)
    .await?)
}

/// Only members of a task may open its edit view or change it.
async fn ensure_member(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let membership: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM members WHERE task_id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    match membership {
        Some(_) => Ok(()),
        None => Err(AppError::Forbidden(
            "task does not belong to the particular user".into(),
        )),
    }
}

/// Rejects assignment of ids that are not registered users.
async fn ensure_users_exist(conn: &mut PgConnection, user_ids: &[Uuid]) -> Result<(), AppError> {
    if user_ids.is_empty() {
        return Ok(());
    }
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(&mut *conn)
        .await?;

    match user_ids
        .iter()
        .find(|id| !found.iter().any(|(found_id,)| found_id == *id))
    {
        Some(missing) => Err(AppError::BadRequest(format!(
            "{} is not a registered user",
            missing
        ))),
        None => Ok(()),
    }
}

async fn insert_checklist_item(
    conn: &mut PgConnection,
    task_id: Uuid,
    line: &ChecklistInput,
) -> Result<ChecklistItem, AppError> {
    Ok(sqlx::query_as::<_, ChecklistItem>(&format!(
        "INSERT INTO checklist_items (id, task_id, text, is_done) VALUES ($1, $2, $3, $4) \
         RETURNING {}",
        CHECKLIST_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(task_id)
    .bind(&line.text)
    .bind(line.is_done)
    .fetch_one(&mut *conn)
    .await?)
}

async fn assign_members(
    conn: &mut PgConnection,
    task_id: Uuid,
    assigned_by: Uuid,
    user_ids: &[Uuid],
) -> Result<(), AppError> {
    for user_id in user_ids {
        sqlx::query(
            "INSERT INTO members (id, user_id, task_id, assigned_by) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, task_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(task_id)
        .bind(assigned_by)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Write responses carry `null` when the caller's timeline would not show the task.
fn visible_in(window: Option<&DateWindow>, detail: TaskDetail) -> Option<TaskDetail> {
    match window {
        Some(window) if !window.admits(detail.task.due_date.as_ref()) => None,
        _ => Some(detail),
    }
}

/// Creates a task with its checklist and memberships.
///
/// The creator is always a member; `members` adds more. Everything is written in one
/// transaction. With `?timeline=`, `data` is `null` when the task falls outside that window.
///
/// ## Responses:
/// - `201 Created`: the task with its checklist (or `null`, see above).
/// - `400 Bad Request`: invalid title, priority, due date, checklist or member id.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    query: web::Query<TimelineQuery>,
    body: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let window = query.window(&config)?;
    let request = body.into_inner();
    let valid = request.task.check(&config.now())?;
    let draft = Task::new(&valid, user.id());
    let roster = membership_roster(user.id(), &request.members);

    let mut tx = pool.begin().await?;
    ensure_users_exist(&mut tx, &roster).await?;

    let task = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, title, priority, category, due_date, created_by, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(draft.id)
    .bind(&draft.title)
    .bind(draft.priority)
    .bind(draft.category)
    .bind(draft.due_date)
    .bind(draft.created_by)
    .bind(draft.created_at)
    .bind(draft.updated_at)
    .fetch_one(&mut *tx)
    .await?;

    let mut checklist = Vec::with_capacity(valid.checklist.len());
    for line in &valid.checklist {
        checklist.push(insert_checklist_item(&mut tx, task.id, line).await?);
    }
    assign_members(&mut tx, task.id, user.id(), &roster).await?;

    tx.commit().await?;
    log::info!(
        "user {} created task {} with {} members",
        user.id(),
        task.id,
        roster.len()
    );

    let data = visible_in(window.as_ref(), TaskDetail { task, checklist });
    Ok(ApiResponse::created(data, "task created succcessfully").into_response())
}

/// Task with its checklist, `GET /task?key=`.
///
/// Read-only and public: the task id works as a share link, no session needed.
#[get("")]
pub async fn get_task_for_view(
    pool: web::Data<PgPool>,
    query: web::Query<KeyQuery>,
) -> Result<HttpResponse, AppError> {
    let task = fetch_task(&pool, query.key).await?;
    let checklist = fetch_checklist(&pool, task.id).await?;

    Ok(ApiResponse::ok(TaskDetail { task, checklist }, "task retreived successfully").into_response())
}

/// Task with checklist, members and the users that could still be assigned, `GET /task/edit?key=`.
#[get("/edit")]
pub async fn get_task_for_edit(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    query: web::Query<KeyQuery>,
) -> Result<HttpResponse, AppError> {
    let task = fetch_task(&pool, query.key).await?;
    ensure_member(&pool, task.id, user.id()).await?;

    let members_query = sqlx::query_as::<_, TaskMember>(
        "SELECT m.id, m.user_id, u.email, m.assigned_by \
         FROM members m JOIN users u ON u.id = m.user_id \
         WHERE m.task_id = $1 ORDER BY m.created_at, m.id",
    )
    .bind(task.id)
    .fetch_all(&**pool);
    let (checklist, members) = futures::try_join!(fetch_checklist(&pool, task.id), async {
        members_query.await.map_err(AppError::from)
    })?;

    let members: Vec<TaskMember> = members
        .into_iter()
        .map(|member| member.with_permissions(user.id()))
        .collect();

    let mut excluded: Vec<Uuid> = members.iter().map(|member| member.user_id).collect();
    excluded.push(user.id());
    let unassigned_users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, email FROM users WHERE id <> ALL($1) ORDER BY email",
    )
    .bind(&excluded)
    .fetch_all(&**pool)
    .await?;

    let view = TaskEditView {
        task: TaskWithMembers {
            detail: TaskDetail { task, checklist },
            members,
        },
        unassigned_users,
    };
    Ok(ApiResponse::ok(view, "task retreived successfully").into_response())
}

/// Toggles a checklist item's `isDone`, `PATCH /task/mark`.
#[patch("/mark")]
pub async fn mark_checklist_item(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    body: web::Json<MarkRequest>,
) -> Result<HttpResponse, AppError> {
    let task_id: Uuid = sqlx::query_as::<_, (Uuid,)>(
        "SELECT task_id FROM checklist_items WHERE id = $1",
    )
    .bind(body.key)
    .fetch_optional(&**pool)
    .await?
    .map(|(task_id,)| task_id)
    .ok_or_else(|| AppError::NotFound("checklist item does not exists".into()))?;
    ensure_member(&pool, task_id, user.id()).await?;

    let item = sqlx::query_as::<_, ChecklistItem>(&format!(
        "UPDATE checklist_items SET is_done = NOT is_done, updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        CHECKLIST_COLUMNS
    ))
    .bind(body.key)
    .fetch_one(&**pool)
    .await?;

    Ok(ApiResponse::ok(item, "checklist item updated successfully").into_response())
}

/// Kanban move, `PATCH /task/category/{key}`.
#[patch("/category/{key}")]
pub async fn update_category(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    key: web::Path<Uuid>,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let category: TaskCategory = body.category.parse()?;
    let task = fetch_task(&pool, key.into_inner()).await?;
    ensure_member(&pool, task.id, user.id()).await?;

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET category = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(category)
    .bind(task.id)
    .fetch_one(&**pool)
    .await?;

    Ok(ApiResponse::ok(task, "task category updated successfully").into_response())
}

/// Updates a task, its checklist and its members, `PATCH /task/{key}`.
///
/// Checklist lines with an `id` are updated, lines without one are created and stored
/// lines that are not sent are deleted. `assign` adds members, `unassign` removes them
/// (the owner cannot be removed). All changes are applied in one transaction.
#[patch("/{key}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUser,
    key: web::Path<Uuid>,
    query: web::Query<TimelineQuery>,
    body: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let window = query.window(&config)?;
    let request = body.into_inner();
    let valid = request.task.check(&config.now())?;
    let task = fetch_task(&pool, key.into_inner()).await?;
    ensure_member(&pool, task.id, user.id()).await?;

    let mut tx = pool.begin().await?;

    let existing: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM checklist_items WHERE task_id = $1")
        .bind(task.id)
        .fetch_all(&mut *tx)
        .await?;
    let existing: Vec<Uuid> = existing.into_iter().map(|(id,)| id).collect();
    let diff = ChecklistDiff::between(&existing, &valid.checklist)?;

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET title = $1, priority = $2, due_date = $3, updated_at = NOW() \
         WHERE id = $4 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(&valid.title)
    .bind(valid.priority)
    .bind(valid.due_date)
    .bind(task.id)
    .fetch_one(&mut *tx)
    .await?;

    for line in &diff.update {
        sqlx::query(
            "UPDATE checklist_items SET text = $1, is_done = $2, updated_at = NOW() \
             WHERE id = $3 AND task_id = $4",
        )
        .bind(&line.text)
        .bind(line.is_done)
        .bind(line.id)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    }
    for line in &diff.insert {
        insert_checklist_item(&mut tx, task.id, line).await?;
    }
    if !diff.delete.is_empty() {
        sqlx::query("DELETE FROM checklist_items WHERE id = ANY($1)")
            .bind(&diff.delete)
            .execute(&mut *tx)
            .await?;
    }

    ensure_users_exist(&mut tx, &request.assign).await?;
    assign_members(&mut tx, task.id, user.id(), &request.assign).await?;
    if !request.unassign.is_empty() {
        sqlx::query("DELETE FROM members WHERE task_id = $1 AND user_id = ANY($2) AND user_id <> $3")
            .bind(task.id)
            .bind(&request.unassign)
            .bind(task.created_by)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let checklist = fetch_checklist(&pool, task.id).await?;
    let data = visible_in(window.as_ref(), TaskDetail { task, checklist });
    Ok(ApiResponse::ok(data, "task updated sucessfully").into_response())
}

/// Deletes a task with its checklist and memberships. Only the owner may do this.
///
/// ## Responses:
/// - `200 OK`: deleted.
/// - `403 Forbidden`: the caller does not own the task.
/// - `404 Not Found`: no such task.
#[delete("/{key}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    key: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let task = fetch_task(&pool, key.into_inner()).await?;
    if task.created_by != user.id() {
        return Err(AppError::Forbidden(
            "task does not belong to the particular user".into(),
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM checklist_items WHERE task_id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM members WHERE task_id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log::info!("user {} deleted task {}", user.id(), task.id);
    Ok(ApiResponse::ok(json!({}), "task deleted successfully").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskCategory, TaskPriority};
    use chrono::{TimeZone, Utc};

    fn detail(due: Option<chrono::DateTime<Utc>>) -> TaskDetail {
        TaskDetail {
            task: Task {
                id: Uuid::new_v4(),
                title: "Write report".to_string(),
                priority: TaskPriority::Moderate,
                category: TaskCategory::Todo,
                due_date: due,
                created_by: Uuid::new_v4(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            checklist: Vec::new(),
        }
    }

    #[actix_rt::test]
    async fn test_view_needs_no_session_but_edit_does() {
        use crate::auth::AuthMiddleware;
        use actix_web::test::{call_service, init_service, try_call_service, TestRequest};
        use actix_web::App;
        use sqlx::postgres::PgPoolOptions;

        // Both requests stop before any query, so the pool never connects.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        let app = init_service(
            App::new().app_data(web::Data::new(pool)).service(
                web::scope("/api/v1").wrap(AuthMiddleware).service(
                    web::scope("/task")
                        .service(get_task_for_view)
                        .service(get_task_for_edit),
                ),
            ),
        )
        .await;

        // Past the middleware: the malformed key is the only complaint.
        let req = TestRequest::get()
            .uri("/api/v1/task?key=not-a-uuid")
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = TestRequest::get()
            .uri(&format!("/api/v1/task/edit?key={}", Uuid::new_v4()))
            .to_request();
        let status = match try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.error_response().status(),
        };
        assert_eq!(status, 401);
    }

    #[test]
    fn test_write_response_is_nulled_outside_timeline() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let today = DateWindow::resolve(crate::timeline::Timeline::Today, &reference);
        let tomorrow = Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap();

        assert!(visible_in(Some(&today), detail(Some(tomorrow))).is_none());
        assert!(visible_in(Some(&today), detail(Some(today.start))).is_some());
        assert!(visible_in(Some(&today), detail(None)).is_some());
        assert!(visible_in(None, detail(Some(tomorrow))).is_some());
    }
}
