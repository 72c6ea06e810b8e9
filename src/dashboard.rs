//! Dashboard feed and task analysis.
//!
//! Both views start from the caller's membership rows. The feed composes a handful of
//! id-set queries (memberships, then tasks, then checklist items and assigner names in
//! parallel) and reshapes them in-process into a flat list; the analysis counts the
//! distinct member tasks by category, by priority and by whether they are scheduled.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::checklist::CHECKLIST_COLUMNS;
use crate::models::member::MEMBER_COLUMNS;
use crate::models::task::TASK_COLUMNS;
use crate::models::{ChecklistItem, Membership, Task, TaskCategory, TaskPriority};
use crate::timeline::DateWindow;

/// A task as shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTask {
    #[serde(flatten)]
    pub task: Task,
    pub checklist: Vec<ChecklistItem>,
    /// Display name of whoever assigned the task to the caller.
    pub assigned_by: Option<String>,
}

/// Distribution of a user's tasks. Labels without tasks are left out of the maps.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalysis {
    pub category: BTreeMap<TaskCategory, u64>,
    pub priority: BTreeMap<TaskPriority, u64>,
    /// Number of tasks that have a due date.
    pub due_date: u64,
}

impl TaskAnalysis {
    /// Counts each distinct task once, whatever the number of times it appears.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut seen = HashSet::new();
        let mut analysis = TaskAnalysis::default();

        for task in tasks.into_iter().filter(|task| seen.insert(task.id)) {
            *analysis.category.entry(task.category).or_insert(0) += 1;
            *analysis.priority.entry(task.priority).or_insert(0) += 1;
            if task.due_date.is_some() {
                analysis.due_date += 1;
            }
        }

        analysis
    }
}

/// Pairs each membership with its task, in membership order, keeping only tasks the
/// window admits. The pair carries who assigned the task.
pub fn select_in_window(
    memberships: &[Membership],
    tasks: Vec<Task>,
    window: &DateWindow,
) -> Vec<(Task, Option<Uuid>)> {
    let mut by_id: HashMap<Uuid, Task> = tasks.into_iter().map(|task| (task.id, task)).collect();

    memberships
        .iter()
        .filter_map(|membership| {
            by_id
                .remove(&membership.task_id)
                .map(|task| (task, membership.assigned_by))
        })
        .filter(|(task, _)| window.admits(task.due_date.as_ref()))
        .collect()
}

/// Attaches checklist items and assigner names to the selected tasks.
pub fn attach_details(
    selected: Vec<(Task, Option<Uuid>)>,
    checklist: Vec<ChecklistItem>,
    assigners: &HashMap<Uuid, String>,
) -> Vec<DashboardTask> {
    let mut items_by_task: HashMap<Uuid, Vec<ChecklistItem>> = HashMap::new();
    for item in checklist {
        items_by_task.entry(item.task_id).or_default().push(item);
    }

    selected
        .into_iter()
        .map(|(task, assigned_by)| DashboardTask {
            checklist: items_by_task.remove(&task.id).unwrap_or_default(),
            assigned_by: assigned_by.and_then(|id| assigners.get(&id).cloned()),
            task,
        })
        .collect()
}

/// Read-only queries behind the feed endpoints.
pub struct Dashboard<'a> {
    pool: &'a PgPool,
}

impl<'a> Dashboard<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The caller's tasks that are due inside `window`, plus every unscheduled one.
    pub async fn tasks(
        &self,
        user_id: Uuid,
        window: &DateWindow,
    ) -> Result<Vec<DashboardTask>, AppError> {
        let memberships = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {} FROM members WHERE user_id = $1 ORDER BY created_at, id",
            MEMBER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let task_ids: Vec<Uuid> = memberships.iter().map(|m| m.task_id).collect();
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = ANY($1)",
            TASK_COLUMNS
        ))
        .bind(&task_ids)
        .fetch_all(self.pool)
        .await?;

        let selected = select_in_window(&memberships, tasks, window);
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let kept_ids: Vec<Uuid> = selected.iter().map(|(task, _)| task.id).collect();
        let assigner_ids: Vec<Uuid> = selected
            .iter()
            .filter_map(|(_, assigned_by)| *assigned_by)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let checklist_sql = format!(
            "SELECT {} FROM checklist_items WHERE task_id = ANY($1) ORDER BY created_at, id",
            CHECKLIST_COLUMNS
        );
        let checklist_query = sqlx::query_as::<_, ChecklistItem>(&checklist_sql)
            .bind(&kept_ids)
            .fetch_all(self.pool);
        let assigners_query =
            sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM users WHERE id = ANY($1)")
                .bind(&assigner_ids)
                .fetch_all(self.pool);

        let (checklist, assigners) = futures::try_join!(checklist_query, assigners_query)?;
        let assigners: HashMap<Uuid, String> = assigners.into_iter().collect();

        log::debug!(
            "dashboard for {}: {} of {} member tasks in window",
            user_id,
            selected.len(),
            memberships.len()
        );

        Ok(attach_details(selected, checklist, &assigners))
    }

    /// Category, priority and scheduled counts over the caller's distinct tasks.
    pub async fn analysis(&self, user_id: Uuid) -> Result<TaskAnalysis, AppError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT DISTINCT t.id, t.title, t.priority, t.category, t.due_date, t.created_by, \
             t.created_at, t.updated_at \
             FROM tasks t JOIN members m ON m.task_id = t.id \
             WHERE m.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(TaskAnalysis::from_tasks(&tasks))
    }
}
