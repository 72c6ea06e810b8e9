use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::checklist::{ChecklistInput, ChecklistItem};
use crate::timeline::parse_upcoming_due_date;

/// Columns selected whenever a full `Task` row is read.
pub const TASK_COLUMNS: &str =
    "id, title, priority, category, due_date, created_by, created_at, updated_at";

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Moderate,
    High,
}

/// Kanban stage of a task.
/// Corresponds to the `task_category` SQL enum.
#[derive(
    Debug,
    Default,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    sqlx::Type,
)]
#[sqlx(type_name = "task_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Backlog,
    #[default]
    Todo,
    Progress,
    Done,
}

impl FromStr for TaskPriority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "low" => Ok(TaskPriority::Low),
            "moderate" => Ok(TaskPriority::Moderate),
            "high" => Ok(TaskPriority::High),
            other => Err(AppError::BadRequest(format!(
                "{} is a invalid priority type",
                other
            ))),
        }
    }
}

impl FromStr for TaskCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "backlog" => Ok(TaskCategory::Backlog),
            "todo" => Ok(TaskCategory::Todo),
            "progress" => Ok(TaskCategory::Progress),
            "done" => Ok(TaskCategory::Done),
            other => Err(AppError::BadRequest(format!(
                "{} is a invalid category type",
                other
            ))),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            TaskPriority::Low => "low",
            TaskPriority::Moderate => "moderate",
            TaskPriority::High => "high",
        })
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            TaskCategory::Backlog => "backlog",
            TaskCategory::Todo => "todo",
            TaskCategory::Progress => "progress",
            TaskCategory::Done => "done",
        })
    }
}

/// Fields shared by the create and update payloads.
///
/// Priority and due date arrive as strings so that bad values produce the same
/// `400` envelope as every other input error instead of a JSON decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[validate(length(max = 200))]
    pub title: String,
    pub priority: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistInput>,
}

/// Body of `POST /task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(flatten)]
    pub task: TaskInput,
    /// Users to assign besides the creator.
    #[serde(default)]
    pub members: Vec<Uuid>,
}

/// Body of `PATCH /task/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(flatten)]
    pub task: TaskInput,
    #[serde(default)]
    pub assign: Vec<Uuid>,
    #[serde(default)]
    pub unassign: Vec<Uuid>,
}

/// Body of `PATCH /task/category/{key}`.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: String,
}

/// A `TaskInput` that passed every check, with parsed enums and a normalized due date.
#[derive(Debug, Clone)]
pub struct ValidTask {
    pub title: String,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub checklist: Vec<ChecklistInput>,
}

impl TaskInput {
    /// Checks the payload against the business rules. `now` decides which due dates are in
    /// the past and which local calendar day a timestamp falls on.
    pub fn check(&self, now: &DateTime<FixedOffset>) -> Result<ValidTask, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("task should contain a title".into()));
        }

        let due_date = match self.due_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_upcoming_due_date(raw, now)?),
            _ => None,
        };

        let priority: TaskPriority = self.priority.parse()?;

        if self.checklist.is_empty() {
            return Err(AppError::BadRequest(
                "task should contain atleast one todo".into(),
            ));
        }
        let checklist = self
            .checklist
            .iter()
            .map(ChecklistInput::trimmed)
            .collect::<Result<Vec<_>, _>>()?;

        self.validate()?;

        Ok(ValidTask {
            title: title.to_string(),
            priority,
            due_date,
            checklist,
        })
    }
}

/// Represents a task as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    /// Midnight of the due date, see `timeline::normalize_due_date`.
    pub due_date: Option<DateTime<Utc>>,
    /// Owner; the only user allowed to delete the task.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new task in the default category, owned by `owner`.
    pub fn new(input: &ValidTask, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            priority: input.priority,
            category: TaskCategory::default(),
            due_date: input.due_date,
            created_by: owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A task together with its checklist, as returned by the task endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub checklist: Vec<ChecklistItem>,
}

/// Creator first, then the requested members in order, each at most once.
pub fn membership_roster(owner: Uuid, members: &[Uuid]) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    std::iter::once(owner)
        .chain(members.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect()
}
