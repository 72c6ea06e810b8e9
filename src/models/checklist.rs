use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

pub const CHECKLIST_COLUMNS: &str = "id, task_id, text, is_done, created_at, updated_at";

/// One todo line of a task.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub text: String,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A checklist line as sent by clients. Lines with an `id` refer to an existing item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub text: String,
    #[serde(default)]
    pub is_done: bool,
}

impl ChecklistInput {
    pub(crate) fn trimmed(&self) -> Result<Self, AppError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest(
                "checklist item text cannot be empty".into(),
            ));
        }
        Ok(Self {
            id: self.id,
            text: text.to_string(),
            is_done: self.is_done,
        })
    }
}

/// Body of `PATCH /task/mark`.
#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    /// Id of the checklist item to toggle.
    pub key: Uuid,
}

/// How an update payload's checklist maps onto the stored one.
#[derive(Debug, Default, PartialEq)]
pub struct ChecklistDiff {
    pub insert: Vec<ChecklistInput>,
    pub update: Vec<ChecklistInput>,
    pub delete: Vec<Uuid>,
}

impl ChecklistDiff {
    /// Items with a known `id` are updated, items without one are inserted, stored items
    /// missing from `incoming` are deleted. An `id` that is not part of `existing` is an error.
    pub fn between(existing: &[Uuid], incoming: &[ChecklistInput]) -> Result<Self, AppError> {
        let mut diff = ChecklistDiff::default();

        for item in incoming {
            match item.id {
                Some(id) if existing.contains(&id) => diff.update.push(item.clone()),
                Some(id) => {
                    return Err(AppError::NotFound(format!(
                        "checklist item {} does not belong to this task",
                        id
                    )))
                }
                None => diff.insert.push(item.clone()),
            }
        }

        diff.delete = existing
            .iter()
            .filter(|id| !diff.update.iter().any(|item| item.id == Some(**id)))
            .copied()
            .collect();

        Ok(diff)
    }
}
