use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MEMBER_COLUMNS: &str = "id, user_id, task_id, assigned_by, created_at";

/// Links a user to a task they can see and act on. `(user_id, task_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A member row of the edit view, joined with the member's email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub assigned_by: Option<Uuid>,
    #[sqlx(default)]
    pub can_unassign: bool,
}

impl TaskMember {
    /// A viewer may unassign members they assigned, but never themselves.
    pub fn with_permissions(mut self, viewer: Uuid) -> Self {
        self.can_unassign = self.assigned_by == Some(viewer) && self.user_id != viewer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: Uuid, assigned_by: Option<Uuid>) -> TaskMember {
        TaskMember {
            id: Uuid::new_v4(),
            user_id,
            email: "someone@example.com".to_string(),
            assigned_by,
            can_unassign: false,
        }
    }

    #[test]
    fn test_can_unassign_only_own_assignees() {
        let viewer = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(member(other, Some(viewer)).with_permissions(viewer).can_unassign);
        assert!(!member(other, Some(other)).with_permissions(viewer).can_unassign);
        assert!(!member(viewer, Some(viewer)).with_permissions(viewer).can_unassign);
        assert!(!member(other, None).with_permissions(viewer).can_unassign);
    }
}
