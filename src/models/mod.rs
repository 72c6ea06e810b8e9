pub mod checklist;
pub mod member;
pub mod task;
pub mod user;

pub use checklist::{ChecklistDiff, ChecklistInput, ChecklistItem, MarkRequest};
pub use member::{Membership, TaskMember};
pub use task::{
    CategoryRequest, CreateTaskRequest, Task, TaskCategory, TaskDetail, TaskInput, TaskPriority,
    UpdateTaskRequest, ValidTask,
};
pub use user::{LoggedInUser, UpdateFieldRequest, User, UserField, UserSummary};
