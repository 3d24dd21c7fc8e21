use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Accepted values for a task's `priority` column.
pub const PRIORITIES: [&str; 3] = ["High", "Medium", "Low"];

/// A follow-up todo, optionally linked to a job application.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub priority: String,
    pub created_at: DateTime<Utc>,
}
