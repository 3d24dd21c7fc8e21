use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::lifecycle::HistoryEntry;

/// A job-application record. `status` holds one of the stable wire strings
/// (validated at every boundary by `lifecycle::Status`); `history` is the
/// append-only transition log, stored as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_url: Option<String>,
    pub salary: Option<String>,
    pub status: String,
    pub date_applied: DateTime<Utc>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub resume_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub history: Json<Vec<HistoryEntry>>,
    pub column_order: i32,
    pub created_at: DateTime<Utc>,
}
