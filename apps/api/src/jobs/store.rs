//! Job-application persistence.
//!
//! `JobStore` is the seam between the transition engine and the database:
//! the engine only ever sees `find` + `update_guarded`, so its retry and
//! idempotence behavior is testable against an in-memory implementation.
//! Every method is scoped by `user_id`; a record owned by someone else is
//! indistinguishable from a missing one.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::analytics::MonthBucket;
use crate::errors::AppError;
use crate::lifecycle::{HistoryEntry, Status};
use crate::models::job::JobRow;

/// Mutable fields of a job application. `None` leaves the column unchanged.
///
/// `status` and `append_history` are set together by the engine when a real
/// transition was planned; a no-op status request sets neither, so history
/// can never grow without the status actually changing.
#[derive(Debug, Default, Clone)]
pub struct JobPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub resume_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub column_order: Option<i32>,
    pub status: Option<Status>,
    pub append_history: Option<HistoryEntry>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<JobRow>, AppError>;

    /// All of one user's records, board order: `column_order` ascending,
    /// newest first within a column.
    async fn list(&self, user_id: Uuid) -> Result<Vec<JobRow>, AppError>;

    async fn create(&self, job: JobRow) -> Result<JobRow, AppError>;

    /// Applies `patch` only if the record's status still equals
    /// `expected_status` — the optimistic-concurrency guard. Returns `None`
    /// when the predicate misses (record gone, not owned, or a concurrent
    /// writer moved the status first); the caller re-reads and retries.
    /// The history append and the status set happen in one statement, so the
    /// stored record always reflects a serializable ordering of writers.
    async fn update_guarded(
        &self,
        id: Uuid,
        user_id: Uuid,
        expected_status: Status,
        patch: JobPatch,
    ) -> Result<Option<JobRow>, AppError>;

    /// Returns whether a record was actually deleted.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Per-status record counts. Statuses with no records are absent here;
    /// zero-filling happens in `analytics`.
    async fn status_counts(&self, user_id: Uuid) -> Result<Vec<(String, i64)>, AppError>;

    /// Records-created-per-month buckets: at most the latest 6 calendar
    /// months of `date_applied`, ascending by (year, month).
    async fn monthly_buckets(&self, user_id: Uuid) -> Result<Vec<MonthBucket>, AppError>;
}

/// Production implementation over PostgreSQL.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_applications WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM job_applications
            WHERE user_id = $1
            ORDER BY column_order ASC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create(&self, job: JobRow) -> Result<JobRow, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO job_applications
                (id, user_id, title, company, location, job_url, salary, status,
                 date_applied, description, notes, resume_id, contact_id,
                 history, column_order, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(job.user_id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.job_url)
        .bind(&job.salary)
        .bind(&job.status)
        .bind(job.date_applied)
        .bind(&job.description)
        .bind(&job.notes)
        .bind(job.resume_id)
        .bind(job.contact_id)
        .bind(&job.history)
        .bind(job.column_order)
        .bind(job.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_guarded(
        &self,
        id: Uuid,
        user_id: Uuid,
        expected_status: Status,
        patch: JobPatch,
    ) -> Result<Option<JobRow>, AppError> {
        // The status predicate in WHERE is the compare-and-swap: a writer
        // that read a stale status updates zero rows instead of clobbering
        // the other writer's history append.
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE job_applications
            SET title        = COALESCE($4, title),
                company      = COALESCE($5, company),
                location     = COALESCE($6, location),
                job_url      = COALESCE($7, job_url),
                salary       = COALESCE($8, salary),
                description  = COALESCE($9, description),
                notes        = COALESCE($10, notes),
                resume_id    = COALESCE($11, resume_id),
                contact_id   = COALESCE($12, contact_id),
                column_order = COALESCE($13, column_order),
                status       = COALESCE($14, status),
                history      = CASE WHEN $15::jsonb IS NULL
                                    THEN history
                                    ELSE history || $15::jsonb
                               END
            WHERE id = $1 AND user_id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(expected_status.as_str())
        .bind(&patch.title)
        .bind(&patch.company)
        .bind(&patch.location)
        .bind(&patch.job_url)
        .bind(&patch.salary)
        .bind(&patch.description)
        .bind(&patch.notes)
        .bind(patch.resume_id)
        .bind(patch.contact_id)
        .bind(patch.column_order)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.append_history.map(Json))
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM job_applications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn status_counts(&self, user_id: Uuid) -> Result<Vec<(String, i64)>, AppError> {
        Ok(sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM job_applications WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn monthly_buckets(&self, user_id: Uuid) -> Result<Vec<MonthBucket>, AppError> {
        // Latest six months first, then re-sorted ascending for the caller.
        let rows = sqlx::query_as::<_, (i32, i32, i64)>(
            r#"
            SELECT year, month, count FROM (
                SELECT date_part('year', date_applied)::int  AS year,
                       date_part('month', date_applied)::int AS month,
                       COUNT(*)                              AS count
                FROM job_applications
                WHERE user_id = $1
                GROUP BY 1, 2
                ORDER BY year DESC, month DESC
                LIMIT 6
            ) latest
            ORDER BY year ASC, month ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(year, month, count)| MonthBucket {
                year,
                month: month as u32,
                count,
            })
            .collect())
    }
}
