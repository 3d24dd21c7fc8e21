//! Follow-up tasks, optionally linked to a job application. Plain CRUD —
//! editing a task never touches the linked job's status history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::handlers::UserIdQuery;
use crate::models::task::{TaskRow, PRIORITIES};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
    pub priority: Option<String>,
}

fn validate_priority(raw: &str) -> Result<(), AppError> {
    if PRIORITIES.contains(&raw) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{raw}' is not a valid priority"
        )))
    }
}

/// GET /api/v1/tasks
pub async fn handle_list_tasks(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<TaskRow>>, AppError> {
    let tasks = sqlx::query_as::<_, TaskRow>(
        "SELECT * FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(tasks))
}

/// POST /api/v1/tasks
pub async fn handle_create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskRow>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    let priority = req.priority.unwrap_or_else(|| "Medium".to_string());
    validate_priority(&priority)?;

    let task = sqlx::query_as::<_, TaskRow>(
        r#"
        INSERT INTO tasks (id, user_id, job_id, title, due_date, is_completed, priority, created_at)
        VALUES ($1, $2, $3, $4, $5, false, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.user_id)
    .bind(req.job_id)
    .bind(title)
    .bind(req.due_date)
    .bind(&priority)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/v1/tasks/:id
pub async fn handle_update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRow>, AppError> {
    if let Some(priority) = req.priority.as_deref() {
        validate_priority(priority)?;
    }

    let task = sqlx::query_as::<_, TaskRow>(
        r#"
        UPDATE tasks
        SET title        = COALESCE($3, title),
            due_date     = COALESCE($4, due_date),
            is_completed = COALESCE($5, is_completed),
            priority     = COALESCE($6, priority)
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.user_id)
    .bind(&req.title)
    .bind(req.due_date)
    .bind(req.is_completed)
    .bind(&req.priority)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Task {id} not found")))?;
    Ok(Json(task))
}

/// DELETE /api/v1/tasks/:id
pub async fn handle_delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(params.user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Task {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
