use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::engine::{self, JobUpdate, NewJob};
use crate::models::job::JobRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// Reference ids arrive from the board form as `""` when nothing is picked.
/// Normalized to "no reference" here at the boundary, not inside update logic.
fn empty_as_none<'de, D>(de: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub salary: Option<String>,
    pub status: Option<String>,
    pub date_applied: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub resume_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub contact_id: Option<Uuid>,
    pub column_order: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub resume_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub contact_id: Option<Uuid>,
    pub column_order: Option<i32>,
    pub status: Option<String>,
    pub note: Option<String>,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let jobs = state.jobs.list(params.user_id).await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<JobRow>, AppError> {
    let job = state
        .jobs
        .find(id, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let job = engine::create_job(
        state.jobs.as_ref(),
        NewJob {
            user_id: req.user_id,
            title: req.title,
            company: req.company,
            location: req.location,
            job_url: req.job_url,
            salary: req.salary,
            status: req.status,
            date_applied: req.date_applied,
            description: req.description,
            notes: req.notes,
            resume_id: req.resume_id,
            contact_id: req.contact_id,
            column_order: req.column_order,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobRow>, AppError> {
    let job = engine::update_job(
        state.jobs.as_ref(),
        id,
        req.user_id,
        JobUpdate {
            title: req.title,
            company: req.company,
            location: req.location,
            job_url: req.job_url,
            salary: req.salary,
            description: req.description,
            notes: req.notes,
            resume_id: req.resume_id,
            contact_id: req.contact_id,
            column_order: req.column_order,
            status: req.status,
            note: req.note,
        },
    )
    .await?;
    Ok(Json(job))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let deleted = state.jobs.delete(id, params.user_id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
