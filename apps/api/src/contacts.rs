//! Recruiter and referral contacts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::handlers::UserIdQuery;
use crate::models::contact::ContactRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateContactRequest {
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub linkedin: Option<String>,
}

/// GET /api/v1/contacts
pub async fn handle_list_contacts(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ContactRow>>, AppError> {
    let contacts = sqlx::query_as::<_, ContactRow>(
        "SELECT * FROM contacts WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(contacts))
}

/// POST /api/v1/contacts
pub async fn handle_create_contact(
    State(state): State<AppState>,
    Json(req): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactRow>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    let contact = sqlx::query_as::<_, ContactRow>(
        r#"
        INSERT INTO contacts (id, user_id, name, email, phone, role, company, linkedin, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.user_id)
    .bind(name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.role)
    .bind(&req.company)
    .bind(&req.linkedin)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// DELETE /api/v1/contacts/:id
pub async fn handle_delete_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(params.user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Contact {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
