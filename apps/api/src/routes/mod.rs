pub mod health;

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::analytics;
use crate::contacts;
use crate::jobs::handlers as jobs;
use crate::resumes;
use crate::state::AppState;
use crate::tasks;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job applications — list/create plus per-record CRUD; PUT runs the
        // status transition engine.
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Resume version metadata
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route("/api/v1/resumes/:id", delete(resumes::handle_delete_resume))
        // Contacts
        .route(
            "/api/v1/contacts",
            get(contacts::handle_list_contacts).post(contacts::handle_create_contact),
        )
        .route(
            "/api/v1/contacts/:id",
            delete(contacts::handle_delete_contact),
        )
        // Follow-up tasks
        .route(
            "/api/v1/tasks",
            get(tasks::handle_list_tasks).post(tasks::handle_create_task),
        )
        .route(
            "/api/v1/tasks/:id",
            put(tasks::handle_update_task).delete(tasks::handle_delete_task),
        )
        // Dashboard stats
        .route(
            "/api/v1/analytics/dashboard",
            get(analytics::handle_dashboard),
        )
        .with_state(state)
}
