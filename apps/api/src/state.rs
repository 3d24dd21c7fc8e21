use std::sync::Arc;

use sqlx::PgPool;

use crate::jobs::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Job-application persistence seam. Held as `Arc<dyn JobStore>` so the
    /// status transition engine runs against an in-memory store in tests.
    pub jobs: Arc<dyn JobStore>,
}
