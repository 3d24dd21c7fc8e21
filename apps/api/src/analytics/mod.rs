//! Dashboard statistics — a read-side projection over one user's records.
//! No invariants beyond "counts sum to total" and "buckets ascend".

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::AppError;
use crate::jobs::handlers::UserIdQuery;
use crate::lifecycle::Status;
use crate::state::AppState;

/// How many trailing calendar months the dashboard chart shows.
const MONTHLY_BUCKET_LIMIT: usize = 6;

/// Count of applications created in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

/// Per-status counts (zero-filled, wire-cased keys) plus the monthly chart
/// series.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    #[serde(rename = "Applied")]
    pub applied: i64,
    #[serde(rename = "Interview")]
    pub interview: i64,
    #[serde(rename = "Offer")]
    pub offer: i64,
    #[serde(rename = "Rejected")]
    pub rejected: i64,
    #[serde(rename = "Ghosted")]
    pub ghosted: i64,
    pub monthly: Vec<MonthBucket>,
}

/// GET /api/v1/analytics/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DashboardStats>, AppError> {
    let counts = state.jobs.status_counts(params.user_id).await?;
    let monthly = state.jobs.monthly_buckets(params.user_id).await?;
    Ok(Json(build_dashboard_stats(&counts, monthly)))
}

/// Zero-fills the five statuses from sparse per-status counts. Labels
/// outside the closed set cannot be written by this service and are ignored.
pub fn build_dashboard_stats(counts: &[(String, i64)], monthly: Vec<MonthBucket>) -> DashboardStats {
    let mut stats = DashboardStats {
        total: 0,
        applied: 0,
        interview: 0,
        offer: 0,
        rejected: 0,
        ghosted: 0,
        monthly,
    };
    for (label, count) in counts {
        let slot = match Status::parse(label) {
            Some(Status::Applied) => &mut stats.applied,
            Some(Status::Interview) => &mut stats.interview,
            Some(Status::Offer) => &mut stats.offer,
            Some(Status::Rejected) => &mut stats.rejected,
            Some(Status::Ghosted) => &mut stats.ghosted,
            None => continue,
        };
        *slot += count;
        stats.total += count;
    }
    stats
}

/// Groups timestamps into (year, month) buckets and keeps only the latest
/// six, reported oldest-first.
pub fn bucket_by_month(dates: impl IntoIterator<Item = DateTime<Utc>>) -> Vec<MonthBucket> {
    let mut buckets: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for date in dates {
        *buckets.entry((date.year(), date.month())).or_insert(0) += 1;
    }
    let skip = buckets.len().saturating_sub(MONTHLY_BUCKET_LIMIT);
    buckets
        .into_iter()
        .skip(skip)
        .map(|((year, month), count)| MonthBucket { year, month, count })
        .collect()
}
