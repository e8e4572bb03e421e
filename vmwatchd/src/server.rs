use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::error;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::collectors::GpuCapability;
use crate::metrics::Metrics;
use crate::store::MetricsStore;

/// Shared handler state: the store for queries, the metrics handle and
/// GPU capability for introspection.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetricsStore>,
    pub metrics: Arc<Metrics>,
    pub gpu: GpuCapability,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/usage", get(get_usage))
        .route("/purge", post(post_purge))
        .route("/healthz", get(healthz))
        .route("/status", get(get_status))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UsageParams {
    start: Option<String>,
    end: Option<String>,
}

/// `GET /usage?start=YYYY-MM-DD&end=YYYY-MM-DD`: flushed windows in the
/// date range, ordered by flush time. The start date is widened to
/// midnight and the end date to the last second of its day.
async fn get_usage(
    State(state): State<AppState>,
    Query(params): Query<UsageParams>,
) -> (StatusCode, Json<Value>) {
    let (Some(start_raw), Some(end_raw)) = (params.start, params.end) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "start and end dates are required"})),
        );
    };

    let (Some(start), Some(end)) = (day_start(&start_raw), day_end(&end_raw)) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid date format, use ISO format (YYYY-MM-DD)"})),
        );
    };

    match state.store.range(start, end).await {
        Ok(windows) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "count": windows.len(),
                "data": windows,
            })),
        ),
        Err(err) => {
            error!("[api] usage query failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("database error: {err}")})),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct PurgeParams {
    days: Option<String>,
}

/// `POST /purge?days=N`: drop windows flushed more than N days ago.
async fn post_purge(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
) -> (StatusCode, Json<Value>) {
    let Some(days_raw) = params.days else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "days parameter is required"})),
        );
    };
    let Ok(days) = days_raw.parse::<i64>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid days parameter, must be an integer"})),
        );
    };
    if days < 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "days parameter must not be negative"})),
        );
    }

    let cutoff = Utc::now() - Duration::days(days);
    match state.store.purge_older_than(cutoff).await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(json!({"status": "success", "deleted_count": deleted})),
        ),
        Err(err) => {
            error!("[api] purge failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("database error: {err}")})),
            )
        }
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Daemon introspection, fed entirely from the shared metrics handle.
async fn get_status(State(state): State<AppState>) -> Json<Value> {
    let windows_stored = state.store.count().await.unwrap_or(0);
    Json(json!({
        "uptime_s": state.metrics.uptime_secs(),
        "gpu": state.gpu,
        "ticks_total": state.metrics.ticks_total(),
        "sample_failures": state.metrics.sample_failures(),
        "flushes_total": state.metrics.flushes_total(),
        "flush_failures": state.metrics.flush_failures(),
        "shape_mismatches": state.metrics.shape_mismatches(),
        "windows_stored": windows_stored,
    }))
}

fn day_start(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn day_end(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(23, 59, 59)?.and_utc())
}
