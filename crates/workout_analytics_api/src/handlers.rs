use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::debug_handler;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use workout_analytics::reports::{ReportCreateRequest, prepare_for_insert};
use workout_analytics::store::{DEFAULT_LIST_LIMIT, ListQuery, MAX_LIST_LIMIT};
use workout_analytics::utils::{latest_range, validate_range};
use workout_analytics::{NormalizedReport, ObjectId, Report, normalize, summarize};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

type Params = Query<HashMap<String, String>>;

pub const DEFAULT_LATEST_DAYS: u32 = 90;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct RebuildLatestResponse {
    pub range: Value,
    pub result: Report,
}

#[derive(Serialize)]
pub struct ReportCreateResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Serialize)]
pub struct ReportListResponse {
    pub items: Vec<NormalizedReport>,
    pub limit: u32,
    pub skip: u32,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub deleted: bool,
    pub id: String,
}

fn required<'a>(params: &'a HashMap<String, String>, key: &str) -> ApiResult<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ApiError::Validation(format!("'{key}' is required")))
}

fn bounded(
    params: &HashMap<String, String>,
    key: &str,
    default: u32,
    min: u32,
    max: u32,
) -> ApiResult<u32> {
    let Some(raw) = params.get(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| ApiError::Validation(format!("'{key}' must be between {min} and {max}")))
}

fn parse_report_id(raw: &str) -> ApiResult<ObjectId> {
    raw.parse()
        .map_err(|_| ApiError::Validation("invalid report id".into()))
}

#[debug_handler]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[debug_handler]
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [("content-type", "text/plain")],
            "metrics recorder not installed".to_string(),
        ),
    }
}

#[debug_handler]
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> ApiResult<Json<Report>> {
    let from = required(&params, "from")?;
    let to = required(&params, "to")?;
    validate_range(from, to)?;

    let rows = state.rows.fetch_rows(from, to).await?;
    Ok(Json(summarize(from, to, &rows)))
}

#[debug_handler]
pub async fn rebuild_latest(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> ApiResult<Json<RebuildLatestResponse>> {
    let days = bounded(
        &params,
        "days",
        DEFAULT_LATEST_DAYS,
        1,
        workout_analytics::utils::MAX_LATEST_DAYS,
    )?;
    let (from, to) = latest_range(Utc::now().date_naive(), days)?;

    let rows = state.rows.fetch_rows(&from, &to).await?;
    let result = summarize(&from, &to, &rows);
    Ok(Json(RebuildLatestResponse {
        range: json!({ "from": from, "to": to, "days": days }),
        result,
    }))
}

#[debug_handler]
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportCreateRequest>,
) -> ApiResult<Json<ReportCreateResponse>> {
    let document = prepare_for_insert(&request, Utc::now());
    let id = state.store.insert(document).await?;
    metrics::counter!("workout_analytics_reports_saved_total").increment(1);
    tracing::info!(%id, "saved report to history");
    Ok(Json(ReportCreateResponse {
        ok: true,
        id: id.to_hex(),
    }))
}

#[debug_handler]
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> ApiResult<Json<ReportListResponse>> {
    let limit = bounded(&params, "limit", DEFAULT_LIST_LIMIT, 1, MAX_LIST_LIMIT)?;
    let skip = bounded(&params, "skip", 0, 0, u32::MAX)?;

    let documents = state.store.list(ListQuery { skip, limit }).await?;
    let items = documents
        .iter()
        .filter_map(|doc| match normalize(doc) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable report document");
                None
            }
        })
        .collect();
    Ok(Json(ReportListResponse { items, limit, skip }))
}

#[debug_handler]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<NormalizedReport>> {
    let id = parse_report_id(&id)?;
    let doc = state
        .store
        .find(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("report not found".into()))?;
    Ok(Json(normalize(&doc)?))
}

#[debug_handler]
pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let oid = parse_report_id(&id)?;
    if !state.store.delete(&oid).await? {
        return Err(ApiError::NotFound("report not found".into()));
    }
    metrics::counter!("workout_analytics_reports_deleted_total").increment(1);
    tracing::info!(id = %oid, "deleted report from history");
    Ok(Json(DeleteResponse {
        ok: true,
        deleted: true,
        id,
    }))
}
