use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use workout_analytics::http_client::ReqwestRowSource;
use workout_analytics::retry::RetryPolicy;
use workout_analytics::store::{InMemoryReportStore, ReportStore};
use workout_analytics::{AnalyticsError, ObjectId, RawRow, RowSource};
use workout_analytics_api::{AppState, router};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Row source returning a fixed set of rows and remembering the requested range.
struct StaticRows {
    rows: Vec<RawRow>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticRows {
    fn new(rows: Value) -> Arc<Self> {
        Arc::new(Self {
            rows: serde_json::from_value(rows).expect("rows"),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl RowSource for StaticRows {
    async fn fetch_rows(&self, from: &str, to: &str) -> Result<Vec<RawRow>, AnalyticsError> {
        self.calls
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string()));
        Ok(self.rows.clone())
    }
}

fn squat_rows() -> Value {
    json!([{
        "workout_id": 1, "exercise_id": 5, "set_id": 10, "reps": 8,
        "weight_kg": "20.5", "workout_date": "2026-01-07", "exercise_name": "Squat"
    }])
}

fn app_with(rows: Arc<dyn RowSource>, store: Arc<InMemoryReportStore>) -> Router {
    router(
        Arc::new(AppState::new(rows, store)),
        Duration::from_secs(5),
    )
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with(StaticRows::new(json!([])), Arc::new(InMemoryReportStore::new()));
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn summary_aggregates_upstream_rows() {
    let rows = StaticRows::new(squat_rows());
    let app = app_with(rows.clone(), Arc::new(InMemoryReportStore::new()));

    let (status, body) = call(
        &app,
        "GET",
        "/analytics/summary?from=2026-01-01&to=2026-01-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "from": "2026-01-01",
            "to": "2026-01-31",
            "summary": {"workouts": 1, "exercises": 1, "sets": 1, "total_reps": 8, "total_volume": 164.0},
            "by_day": [{"date": "2026-01-07", "volume": 164.0}],
            "by_exercise": [{"exercise": "Squat", "volume": 164.0}]
        })
    );
    assert_eq!(
        rows.calls.lock().unwrap().as_slice(),
        [("2026-01-01".to_string(), "2026-01-31".to_string())]
    );
}

#[tokio::test]
async fn summary_validates_range() {
    let rows = StaticRows::new(json!([]));
    let app = app_with(rows.clone(), Arc::new(InMemoryReportStore::new()));

    let (status, body) = call(&app, "GET", "/analytics/summary?from=2026-13-01&to=2026-01-31", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "'from' must be formatted as YYYY-MM-DD");

    let (status, _) = call(&app, "GET", "/analytics/summary?from=2026-02-01&to=2026-01-31", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", "/analytics/summary?from=2026-02-01", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "'to' is required");

    assert!(rows.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rebuild_latest_reports_range_and_result() {
    let rows = StaticRows::new(squat_rows());
    let app = app_with(rows.clone(), Arc::new(InMemoryReportStore::new()));

    let (status, body) = call(&app, "POST", "/analytics/rebuild/latest?days=7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"]["days"], 7);
    let from = body["range"]["from"].as_str().unwrap();
    let to = body["range"]["to"].as_str().unwrap();
    assert_eq!(body["result"]["from"], from);
    assert_eq!(body["result"]["to"], to);
    let f = chrono::NaiveDate::parse_from_str(from, "%Y-%m-%d").unwrap();
    let t = chrono::NaiveDate::parse_from_str(to, "%Y-%m-%d").unwrap();
    assert_eq!((t - f).num_days(), 7);
    assert_eq!(body["result"]["summary"]["sets"], 1);

    let (status, _) = call(&app, "POST", "/analytics/rebuild/latest?days=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/analytics/rebuild/latest?days=3651", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upstream_failures_surface_as_gateway_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/workouts"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    let source = ReqwestRowSource::new(&server.uri(), Duration::from_secs(2))
        .unwrap()
        .with_retry(RetryPolicy::none());
    let app = app_with(Arc::new(source), Arc::new(InMemoryReportStore::new()));

    let (status, body) = call(
        &app,
        "GET",
        "/analytics/summary?from=2026-01-01&to=2026-01-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "workout service error: maintenance");

    let unreachable = ReqwestRowSource::new("http://127.0.0.1:9", Duration::from_millis(500))
        .unwrap()
        .with_retry(RetryPolicy::none());
    let app = app_with(Arc::new(unreachable), Arc::new(InMemoryReportStore::new()));
    let (status, _) = call(
        &app,
        "GET",
        "/analytics/summary?from=2026-01-01&to=2026-01-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn report_history_round_trip() {
    let store = Arc::new(InMemoryReportStore::new());
    let app = app_with(StaticRows::new(json!([])), store.clone());

    let result = json!({
        "from": "2026-01-01",
        "to": "2026-01-31",
        "summary": {"workouts": 1, "exercises": 1, "sets": 1, "total_reps": 8, "total_volume": 164.0},
        "by_day": [{"date": "2026-01-07", "volume": 164.0}],
        "by_exercise": [{"exercise": "Squat", "volume": 164.0}]
    });
    let (status, created) = call(
        &app,
        "POST",
        "/analytics/reports",
        Some(json!({"from": "2026-01-01", "to": "2026-01-31", "result": result})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["ok"], true);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(ObjectId::is_valid(&id));

    let (status, report) = call(&app, "GET", &format!("/analytics/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["id"], id.as_str());
    assert_eq!(report["range"], json!({"from": "2026-01-01", "to": "2026-01-31"}));
    assert_eq!(
        report["pdf"],
        json!({"filename": "Progreso_del_01-01-2026_al_31-01-2026.pdf", "generated": true})
    );
    assert_eq!(report["result"]["summary"]["total_volume"], 164.0);
    assert!(report["generated_at"].is_string());

    let (status, list) = call(&app, "GET", "/analytics/reports", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["limit"], 50);
    assert_eq!(list["skip"], 0);
    assert_eq!(list["items"].as_array().unwrap().len(), 1);

    let (status, deleted) = call(&app, "DELETE", &format!("/analytics/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"ok": true, "deleted": true, "id": id.as_str()}));

    let (status, _) = call(&app, "GET", &format!("/analytics/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", &format!("/analytics/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn invalid_ids_and_paging_are_rejected() {
    let app = app_with(StaticRows::new(json!([])), Arc::new(InMemoryReportStore::new()));

    let (status, body) = call(&app, "GET", "/analytics/reports/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "invalid report id");
    let (status, _) = call(&app, "DELETE", "/analytics/reports/xyz", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "GET", "/analytics/reports?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_normalizes_legacy_documents_and_skips_broken_ones() {
    let store = Arc::new(InMemoryReportStore::new());
    let legacy = ObjectId::new();
    store
        .insert_raw(
            legacy,
            json!({
                "_id": legacy.to_hex(),
                "result": {"from": "2026-02-01", "to": "2026-02-28", "by_day": "oops"}
            }),
        )
        .await;
    store
        .insert_raw(ObjectId::new(), json!({"_id": 12, "result": {}}))
        .await;
    let app = app_with(StaticRows::new(json!([])), store.clone());

    let (status, list) = call(&app, "GET", "/analytics/reports?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = list["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["range"]["from"], "2026-02-01");
    assert_eq!(
        items[0]["pdf"]["filename"],
        "Progreso_del_01-02-2026_al_28-02-2026.pdf"
    );
    assert_eq!(items[0]["result"]["by_day"], json!([]));
    assert_eq!(items[0]["generated_at"], legacy.generation_time().to_rfc3339());
}

#[tokio::test]
async fn broken_document_lookup_is_a_server_error() {
    let store = Arc::new(InMemoryReportStore::new());
    let id = ObjectId::new();
    store.insert_raw(id, json!({"result": {}})).await;
    let app = app_with(StaticRows::new(json!([])), store);

    let (status, _) = call(&app, "GET", &format!("/analytics/reports/{id}"), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn metrics_without_recorder_is_not_found() {
    let store: Arc<dyn ReportStore> = Arc::new(InMemoryReportStore::new());
    let app = router(
        Arc::new(AppState::new(StaticRows::new(json!([])), store)),
        Duration::from_secs(5),
    );
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
