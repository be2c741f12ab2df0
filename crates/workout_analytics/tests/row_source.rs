use std::time::Duration;

use workout_analytics::http_client::ReqwestRowSource;
use workout_analytics::retry::RetryPolicy;
use workout_analytics::{AnalyticsError, RowId, RowSource, summarize};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> ReqwestRowSource {
    ReqwestRowSource::new(&server.uri(), Duration::from_secs(5))
        .expect("client")
        .with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn fetch_rows_passes_range_and_parses_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/workouts"))
        .and(query_param("from", "2026-01-01"))
        .and(query_param("to", "2026-01-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [
                {"workout_id": 1, "exercise_id": 5, "set_id": 10, "reps": 8,
                 "weight_kg": "20.5", "workout_date": "2026-01-07T00:00:00.000Z",
                 "exercise_name": "Squat"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = source(&server)
        .fetch_rows("2026-01-01", "2026-01-31")
        .await
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].set_id, Some(RowId::Int(10)));

    let report = summarize("2026-01-01", "2026-01-31", &rows);
    assert_eq!(report.summary.total_volume, 164.0);
    assert_eq!(report.by_day[0].date, "2026-01-07");
}

#[tokio::test]
async fn missing_rows_key_means_no_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/workouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let rows = source(&server).fetch_rows("2026-01-01", "2026-01-02").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn error_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/workouts"))
        .respond_with(ResponseTemplate::new(503).set_body_string("database down"))
        .expect(1)
        .mount(&server)
        .await;

    let src = ReqwestRowSource::new(&server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_retry(RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        });
    let err = src.fetch_rows("2026-01-01", "2026-01-02").await.unwrap_err();
    match err {
        AnalyticsError::Upstream { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "database down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_an_http_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let src = ReqwestRowSource::new("http://127.0.0.1:9", Duration::from_millis(500))
        .unwrap()
        .with_retry(RetryPolicy::none());
    let err = src.fetch_rows("2026-01-01", "2026-01-02").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Http(_)));
}
