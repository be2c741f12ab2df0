use serde_json::{Value, json};
use workout_analytics::store::{InMemoryReportStore, ListQuery, ReportStore, SqliteReportStore};
use workout_analytics::{AnalyticsError, ObjectId, normalize};

fn doc(generated_at: &str) -> Value {
    json!({
        "meta": {"generated_at": generated_at},
        "range": {"from": "2026-01-01", "to": "2026-01-31"},
    })
}

async fn exercise_store(store: &dyn ReportStore) {
    let older = store.insert(doc("2026-01-01T00:00:00Z")).await.unwrap();
    let newest = store.insert(doc("2026-03-01T00:00:00Z")).await.unwrap();
    let middle = store.insert(doc("2026-02-01T00:00:00Z")).await.unwrap();

    let all = store.list(ListQuery::default()).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|d| d["_id"].as_str().unwrap()).collect();
    assert_eq!(ids, [newest.to_hex(), middle.to_hex(), older.to_hex()]);

    let page = store.list(ListQuery { skip: 1, limit: 1 }).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["_id"], middle.to_hex());

    let found = store.find(&older).await.unwrap().expect("document");
    let normalized = normalize(&found).unwrap();
    assert_eq!(normalized.id, older.to_hex());
    assert_eq!(normalized.generated_at, "2026-01-01T00:00:00Z");

    assert!(store.delete(&older).await.unwrap());
    assert!(!store.delete(&older).await.unwrap());
    assert!(store.find(&older).await.unwrap().is_none());
    assert!(store.find(&ObjectId::new()).await.unwrap().is_none());
    assert_eq!(store.list(ListQuery::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn in_memory_store_contract() {
    exercise_store(&InMemoryReportStore::new()).await;
}

#[tokio::test]
async fn sqlite_store_contract() {
    exercise_store(&SqliteReportStore::open_in_memory().unwrap()).await;
}

#[tokio::test]
async fn sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.db");
    let id = {
        let store = SqliteReportStore::open(&path).unwrap();
        store.insert(doc("2026-01-01T00:00:00Z")).await.unwrap()
    };
    let store = SqliteReportStore::open(&path).unwrap();
    let found = store.find(&id).await.unwrap().expect("persisted");
    assert_eq!(found["range"]["from"], "2026-01-01");
}

#[tokio::test]
async fn documents_without_timestamp_sort_by_id_time() {
    let store = InMemoryReportStore::new();
    let legacy = ObjectId::at(chrono::DateTime::from_timestamp(1_767_225_600, 0).unwrap());
    store
        .insert_raw(legacy, json!({"_id": legacy.to_hex(), "result": {}}))
        .await;
    // legacy id encodes 2026-01-01T00:00:00Z
    store.insert(doc("2026-06-01T00:00:00Z")).await.unwrap();
    store.insert(doc("2025-06-01T00:00:00Z")).await.unwrap();

    let all = store.list(ListQuery::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1]["_id"], legacy.to_hex());
}

#[tokio::test]
async fn non_object_documents_are_rejected() {
    let store = InMemoryReportStore::new();
    let err = store.insert(json!([1, 2, 3])).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Storage(_)));
    assert!(store.is_empty().await);
}
