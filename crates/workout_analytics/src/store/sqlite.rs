use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::info;

use super::{ListQuery, ReportStore, sort_key, with_id};
use crate::{AnalyticsError, ObjectId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS report_generations (
    id       TEXT PRIMARY KEY,
    sort_key TEXT NOT NULL,
    document TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_report_generations_sort
    ON report_generations (sort_key DESC, id DESC);
";

/// SQLite-backed report history. Documents are stored as JSON text; the
/// listing key is materialized on insert since documents are never updated.
#[derive(Clone)]
pub struct SqliteReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReportStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened report store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, AnalyticsError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AnalyticsError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, AnalyticsError>
    where
        F: FnOnce(&Connection) -> Result<T, AnalyticsError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AnalyticsError::Storage("connection mutex poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AnalyticsError::Storage(e.to_string()))?
    }
}

fn decode(text: String) -> Result<Value, AnalyticsError> {
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn insert(&self, document: Value) -> Result<ObjectId, AnalyticsError> {
        let id = ObjectId::new();
        let document = with_id(document, &id)?;
        let key = sort_key(&id, &document);
        let text = serde_json::to_string(&document)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO report_generations (id, sort_key, document) VALUES (?1, ?2, ?3)",
                params![id.to_hex(), key, text],
            )?;
            Ok(id)
        })
        .await
    }

    async fn list(&self, query: ListQuery) -> Result<Vec<Value>, AnalyticsError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT document FROM report_generations
                 ORDER BY sort_key DESC, id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![query.limit, query.skip], |row| {
                row.get::<_, String>(0)
            })?;
            let mut out = Vec::new();
            for text in rows {
                out.push(decode(text?)?);
            }
            Ok(out)
        })
        .await
    }

    async fn find(&self, id: &ObjectId) -> Result<Option<Value>, AnalyticsError> {
        let key = id.to_hex();
        self.with_conn(move |conn| {
            let text: Option<String> = conn
                .query_row(
                    "SELECT document FROM report_generations WHERE id = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            text.map(decode).transpose()
        })
        .await
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, AnalyticsError> {
        let key = id.to_hex();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM report_generations WHERE id = ?1",
                params![key],
            )?;
            Ok(n > 0)
        })
        .await
    }
}
