//! Report-history persistence.
//!
//! Documents are schemaless JSON objects keyed by an [`ObjectId`] stored in
//! their `_id` field. Backends only promise insert, newest-first listing with
//! skip/limit, lookup and delete; reading documents back into a uniform shape
//! is [`crate::reconcile`]'s job.

use async_trait::async_trait;
use serde_json::Value;

use crate::{AnalyticsError, ObjectId};

mod memory;
mod sqlite;

pub use memory::InMemoryReportStore;
pub use sqlite::SqliteReportStore;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub skip: u32,
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync + 'static {
    /// Insert `document` under a freshly assigned id. Any `_id` already present
    /// in the document is replaced.
    async fn insert(&self, document: Value) -> Result<ObjectId, AnalyticsError>;
    /// Documents ordered by [`sort_key`] descending.
    async fn list(&self, query: ListQuery) -> Result<Vec<Value>, AnalyticsError>;
    async fn find(&self, id: &ObjectId) -> Result<Option<Value>, AnalyticsError>;
    /// Returns whether a document was removed.
    async fn delete(&self, id: &ObjectId) -> Result<bool, AnalyticsError>;
}

/// Listing order key: `meta.generated_at` when it is a string, otherwise the
/// creation time encoded in the id.
pub fn sort_key(id: &ObjectId, document: &Value) -> String {
    document
        .pointer("/meta/generated_at")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| id.generation_time().to_rfc3339())
}

fn with_id(document: Value, id: &ObjectId) -> Result<Value, AnalyticsError> {
    match document {
        Value::Object(mut map) => {
            map.insert("_id".into(), Value::String(id.to_hex()));
            Ok(Value::Object(map))
        }
        other => Err(AnalyticsError::Storage(format!(
            "report documents must be JSON objects, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
