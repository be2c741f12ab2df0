use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ListQuery, ReportStore, sort_key, with_id};
use crate::{AnalyticsError, ObjectId};

/// Process-local store, used when no database path is configured and in tests.
#[derive(Default)]
pub struct InMemoryReportStore {
    documents: RwLock<HashMap<ObjectId, Value>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Insert a document verbatim, keeping whatever `_id` it carries. Used to
    /// seed legacy shapes, including ones with a broken id.
    pub async fn insert_raw(&self, id: ObjectId, document: Value) {
        self.documents.write().await.insert(id, document);
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, document: Value) -> Result<ObjectId, AnalyticsError> {
        let id = ObjectId::new();
        let document = with_id(document, &id)?;
        self.documents.write().await.insert(id, document);
        Ok(id)
    }

    async fn list(&self, query: ListQuery) -> Result<Vec<Value>, AnalyticsError> {
        let docs = self.documents.read().await;
        let mut keyed: Vec<(String, &ObjectId, &Value)> = docs
            .iter()
            .map(|(id, doc)| (sort_key(id, doc), id, doc))
            .collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(a.1)));
        Ok(keyed
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .map(|(_, _, doc)| doc.clone())
            .collect())
    }

    async fn find(&self, id: &ObjectId) -> Result<Option<Value>, AnalyticsError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, AnalyticsError> {
        Ok(self.documents.write().await.remove(id).is_some())
    }
}
