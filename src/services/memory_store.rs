use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::services::store::{Document, DocumentStore, Result, StoreError};
use crate::utils::firestore_codec::{Fields, Value};

/// In-memory document store for testing and local development
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, HashMap<String, Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        // Firestore lists in document-id order
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        Ok(self
            .list(collection)
            .await?
            .into_iter()
            .filter(|doc| doc.fields.get(field).map_or(false, |stored| query_equal(stored, value)))
            .collect())
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let id = id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        if docs.contains_key(&id) {
            return Err(StoreError::AlreadyExists(format!("{}/{}", collection, id)));
        }

        let now = Utc::now();
        let doc = Document {
            id: id.clone(),
            fields,
            create_time: Some(now),
            update_time: Some(now),
        };
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        doc.fields.extend(fields);
        doc.update_time = Some(Utc::now());
        Ok(doc.clone())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let now = Utc::now();
        let create_time = docs.get(id).and_then(|d| d.create_time).or(Some(now));
        let doc = Document {
            id: id.to_string(),
            fields,
            create_time,
            update_time: Some(now),
        };
        docs.insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

/// Equality as Firestore's EQUAL filter sees it: integers and doubles compare by number.
fn query_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored.as_f64(), wanted.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => stored == wanted,
    }
}
