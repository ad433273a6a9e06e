use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use crate::utils::firestore_codec::{self, CodecError, Fields, Value};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Firestore request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Firestore returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Firestore authentication failed: {0}")]
    Auth(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Plain JSON object with the document id folded in.
    pub fn to_json(&self) -> serde_json::Value {
        let mut plain = firestore_codec::fields_to_json(&self.fields);
        plain.insert("id".to_string(), serde_json::Value::String(self.id.clone()));
        serde_json::Value::Object(plain)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(firestore_codec::decode(&self.id, &self.fields)?)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Trait for document database implementations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Fetch every document in a collection
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Documents whose `field` equals `value`
    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>>;

    /// Create a document, generating an id when none is given
    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> Result<Document>;

    /// Merge `fields` into an existing document
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Document>;

    /// Create or fully replace a document
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<Document>;

    /// Delete a document
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Decode a batch of documents, skipping (and logging) any that no longer fit the record shape.
pub fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping malformed {}/{}: {}", collection, doc.id, e);
                None
            }
        })
        .collect()
}
