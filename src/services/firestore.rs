use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn, error};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use crate::config::FirestoreConfig;
use crate::services::store::{Document, DocumentStore, Result, StoreError};
use crate::services::token_provider::TokenProvider;
use crate::utils::firestore_codec::{self, Fields, Value};

const PAGE_SIZE: &str = "300";

enum Auth {
    ApiKey(String),
    Bearer(TokenProvider),
    None,
}

/// Document store backed by the Firestore REST API.
pub struct FirestoreStore {
    client: Client,
    documents_url: String,
    auth: Auth,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: Option<serde_json::Value>,
    create_time: Option<String>,
    update_time: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    document: Option<WireDocument>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig) -> Self {
        let client = Client::new();

        let (origin, auth) = match (&config.emulator_host, &config.service_account, &config.api_key) {
            (Some(host), _, _) => {
                info!("Using Firestore emulator at {}", host);
                (format!("http://{}", host), Auth::None)
            }
            (None, Some(account), _) => {
                info!("Using Firestore service account {}", account.client_email);
                (
                    "https://firestore.googleapis.com".to_string(),
                    Auth::Bearer(TokenProvider::new(account.clone(), client.clone())),
                )
            }
            (None, None, Some(key)) => {
                info!("Using Firestore REST API key");
                ("https://firestore.googleapis.com".to_string(), Auth::ApiKey(key.clone()))
            }
            (None, None, None) => {
                error!("No Firestore credentials configured; requests will be unauthenticated");
                ("https://firestore.googleapis.com".to_string(), Auth::None)
            }
        };

        Self {
            client,
            documents_url: documents_url(&origin, &config.project_id, &config.database),
            auth,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = match &self.auth {
            Auth::ApiKey(key) => builder.query(&[("key", key.as_str())]),
            Auth::Bearer(provider) => builder.bearer_auth(provider.access_token().await?),
            Auth::None => builder,
        };
        Ok(builder.send().await?)
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }
}

fn documents_url(origin: &str, project_id: &str, database: &str) -> String {
    format!("{}/v1/projects/{}/databases/{}/documents", origin, project_id, database)
}

/// Turn a non-success response into a StoreError, keeping Firestore's message.
async fn status_error(response: Response, what: &str) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(what.to_string()),
        StatusCode::CONFLICT => StoreError::AlreadyExists(what.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(message),
        _ => {
            error!("Firestore request for {} failed: HTTP {} - {}", what, status, message);
            StoreError::Status { status: status.as_u16(), message }
        }
    }
}

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn document_from_wire(wire: WireDocument) -> Result<Document> {
    let id = wire.name.rsplit('/').next().unwrap_or_default().to_string();
    let fields = match wire.fields {
        Some(fields) => firestore_codec::fields_from_wire(&fields)?,
        None => Fields::new(),
    };
    Ok(Document {
        id,
        fields,
        create_time: parse_time(wire.create_time.as_deref()),
        update_time: parse_time(wire.update_time.as_deref()),
    })
}

/// Decode a batch of listed documents. One unreadable document is logged and
/// skipped so it cannot take the whole listing down with it.
fn readable_documents<I>(collection: &str, wires: I) -> Vec<Document>
where
    I: IntoIterator<Item = WireDocument>,
{
    wires
        .into_iter()
        .filter_map(|wire| {
            let name = wire.name.clone();
            match document_from_wire(wire) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!("Skipping unreadable document {} in {}: {}", name, collection, e);
                    None
                }
            }
        })
        .collect()
}

/// Field paths containing anything beyond `[A-Za-z_][A-Za-z0-9_]*` must be backtick quoted.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
    if simple && !field.is_empty() {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn equality_query(collection: &str, field: &str, value: &Value) -> serde_json::Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": quote_field_path(field) },
                    "op": "EQUAL",
                    "value": value.to_wire()
                }
            }
        }
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        debug!("Firestore get {}/{}", collection, id);
        let response = self.send(self.client.get(self.doc_url(collection, id))).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response, &format!("{}/{}", collection, id)).await);
        }
        let wire: WireDocument = response.json().await?;
        document_from_wire(wire).map(Some)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let url = format!("{}/{}", self.documents_url, collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.send(request).await?;
            if !response.status().is_success() {
                return Err(status_error(response, collection).await);
            }

            let page: ListResponse = response.json().await?;
            documents.extend(readable_documents(collection, page.documents));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Firestore list {} -> {} documents", collection, documents.len());
        Ok(documents)
    }

    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = equality_query(collection, field, value);

        let response = self.send(self.client.post(&url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(status_error(response, collection).await);
        }

        // one entry per result, plus a bare readTime entry when nothing matched
        let items: Vec<RunQueryItem> = response.json().await?;
        Ok(readable_documents(collection, items.into_iter().filter_map(|item| item.document)))
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> Result<Document> {
        let url = format!("{}/{}", self.documents_url, collection);
        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "fields": firestore_codec::fields_to_wire(&fields) }));
        if let Some(id) = id {
            request = request.query(&[("documentId", id)]);
        }

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(status_error(response, &format!("{}/{}", collection, id.unwrap_or("<new>"))).await);
        }
        document_from_wire(response.json().await?)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let mut params: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", quote_field_path(k)))
            .collect();
        params.push(("currentDocument.exists", "true".to_string()));

        let request = self
            .client
            .patch(self.doc_url(collection, id))
            .query(&params)
            .json(&json!({ "fields": firestore_codec::fields_to_wire(&fields) }));

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(status_error(response, &format!("{}/{}", collection, id)).await);
        }
        document_from_wire(response.json().await?)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let request = self
            .client
            .patch(self.doc_url(collection, id))
            .json(&json!({ "fields": firestore_codec::fields_to_wire(&fields) }));

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(status_error(response, &format!("{}/{}", collection, id)).await);
        }
        document_from_wire(response.json().await?)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let response = self.send(self.client.delete(self.doc_url(collection, id))).await?;
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(status_error(response, &format!("{}/{}", collection, id)).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("customerPhone"), "customerPhone");
        assert_eq!(quote_field_path("_private1"), "_private1");
        assert_eq!(quote_field_path("1st"), "`1st`");
        assert_eq!(quote_field_path("with space"), "`with space`");
        assert_eq!(quote_field_path("a`b"), "`a\\`b`");
    }

    #[test]
    fn test_documents_url() {
        assert_eq!(
            documents_url("https://firestore.googleapis.com", "veritas-hub", "(default)"),
            "https://firestore.googleapis.com/v1/projects/veritas-hub/databases/(default)/documents"
        );
    }

    #[test]
    fn test_equality_query_shape() {
        let q = equality_query("tasks", "assignedWorkerPhone", &Value::from("+254700000000"));
        let filter = &q["structuredQuery"]["where"]["fieldFilter"];
        assert_eq!(q["structuredQuery"]["from"][0]["collectionId"], "tasks");
        assert_eq!(filter["field"]["fieldPath"], "assignedWorkerPhone");
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["value"]["stringValue"], "+254700000000");
    }

    #[test]
    fn test_document_from_wire() {
        let wire: WireDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/abc123",
            "fields": { "phone": { "stringValue": "+254700000000" } },
            "createTime": "2024-03-06T09:30:00.000001Z",
            "updateTime": "2024-03-06T09:30:00.000001Z"
        }))
        .unwrap();
        let doc = document_from_wire(wire).unwrap();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.get("phone"), Some(&Value::from("+254700000000")));
        assert!(doc.create_time.is_some());
    }

    // A stand-in for the emulator: two pages of users and a query endpoint.
    // The second page mixes richer value kinds with one document that cannot be read.
    async fn fake_list(req: HttpRequest) -> HttpResponse {
        if !req.query_string().contains("pageToken=page2") {
            return HttpResponse::Ok().json(json!({
                "documents": [{
                    "name": "projects/demo/databases/(default)/documents/users/u1",
                    "fields": { "role": { "stringValue": "worker" } }
                }],
                "nextPageToken": "page2"
            }));
        }
        HttpResponse::Ok().json(json!({
            "documents": [
                {
                    "name": "projects/demo/databases/(default)/documents/users/u2",
                    "fields": {
                        "role": { "stringValue": "worker" },
                        "team": { "referenceValue": "projects/demo/databases/(default)/documents/teams/t1" },
                        "office": { "geoPointValue": { "latitude": -1.2864, "longitude": 36.8172 } }
                    }
                },
                {
                    "name": "projects/demo/databases/(default)/documents/users/u3",
                    "fields": { "balance": { "integerValue": "lots" } }
                }
            ]
        }))
    }

    async fn fake_query(body: web::Json<serde_json::Value>) -> HttpResponse {
        let value = &body["structuredQuery"]["where"]["fieldFilter"]["value"]["stringValue"];
        if value == "nobody" {
            return HttpResponse::Ok().json(json!([{ "readTime": "2024-03-06T09:30:00Z" }]));
        }
        HttpResponse::Ok().json(json!([
            { "document": {
                "name": "projects/demo/databases/(default)/documents/users/u9",
                "fields": { "phone": { "stringValue": value } }
            }, "readTime": "2024-03-06T09:30:00Z" }
        ]))
    }

    async fn fake_missing() -> HttpResponse {
        HttpResponse::NotFound().json(json!({ "error": { "code": 404, "message": "not found" } }))
    }

    #[actix_web::test]
    async fn test_against_fake_emulator() {
        let server = HttpServer::new(|| {
            App::new()
                .route("/v1/projects/demo/databases/(default)/documents/users", web::get().to(fake_list))
                .route("/v1/projects/demo/databases/(default)/documents:runQuery", web::post().to(fake_query))
                .route("/v1/projects/demo/databases/(default)/documents/users/{id}", web::get().to(fake_missing))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let running = server.run();
        let handle = running.handle();
        actix_web::rt::spawn(running);

        let store = FirestoreStore::new(&FirestoreConfig {
            project_id: "demo".to_string(),
            database: "(default)".to_string(),
            api_key: None,
            service_account: None,
            emulator_host: Some(addr.to_string()),
        });

        let users = store.list("users").await.unwrap();
        let ids: Vec<&str> = users.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(
            users[1].get("team"),
            Some(&Value::Reference("projects/demo/databases/(default)/documents/teams/t1".to_string()))
        );

        let found = store.find_by("users", "phone", &Value::from("+254711111111")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("phone"), Some(&Value::from("+254711111111")));

        let none = store.find_by("users", "phone", &Value::from("nobody")).await.unwrap();
        assert!(none.is_empty());

        assert!(store.get("users", "ghost").await.unwrap().is_none());

        handle.stop(true).await;
    }
}
