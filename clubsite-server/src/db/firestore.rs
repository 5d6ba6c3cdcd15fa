//! Firestore REST API client
//!
//! Endpoints used:
//! - `POST   {root}/{collection}`               insert with generated id
//! - `PATCH  {root}/{collection}/{id}?updateMask.fieldPaths=...` upsert
//! - `GET    {root}/{collection}/{id}`          fetch
//! - `POST   {root}:runQuery`                   list / field equality query
//!
//! where `{root}` is `{api}/projects/{project}/databases/{database}/documents`.

use async_trait::async_trait;
use clubsite_common::config::FirestoreConfig;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use tracing::debug;

use super::codec::{decode_fields, encode_fields, merge_field_paths, replace_field_paths};
use super::{Direction, Document, DocumentStore, OrderBy, StoreError, StoredDocument, WriteMode};

pub struct FirestoreStore {
    client: Client,
    api_base: String,
    project_id: Option<String>,
    database: String,
    access_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(client: Client, config: &FirestoreConfig, access_token: Option<String>) -> Self {
        Self {
            client,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone().filter(|p| !p.trim().is_empty()),
            database: config.database.clone(),
            access_token,
        }
    }

    fn documents_root(&self) -> Result<String, StoreError> {
        let project = self.project_id.as_deref().ok_or_else(|| {
            StoreError::NotConfigured("document store project id is not configured".to_string())
        })?;
        Ok(format!(
            "{}/projects/{}/databases/{}/documents",
            self.api_base, project, self.database
        ))
    }

    /// `{root}/{segments...}` with every segment percent-encoded
    fn document_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let root = self.documents_root()?;
        let mut url = Url::parse(&root)
            .map_err(|e| StoreError::NotConfigured(format!("invalid document store URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::NotConfigured("document store URL cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn error_from(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        // Prefer the structured message when the API returns one
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        StoreError::Backend { status, message }
    }

    async fn json_body(response: reqwest::Response) -> Result<Value, StoreError> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Codec(format!("invalid response body: {}", e)))
    }

    async fn run_query(&self, structured_query: Value) -> Result<Vec<StoredDocument>, StoreError> {
        let url = format!("{}:runQuery", self.documents_root()?);
        let response = self
            .send(
                self.client
                    .post(url)
                    .json(&json!({ "structuredQuery": structured_query })),
            )
            .await?;
        let body = Self::json_body(response).await?;

        let rows = body
            .as_array()
            .ok_or_else(|| StoreError::Codec("runQuery response is not an array".to_string()))?;

        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(parse_document)
            .collect()
    }
}

/// Turn a REST document resource into a `StoredDocument`
fn parse_document(resource: &Value) -> Result<StoredDocument, StoreError> {
    let name = resource["name"]
        .as_str()
        .ok_or_else(|| StoreError::Codec("document without name".to_string()))?;
    let id = name.rsplit('/').next().unwrap_or_default().to_string();
    let data = match resource.get("fields") {
        Some(fields) => decode_fields(fields)?,
        None => Document::new(),
    };
    Ok(StoredDocument { id, data })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn insert(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let url = self.document_url(&[collection])?;
        let response = self
            .send(self.client.post(url).json(&json!({ "fields": encode_fields(&data) })))
            .await?;
        let body = Self::json_body(response).await?;
        Ok(parse_document(&body)?.id)
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let url = self.document_url(&[collection, id])?;

        let paths = match mode {
            WriteMode::Merge => merge_field_paths(&data),
            WriteMode::Replace => replace_field_paths(&data),
        };
        // An empty mask would replace the whole document
        if paths.is_empty() {
            debug!(collection = %collection, id = %id, "Upsert with no fields skipped");
            return Ok(());
        }

        let mask: Vec<(&str, String)> = paths
            .into_iter()
            .map(|p| ("updateMask.fieldPaths", p))
            .collect();

        let response = self
            .send(
                self.client
                    .patch(url)
                    .query(&mask)
                    .json(&json!({ "fields": encode_fields(&data) })),
            )
            .await?;
        Self::json_body(response).await.map(|_| ())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let url = self.document_url(&[collection, id])?;
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = Self::json_body(response).await?;
        parse_document(&body).map(Some)
    }

    async fn list(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let mut query = json!({ "from": [{ "collectionId": collection }] });
        if let Some(order) = order {
            let direction = match order.direction {
                Direction::Ascending => "ASCENDING",
                Direction::Descending => "DESCENDING",
            };
            query["orderBy"] = json!([{
                "field": { "fieldPath": order.field },
                "direction": direction,
            }]);
        }
        self.run_query(query).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let query = json!({
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": { "stringValue": value },
                }
            }
        });
        self.run_query(query).await
    }
}
