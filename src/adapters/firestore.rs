use crate::config::StoreConfig;
use crate::domain::model::{AuthUser, Document};
use crate::domain::ports::DocumentStore;
use crate::utils::error::{Result, StoreError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

/// `DocumentStore` over the Firestore v1 REST surface.
pub struct FirestoreClient {
    client: Client,
    endpoint: String,
    project_id: Option<String>,
    database_id: String,
    api_key: Option<String>,
    page_size: usize,
    auth: Option<watch::Receiver<Option<AuthUser>>>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl FirestoreDocument {
    fn into_document(self) -> Document {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Document {
            id,
            fields: decode_fields(&self.fields),
        }
    }
}

impl FirestoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.firestore_endpoint.clone(),
            project_id: config.require_project_id().ok().map(str::to_string),
            database_id: config.database_id.clone(),
            api_key: config.api_key().map(str::to_string),
            page_size: config.page_size.max(1),
            auth: None,
        })
    }

    /// Sends the signed-in user's id token with every request.
    pub fn with_auth(mut self, user: watch::Receiver<Option<AuthUser>>) -> Self {
        self.auth = Some(user);
        self
    }

    fn documents_url(&self, segments: &[&str]) -> Result<Url> {
        let project_id = self
            .project_id
            .as_deref()
            .ok_or_else(|| StoreError::ConfigError {
                message: "required connection parameter 'project_id' is not set".to_string(),
            })?;

        let mut url = Url::parse(&self.endpoint).map_err(|e| StoreError::ConfigError {
            message: format!("invalid firestore endpoint '{}': {}", self.endpoint, e),
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| StoreError::ConfigError {
                message: format!("firestore endpoint '{}' cannot carry a path", self.endpoint),
            })?;
            path.pop_if_empty().extend([
                "v1",
                "projects",
                project_id,
                "databases",
                self.database_id.as_str(),
                "documents",
            ]);
            path.extend(segments);
        }
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .auth
            .as_ref()
            .and_then(|rx| rx.borrow().as_ref().map(|user| user.id_token.clone()));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response, collection: &str, id: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (message, code) = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => (parsed.error.message, parsed.error.status.unwrap_or_default()),
            Err(_) => (body, String::new()),
        };
        tracing::warn!("Firestore returned {} ({}): {}", status, code, message);

        Err(match (status.as_u16(), code.as_str()) {
            (404, _) | (_, "NOT_FOUND") => StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            (401, _) | (403, _) | (_, "PERMISSION_DENIED") | (_, "UNAUTHENTICATED") => {
                StoreError::PermissionDenied { message }
            }
            (status, _) => StoreError::BackendError { status, message },
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let url = self.documents_url(&[collection])?;
        tracing::debug!("POST {}", url.path());

        let body = json!({ "fields": encode_fields(&fields) });
        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, collection, "").await?;

        let created: FirestoreDocument = response.json().await?;
        Ok(created.into_document().id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.documents_url(&[collection])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &self.page_size.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            tracing::debug!("GET {} (page token: {:?})", url.path(), page_token);

            let response = self.authorize(self.client.get(url)).send().await?;
            let response = Self::check(response, collection, "").await?;
            let page: ListResponse = response.json().await?;

            documents.extend(page.documents.into_iter().map(FirestoreDocument::into_document));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document> {
        let url = self.documents_url(&[collection, id])?;
        tracing::debug!("GET {}", url.path());

        let response = self.authorize(self.client.get(url)).send().await?;
        let response = Self::check(response, collection, id).await?;
        let document: FirestoreDocument = response.json().await?;
        Ok(document.into_document())
    }

    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<()> {
        // A PATCH without a field mask replaces the document, so an empty
        // patch only confirms the document exists.
        if fields.is_empty() {
            self.get_document(collection, id).await?;
            return Ok(());
        }

        let mut url = self.documents_url(&[collection, id])?;
        {
            let mut query = url.query_pairs_mut();
            for name in fields.keys() {
                query.append_pair("updateMask.fieldPaths", &field_path(name));
            }
            query.append_pair("currentDocument.exists", "true");
        }
        tracing::debug!("PATCH {} ({} fields)", url.path(), fields.len());

        let body = json!({ "fields": encode_fields(&fields) });
        let response = self
            .authorize(self.client.patch(url))
            .json(&body)
            .send()
            .await?;
        Self::check(response, collection, id).await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let mut url = self.documents_url(&[collection, id])?;
        url.query_pairs_mut()
            .append_pair("currentDocument.exists", "true");
        tracing::debug!("DELETE {}", url.path());

        let response = self.authorize(self.client.delete(url)).send().await?;
        Self::check(response, collection, id).await?;
        Ok(())
    }
}

/// Quotes a field name for use in an update mask when it is not a plain identifier.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// Plain JSON to a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Firestore typed value back to plain JSON. Timestamps, references and
/// bytes come back as their string form.
pub fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return value.clone();
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| inner.clone()),
            other => other.clone(),
        },
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => inner.clone(),
        _ => value.clone(),
    }
}
