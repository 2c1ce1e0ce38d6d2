use crate::domain::model::{AuthUser, Document};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A remote collection-of-documents service.
///
/// Implementations hold no record state of their own beyond what the
/// backing service owns. Every call is a single request/response.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Adds a document and returns the identifier the store assigned.
    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String>;

    /// All documents in the collection, in whatever order the store returns them.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>>;

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document>;

    /// Merges `fields` into an existing document. Fails with `NotFound` if absent.
    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<()>;

    /// Fails with `NotFound` if the document is already gone.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;
}

/// Password-based account service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser>;
}
