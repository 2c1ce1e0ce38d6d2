use crate::core::{DocumentStore, NewRecord, Record, RecordPatch};
use crate::domain::model::CREATED_AT_FIELD;
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{validate_price, validate_record_name};
use serde_json::{Map, Value};
use std::sync::Arc;

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Create/list/update/delete of records in one named collection.
///
/// Holds no record state: every call goes straight to the document store
/// and errors come back unmodified. No retries.
pub struct RecordStore<S: DocumentStore> {
    store: S,
    collection: String,
    clock: Clock,
}

impl<S: DocumentStore> RecordStore<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Replaces the millisecond clock used for `createdAt`.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn document_store(&self) -> &S {
        &self.store
    }

    /// Stores a new record and returns the identifier the store assigned.
    pub async fn create(&self, record: NewRecord) -> Result<String> {
        validate_record_name(&record.name)?;
        validate_price(record.price)?;

        let mut fields = to_fields(&record)?;
        fields.insert(CREATED_AT_FIELD.to_string(), Value::from((self.clock)()));

        let id = self.store.add_document(&self.collection, fields).await?;
        tracing::info!("Created {}/{} ({})", self.collection, id, record.name);
        Ok(id)
    }

    /// Every record, newest `createdAt` first; ties ordered by id.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let documents = self.store.list_documents(&self.collection).await?;
        tracing::debug!("Fetched {} documents from {}", documents.len(), self.collection);

        // Other writers share the collection; documents that are not
        // records are skipped rather than failing the whole listing.
        let mut records: Vec<Record> = documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id.clone();
                match Record::try_from(document) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!("Skipping {}/{}: {}", self.collection, id, e);
                        None
                    }
                }
            })
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<Record> {
        self.check_id(id)?;
        let document = self.store.get_document(&self.collection, id).await?;
        Ok(Record::try_from(document)?)
    }

    /// Merges the supplied fields into an existing record. The identifier
    /// and `createdAt` are never touched.
    pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        if let Some(name) = &patch.name {
            validate_record_name(name)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }

        self.check_id(id)?;
        let fields = to_fields(&patch)?;
        self.store
            .patch_document(&self.collection, id, fields)
            .await?;
        tracing::info!("Updated {}/{}", self.collection, id);
        Ok(())
    }

    /// Removes a record permanently. `NotFound` if it is already gone.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.check_id(id)?;
        self.store.delete_document(&self.collection, id).await?;
        tracing::info!("Deleted {}/{}", self.collection, id);
        Ok(())
    }
}

impl<S: DocumentStore> RecordStore<S> {
    /// A blank or path-like id cannot name a record in this collection.
    fn check_id(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(StoreError::NotFound {
                collection: self.collection.clone(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn to_fields<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove(CREATED_AT_FIELD);
            fields.remove(crate::domain::model::ID_FIELD);
            Ok(fields)
        }
        other => Err(StoreError::ValidationError {
            message: format!("expected an object of fields, got {}", other),
        }),
    }
}
