//! Form and list state for a record-management screen.

use crate::core::record_store::RecordStore;
use crate::core::{DocumentStore, NewRecord, Record, RecordPatch};
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{validate_price, validate_record_name};

/// Raw form inputs, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub details: String,
}

impl RecordForm {
    pub fn from_record(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone().unwrap_or_default(),
            price: record.price.to_string(),
            details: record.details.clone().unwrap_or_default(),
        }
    }

    fn parsed_price(&self) -> Result<f64> {
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .map_err(|_| StoreError::ValidationError {
                message: format!("Price must be a number, got '{}'", self.price.trim()),
            })?;
        validate_price(price)?;
        Ok(price)
    }

    /// Blank optional inputs are left out.
    pub fn to_new_record(&self) -> Result<NewRecord> {
        validate_record_name(&self.name)?;
        Ok(NewRecord {
            name: self.name.trim().to_string(),
            description: non_blank(&self.description),
            price: self.parsed_price()?,
            details: non_blank(&self.details),
        })
    }

    /// Full field set for an edit. Blank optional inputs clear the stored text.
    pub fn to_patch(&self) -> Result<RecordPatch> {
        validate_record_name(&self.name)?;
        Ok(RecordPatch {
            name: Some(self.name.trim().to_string()),
            description: Some(self.description.trim().to_string()),
            price: Some(self.parsed_price()?),
            details: Some(self.details.trim().to_string()),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(String),
    Updated(String),
}

/// Snapshot of the collection plus the edit selection.
///
/// The snapshot is reloaded after every successful mutation and is stale as
/// soon as another writer touches the store. Failures are logged, kept for
/// display, and returned.
pub struct RecordBoard<S: DocumentStore> {
    store: RecordStore<S>,
    records: Vec<Record>,
    editing: Option<String>,
    last_error: Option<String>,
}

impl<S: DocumentStore> RecordBoard<S> {
    pub fn new(store: RecordStore<S>) -> Self {
        Self {
            store,
            records: Vec::new(),
            editing: None,
            last_error: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.store.list().await;
        let records = self.note(result)?;
        self.records = records;
        Ok(())
    }

    /// Selects a record from the snapshot and returns its pre-filled form.
    pub fn begin_edit(&mut self, id: &str) -> Option<RecordForm> {
        let record = self.records.iter().find(|r| r.id == id)?;
        let form = RecordForm::from_record(record);
        self.editing = Some(id.to_string());
        Some(form)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Creates when nothing is selected, otherwise updates the selection.
    pub async fn submit(&mut self, form: &RecordForm) -> Result<SubmitOutcome> {
        let outcome = match self.editing.clone() {
            None => {
                let result = match form.to_new_record() {
                    Ok(record) => self.store.create(record).await,
                    Err(e) => Err(e),
                };
                SubmitOutcome::Created(self.note(result)?)
            }
            Some(id) => {
                let result = match form.to_patch() {
                    Ok(patch) => self.store.update(&id, patch).await,
                    Err(e) => Err(e),
                };
                if matches!(&result, Err(e) if e.is_not_found()) {
                    self.editing = None;
                    if let Err(refresh_err) = self.refresh().await {
                        tracing::warn!("Refresh after missing record failed: {}", refresh_err);
                    }
                }
                self.note(result)?;
                self.editing = None;
                SubmitOutcome::Updated(id)
            }
        };

        self.refresh().await?;
        Ok(outcome)
    }

    /// Deletes a record. One that is already gone counts as deleted.
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        match self.store.delete(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} was already deleted", id);
            }
            Err(e) => return self.note(Err(e)),
        }

        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        self.refresh().await
    }

    fn note<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => {
                tracing::error!("Record operation failed: {}", e);
                self.last_error = Some(e.user_friendly_message());
            }
        }
        result
    }
}
