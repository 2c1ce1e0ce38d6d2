pub mod auth;
pub mod board;
pub mod record_store;

pub use crate::domain::model::{AuthUser, Document, NewRecord, Record, RecordPatch};
pub use crate::domain::ports::{AuthProvider, DocumentStore};
pub use crate::utils::error::Result;
