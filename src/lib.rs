pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{FirestoreClient, IdentityToolkitClient, MemoryAuthProvider, MemoryDocumentStore};
pub use config::StoreConfig;
pub use core::auth::{AuthEvent, AuthEvents, AuthSession, Unsubscribe};
pub use core::board::{RecordBoard, RecordForm, SubmitOutcome};
pub use core::record_store::RecordStore;
pub use domain::model::{AuthUser, Document, NewRecord, Record, RecordPatch};
pub use utils::error::{Result, StoreError};
