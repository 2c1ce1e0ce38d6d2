// Adapters layer: concrete implementations of the domain ports.

pub mod firestore;
pub mod identity;
pub mod memory;

pub use firestore::FirestoreClient;
pub use identity::IdentityToolkitClient;
pub use memory::{MemoryAuthProvider, MemoryDocumentStore};
