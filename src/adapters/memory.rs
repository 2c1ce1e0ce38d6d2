use crate::domain::model::{AuthUser, Document};
use crate::domain::ports::{AuthProvider, DocumentStore};
use crate::utils::error::{Result, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 20;

#[derive(Default)]
struct MemoryState {
    next_seq: u64,
    // collection -> (seq, id) -> fields; seq keeps insertion order
    collections: HashMap<String, BTreeMap<(u64, String), Map<String, Value>>>,
}

impl MemoryState {
    fn find_key(&self, collection: &str, id: &str) -> Option<(u64, String)> {
        self.collections
            .get(collection)?
            .keys()
            .find(|(_, doc_id)| doc_id == id)
            .cloned()
    }
}

/// In-process document store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
    deny_writes: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with `PermissionDenied`.
    pub fn set_deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    pub async fn len(&self, collection: &str) -> usize {
        let state = self.state.read().await;
        state.collections.get(collection).map_or(0, BTreeMap::len)
    }

    fn check_writable(&self) -> Result<()> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied {
                message: "Missing or insufficient permissions.".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// 20 character auto-id derived from a sequence number.
fn auto_id(seq: u64) -> String {
    // splitmix64 so consecutive ids do not share a prefix
    let mut x = seq.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut id = String::with_capacity(ID_LEN);
    for _ in 0..ID_LEN {
        x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = x;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        id.push(ID_ALPHABET[(z % ID_ALPHABET.len() as u64) as usize] as char);
    }
    id
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        state.next_seq += 1;
        let seq = state.next_seq;
        let id = auto_id(seq);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert((seq, id.clone()), fields);
        tracing::debug!("memory store: added {}/{}", collection, id);
        Ok(id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let documents = state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|((_, id), fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(documents)
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document> {
        let state = self.state.read().await;
        let key = state
            .find_key(collection, id)
            .ok_or_else(|| Self::not_found(collection, id))?;
        let fields = state.collections[collection][&key].clone();
        Ok(Document {
            id: id.to_string(),
            fields,
        })
    }

    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let key = state
            .find_key(collection, id)
            .ok_or_else(|| Self::not_found(collection, id))?;
        if let Some(stored) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&key))
        {
            for (field, value) in fields {
                stored.insert(field, value);
            }
        }
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let key = state
            .find_key(collection, id)
            .ok_or_else(|| Self::not_found(collection, id))?;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(&key);
        }
        Ok(())
    }
}

struct Account {
    uid: String,
    password: String,
}

/// In-process account service with a fixed token scheme.
#[derive(Clone, Default)]
pub struct MemoryAuthProvider {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_account(self, email: &str, password: &str) -> Self {
        let mut accounts = self.accounts.write().await;
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(
            email.to_lowercase(),
            Account {
                uid,
                password: password.to_string(),
            },
        );
        drop(accounts);
        self
    }

    fn user(uid: &str, email: &str) -> AuthUser {
        AuthUser {
            uid: uid.to_string(),
            email: email.to_string(),
            id_token: format!("token-{}", uid),
            refresh_token: format!("refresh-{}", uid),
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser> {
        let accounts = self.accounts.read().await;
        match accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => Ok(Self::user(&account.uid, email)),
            _ => Err(StoreError::AuthError {
                message: "Invalid email or password".to_string(),
            }),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        if password.len() < 6 {
            return Err(StoreError::AuthError {
                message: "Password should be at least 6 characters".to_string(),
            });
        }
        let mut accounts = self.accounts.write().await;
        let key = email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(StoreError::AuthError {
                message: "An account with this email already exists".to_string(),
            });
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(
            key,
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        Ok(Self::user(&uid, email))
    }
}
