use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_DATABASE_ID: &str = "(default)";
pub const DEFAULT_COLLECTION: &str = "products";
pub const DEFAULT_PAGE_SIZE: usize = 300;

/// Connection parameters for the hosted backend plus a few client knobs.
///
/// Built once at startup and handed by reference to the adapters. Required
/// parameters are not checked when loading; an adapter that needs a missing
/// one fails with [`StoreError::ConfigError`] on first use. Call
/// [`Validate::validate`] to check eagerly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub storage_bucket: String,
    #[serde(default)]
    pub messaging_sender_id: String,
    #[serde(default)]
    pub app_id: String,

    #[serde(default = "default_firestore_endpoint")]
    pub firestore_endpoint: String,
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    pub timeout_seconds: Option<u64>,
}

fn default_firestore_endpoint() -> String {
    DEFAULT_FIRESTORE_ENDPOINT.to_string()
}

fn default_auth_endpoint() -> String {
    DEFAULT_AUTH_ENDPOINT.to_string()
}

fn default_database_id() -> String {
    DEFAULT_DATABASE_ID.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_domain: String::new(),
            project_id: String::new(),
            storage_bucket: String::new(),
            messaging_sender_id: String::new(),
            app_id: String::new(),
            firestore_endpoint: default_firestore_endpoint(),
            auth_endpoint: default_auth_endpoint(),
            database_id: default_database_id(),
            collection: default_collection(),
            page_size: default_page_size(),
            timeout_seconds: None,
        }
    }
}

impl StoreConfig {
    /// 從環境變數載入配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let mut config = Self {
            api_key: get("FIREBASE_API_KEY"),
            auth_domain: get("FIREBASE_AUTH_DOMAIN"),
            project_id: get("FIREBASE_PROJECT_ID"),
            storage_bucket: get("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: get("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: get("FIREBASE_APP_ID"),
            ..Self::default()
        };

        if let Some(endpoint) = lookup("FIREBASE_FIRESTORE_ENDPOINT") {
            config.firestore_endpoint = endpoint;
        }
        if let Some(endpoint) = lookup("FIREBASE_AUTH_ENDPOINT") {
            config.auth_endpoint = endpoint;
        }
        if let Some(database) = lookup("FIREBASE_DATABASE_ID") {
            config.database_id = database;
        }
        if let Some(collection) = lookup("RECORD_STORE_COLLECTION") {
            config.collection = collection;
        }

        config
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StoreError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StoreError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FIREBASE_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| StoreError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Project id, or a configuration error when it was never supplied.
    pub fn require_project_id(&self) -> Result<&str> {
        Self::require("project_id", &self.project_id)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        Self::require("api_key", &self.api_key)
    }

    /// API key to attach to requests, if any.
    pub fn api_key(&self) -> Option<&str> {
        Self::require("api_key", &self.api_key).ok()
    }

    fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
        let trimmed = value.trim();
        if trimmed.is_empty() || (trimmed.starts_with("${") && trimmed.ends_with('}')) {
            return Err(StoreError::ConfigError {
                message: format!("required connection parameter '{}' is not set", field),
            });
        }
        Ok(trimmed)
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<()> {
        self.require_api_key()?;
        self.require_project_id()?;
        Self::require("auth_domain", &self.auth_domain)?;
        Self::require("app_id", &self.app_id)?;

        validation::validate_url("firestore_endpoint", &self.firestore_endpoint)?;
        validation::validate_url("auth_endpoint", &self.auth_endpoint)?;
        validation::validate_non_empty_string("database_id", &self.database_id)?;
        validation::validate_non_empty_string("collection", &self.collection)?;
        validation::validate_positive_number("page_size", self.page_size, 1)?;

        if self.collection.contains('/') {
            return Err(StoreError::InvalidConfigValueError {
                field: "collection".to_string(),
                value: self.collection.clone(),
                reason: "Collection name must not contain '/'".to_string(),
            });
        }

        Ok(())
    }
}
