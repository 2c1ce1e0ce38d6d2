use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': '{value}' - {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Store returned {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Short message suitable for showing next to a form.
    pub fn user_friendly_message(&self) -> String {
        match self {
            StoreError::ApiError(e) if e.is_timeout() => {
                "The store did not answer in time".to_string()
            }
            StoreError::ApiError(_) => "Could not reach the store".to_string(),
            StoreError::ConfigError { message } => format!("Configuration problem: {}", message),
            StoreError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value '{}' is invalid: {}", field, reason)
            }
            StoreError::AuthError { message } => message.clone(),
            StoreError::NotFound { .. } => "That record no longer exists".to_string(),
            StoreError::PermissionDenied { .. } => {
                "You do not have permission to do that".to_string()
            }
            StoreError::ValidationError { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
