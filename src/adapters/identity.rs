use crate::config::StoreConfig;
use crate::domain::model::AuthUser;
use crate::domain::ports::AuthProvider;
use crate::utils::error::{Result, StoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// `AuthProvider` over the Identity Toolkit v1 REST surface.
pub struct IdentityToolkitClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl IdentityToolkitClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.auth_endpoint.clone(),
            api_key: config.api_key().map(str::to_string),
        })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        let key = self.api_key.as_deref().ok_or_else(|| StoreError::ConfigError {
            message: "required connection parameter 'api_key' is not set".to_string(),
        })?;

        let segment = format!("accounts:{}", method);
        let mut url = Url::parse(&self.endpoint).map_err(|e| StoreError::ConfigError {
            message: format!("invalid auth endpoint '{}': {}", self.endpoint, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| StoreError::ConfigError {
                message: format!("auth endpoint '{}' cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .extend(["v1", segment.as_str()]);
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }

    async fn password_call(&self, method: &str, email: &str, password: &str) -> Result<AuthUser> {
        let url = self.method_url(method)?;
        tracing::debug!("POST {} for {}", url.path(), email);

        let response = self
            .client
            .post(url)
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or_default();
            tracing::warn!("{} rejected for {}: {} {}", method, email, status, code);

            if status.is_server_error() {
                return Err(StoreError::BackendError {
                    status: status.as_u16(),
                    message: code,
                });
            }
            return Err(StoreError::AuthError {
                message: describe_auth_error(&code),
            });
        }

        let body: PasswordResponse = response.json().await?;
        Ok(AuthUser {
            uid: body.local_id,
            email: if body.email.is_empty() {
                email.to_string()
            } else {
                body.email
            },
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkitClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.password_call("signUp", email, password).await
    }
}

/// Human-readable text for an Identity Toolkit error code. Codes can carry
/// a detail suffix, e.g. `WEAK_PASSWORD : Password should be ...`.
pub fn describe_auth_error(code: &str) -> String {
    let (head, detail) = match code.split_once(" : ") {
        Some((head, detail)) => (head.trim(), Some(detail.trim())),
        None => (code.trim(), None),
    };

    match head {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password".to_string()
        }
        "INVALID_EMAIL" => "That email address is not valid".to_string(),
        "MISSING_PASSWORD" => "Please enter a password".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "EMAIL_EXISTS" => "An account with this email already exists".to_string(),
        "WEAK_PASSWORD" => detail
            .unwrap_or("Password should be at least 6 characters")
            .to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            "Too many failed attempts, please try again later".to_string()
        }
        "" => "Sign-in failed".to_string(),
        other => format!("Sign-in failed ({})", other),
    }
}
