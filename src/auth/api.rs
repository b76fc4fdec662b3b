//! Login endpoint client

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::models::{LoginRequest, LoginResponse};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

pub const DEFAULT_LOGIN_ERROR: &str = "Login failed";

/// Exchanges credentials for a bearer token
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Fails with [`Error::LoginFailed`] carrying the server's message when
    /// the credentials are rejected.
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse>;
}

/// [`AuthApi`] over HTTP. No client-side timeout is applied.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    login_url: String,
}

impl HttpAuthApi {
    pub fn new(api: &ApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), api)
    }

    /// Reuse an existing [`reqwest::Client`]
    pub fn with_client(http: reqwest::Client, api: &ApiConfig) -> Self {
        Self {
            http,
            login_url: api.login_url(),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse> {
        tracing::debug!("POST {} as {}", self.login_url, credentials.email);

        let response = self.http.post(&self.login_url).json(credentials).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::info!("Login rejected with status {}", status);
            return Err(Error::LoginFailed(error_message(&body, DEFAULT_LOGIN_ERROR)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Login response has no usable token: {}", e);
            Error::InvalidToken
        })
    }
}

/// Best-effort human readable message from an error response body.
///
/// Looks at `message` (string, or list of strings), then `error`, and falls
/// back to `default`.
pub fn error_message(body: &str, default: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return default.to_string(),
    };

    match value.get("message") {
        Some(Value::String(message)) if !message.trim().is_empty() => {
            return message.clone();
        }
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if !parts.is_empty() {
                return parts.join(", ");
            }
        }
        _ => {}
    }

    match value.get("error") {
        Some(Value::String(error)) if !error.trim().is_empty() => error.clone(),
        _ => default.to_string(),
    }
}
