//! Bearer-authenticated access to the backend's resource endpoints

use serde::de::DeserializeOwned;

use crate::auth::api::error_message;
use crate::auth::SessionStore;
use crate::config::ApiConfig;
use crate::error::{Error, Result};

const DEFAULT_REQUEST_ERROR: &str = "Request failed";

/// Reads resources (`/quiz`, `/users`, ...) with the stored bearer token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api: ApiConfig,
    store: SessionStore,
}

impl ApiClient {
    pub fn new(api: ApiConfig, store: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            api,
            store,
        }
    }

    /// GET `path` and decode the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self
            .store
            .read_token()
            .filter(|t| !t.is_empty())
            .ok_or(Error::NotAuthenticated)?;
        let url = self.api.url(path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::info!("GET {} failed with status {}", url, status);
            return Err(Error::Request(error_message(&body, DEFAULT_REQUEST_ERROR)));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
