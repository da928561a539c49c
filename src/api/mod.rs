//! Generic JSON client for the ConectaTech REST API.
//!
//! Every request carries `Authorization: Bearer <token>` when the session store holds a
//! token; the token is read at send time so login/logout take effect on the next call.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::storage::SessionStore;

pub mod contacts;
pub mod resources;

pub use contacts::{ContactsApi, filter_contacts};
pub use resources::{ResourcesApi, filter_resources};

/// Body returned by the create endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: Option<i64>,
}

/// Pull a server-supplied `message` out of an error body, if it has one.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("message")
        .or_else(|| v.get("error"))
        .and_then(|m| m.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Clone)]
pub struct ApiClient {
    base: String,
    client: reqwest::Client,
    store: SessionStore,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig, store: SessionStore) -> AppResult<Self> {
        let base = cfg.api_base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| AppError::internal("invalid_base_url".to_string(), format!("{}: {}", base, e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::internal("http_client".to_string(), e.to_string()))?;
        Ok(Self { base, client, store })
    }

    pub fn base_url(&self) -> &str { &self.base }

    pub fn session_store(&self) -> &SessionStore { &self.store }

    /// Absolute URL for an API path; the base path prefix is preserved.
    pub fn endpoint(&self, path: &str) -> AppResult<Url> {
        let full = format!("{}/{}", self.base, path.trim_start_matches('/'));
        Url::parse(&full).map_err(|e| AppError::internal("invalid_url".to_string(), format!("{}: {}", full, e)))
    }

    fn request(&self, method: Method, path: &str) -> AppResult<reqwest::RequestBuilder> {
        let url = self.endpoint(path)?;
        let mut req = self.client.request(method, url);
        if let Some(token) = self.store.token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| AppError::internal("invalid_token", "stored token is not a valid header value"))?;
            req = req.header(AUTHORIZATION, value);
        }
        Ok(req)
    }

    /// Send and return the raw status and body; transport failures map to `Network`.
    pub(crate) async fn send_raw(&self, req: reqwest::RequestBuilder, path: &str) -> AppResult<(StatusCode, String)> {
        let resp = req.send().await.map_err(|e| {
            warn!(target: "api", "request to {} failed: {}", path, e);
            AppError::network("network_error".to_string(), e.to_string())
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| AppError::network("network_error".to_string(), e.to_string()))?;
        debug!(target: "api", "{} -> {}", path, status.as_u16());
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder, path: &str) -> AppResult<T> {
        let (status, body) = self.send_raw(req, path).await?;
        if status == StatusCode::UNAUTHORIZED {
            warn!(target: "api", "{} answered 401; token expired or invalid", path);
            let msg = server_message(&body).unwrap_or_else(|| "Sesión expirada o inválida.".to_string());
            return Err(AppError::unauthorized("http_401".to_string(), msg));
        }
        if !status.is_success() {
            let msg = server_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(AppError::api(format!("http_{}", status.as_u16()), msg));
        }
        serde_json::from_str::<T>(&body)
            .map_err(|e| AppError::api("malformed_response".to_string(), format!("{}: {}", path, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let req = self.request(Method::GET, path)?;
        self.send_json(req, path).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let req = self.request(Method::POST, path)?.json(body);
        self.send_json(req, path).await
    }

    /// POST returning the raw outcome; the auth endpoints interpret bodies themselves.
    pub(crate) async fn post_raw<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AppResult<(StatusCode, String)> {
        let req = self.request(Method::POST, path)?.json(body);
        self.send_raw(req, path).await
    }

    pub(crate) async fn get_raw(&self, path: &str) -> AppResult<(StatusCode, String)> {
        let req = self.request(Method::GET, path)?;
        self.send_raw(req, path).await
    }
}
