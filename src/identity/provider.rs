use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::session::Session;
use super::user::{Role, User};
use crate::api::{server_message, ApiClient};
use crate::error::{AppError, AppResult};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const PROFILE_PATH: &str = "/auth/profile";

const LOGIN_FALLBACK: &str = "Error al iniciar sesión";
const REGISTER_FALLBACK: &str = "Error al registrar usuario";
const PROFILE_FALLBACK: &str = "Error al obtener perfil de usuario";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

// Password stays out of logs.
impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterCredentials {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apellido: Option<String>,
    pub role: Role,
}

impl std::fmt::Debug for RegisterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterCredentials")
            .field("email", &self.email)
            .field("nombre", &self.nombre)
            .field("apellido", &self.apellido)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /auth/login` as sent by the server. Nothing is assumed present;
/// `into_session` decides whether it is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    pub fn into_session(self) -> AppResult<Session> {
        let reason = self.message.clone().filter(|m| !m.trim().is_empty());
        match (self.user, self.token.filter(|t| !t.is_empty())) {
            (Some(user), Some(token)) => Ok(Session { user, token }),
            (None, Some(_)) => Err(AppError::auth("missing_user".to_string(), reason.unwrap_or_else(|| LOGIN_FALLBACK.to_string()))),
            (Some(_), None) => Err(AppError::auth("missing_token".to_string(), reason.unwrap_or_else(|| LOGIN_FALLBACK.to_string()))),
            (None, None) => Err(AppError::auth("invalid_credentials".to_string(), reason.unwrap_or_else(|| LOGIN_FALLBACK.to_string()))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: Option<String>,
    pub user: Option<User>,
}

impl<'de> Deserialize<'de> for RegisterResponse {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            success: Option<bool>,
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            user: Option<User>,
        }
        let w = Wire::deserialize(d)?;
        // servers that omit `success` signal it by returning the created user
        let success = w.success.unwrap_or(w.user.is_some());
        Ok(RegisterResponse { success, message: w.message, user: w.user })
    }
}

/// Remote authority that issues sessions.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> AppResult<AuthResponse>;
    async fn register(&self, credentials: &RegisterCredentials) -> AppResult<RegisterResponse>;
    async fn fetch_profile(&self) -> AppResult<User>;
}

/// `AuthProvider` over the REST API. One request per call, no retries.
#[derive(Clone)]
pub struct HttpAuthProvider {
    api: ApiClient,
}

impl HttpAuthProvider {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub fn api(&self) -> &ApiClient { &self.api }
}

fn auth_error(status: reqwest::StatusCode, body: &str, fallback: &str) -> AppError {
    let msg = server_message(body).unwrap_or_else(|| fallback.to_string());
    AppError::auth(format!("http_{}", status.as_u16()), msg)
}

fn decode<T: serde::de::DeserializeOwned>(body: &str, fallback: &str) -> AppResult<T> {
    serde_json::from_str::<T>(body).map_err(|e| {
        warn!(target: "auth", "malformed auth response: {}", e);
        AppError::auth("malformed_response".to_string(), fallback.to_string())
    })
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn login(&self, credentials: &LoginCredentials) -> AppResult<AuthResponse> {
        debug!(target: "auth", "auth.login email={}", credentials.email);
        let (status, body) = self.api.post_raw(LOGIN_PATH, credentials).await?;
        if !status.is_success() {
            return Err(auth_error(status, &body, LOGIN_FALLBACK));
        }
        decode(&body, LOGIN_FALLBACK)
    }

    async fn register(&self, credentials: &RegisterCredentials) -> AppResult<RegisterResponse> {
        debug!(target: "auth", "auth.register email={} role={}", credentials.email, credentials.role);
        let (status, body) = self.api.post_raw(REGISTER_PATH, credentials).await?;
        if !status.is_success() {
            return Err(auth_error(status, &body, REGISTER_FALLBACK));
        }
        decode(&body, REGISTER_FALLBACK)
    }

    async fn fetch_profile(&self) -> AppResult<User> {
        let (status, body) = self.api.get_raw(PROFILE_PATH).await?;
        if !status.is_success() {
            return Err(auth_error(status, &body, PROFILE_FALLBACK));
        }
        decode(&body, PROFILE_FALLBACK)
    }
}
