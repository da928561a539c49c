//! Unified application error model and mapping helpers.
//! This module provides the common error enum returned by the session, auth and API layers,
//! along with helpers the presentation side uses to pick a dialog for it.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Client-side field validation; never reaches the network.
    Validation { code: String, message: String },
    /// Login/register/profile failed or returned an unusable body.
    Auth { code: String, message: String },
    /// A resource endpoint answered 401.
    Unauthorized { code: String, message: String },
    /// Any other non-2xx or undecodable response from a resource endpoint.
    Api { code: String, message: String },
    /// The request never completed.
    Network { code: String, message: String },
    /// Durable storage read/write failed.
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Api { code, .. }
            | AppError::Network { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::Api { message, .. }
            | AppError::Network { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn unauthorized<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthorized { code: code.into(), message: msg.into() } }
    pub fn api<S: Into<String>>(code: S, msg: S) -> Self { AppError::Api { code: code.into(), message: msg.into() } }
    pub fn network<S: Into<String>>(code: S, msg: S) -> Self { AppError::Network { code: code.into(), message: msg.into() } }
    pub fn storage<S: Into<String>>(code: S, msg: S) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn is_unauthorized(&self) -> bool { matches!(self, AppError::Unauthorized { .. }) }

    /// Title of the single-acknowledgment modal that surfaces this error.
    pub fn dialog_title(&self) -> &'static str {
        match self {
            AppError::Network { .. } => "Error de Conexión",
            AppError::Auth { .. } | AppError::Unauthorized { .. } => "Error de Autenticación",
            AppError::Validation { .. } => "Datos inválidos",
            _ => "Error",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Api { code: "malformed_response".into(), message: err.to_string() };
        }
        AppError::Network { code: "network_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal { code: "json_error".into(), message: err.to_string() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
