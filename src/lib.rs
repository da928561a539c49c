pub mod error;
pub mod config;
pub mod storage;
pub mod identity;
pub mod api;
pub mod navigation;
pub mod validation;
pub mod cli;

use std::sync::Arc;

use crate::api::{ApiClient, ContactsApi, ResourcesApi};
use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::identity::{HttpAuthProvider, SessionContext};
use crate::storage::SessionStore;

/// Everything a front end needs, wired from one config: the session context plus the
/// typed endpoints sharing its API client and session store.
#[derive(Clone)]
pub struct Client {
    pub session: SessionContext,
    pub contacts: ContactsApi,
    pub resources: ResourcesApi,
    api: ApiClient,
}

impl Client {
    /// Build and initialize: the stored session (if any) is restored before returning.
    pub fn connect(cfg: &ClientConfig) -> AppResult<Self> {
        Self::with_store(cfg, cfg.session_store())
    }

    /// Same as [`Client::connect`] over a caller-supplied session store.
    pub fn with_store(cfg: &ClientConfig, store: SessionStore) -> AppResult<Self> {
        let api = ApiClient::new(cfg, store.clone())?;
        let auth = Arc::new(HttpAuthProvider::new(api.clone()));
        let session = SessionContext::start(store, auth, cfg.logout_on_unauthorized);
        Ok(Self {
            contacts: ContactsApi::new(api.clone(), session.clone()),
            resources: ResourcesApi::new(api.clone(), session.clone()),
            session,
            api,
        })
    }

    pub fn api(&self) -> &ApiClient { &self.api }
}
