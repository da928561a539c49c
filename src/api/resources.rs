use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiClient, MutationReceipt};
use crate::error::AppResult;
use crate::identity::SessionContext;

pub const RESOURCES_PATH: &str = "/resources";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Video,
    Documento,
    Articulo,
    Audio,
    Otro,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] =
        [ResourceType::Video, ResourceType::Documento, ResourceType::Articulo, ResourceType::Audio, ResourceType::Otro];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Video => "video",
            ResourceType::Documento => "documento",
            ResourceType::Articulo => "articulo",
            ResourceType::Audio => "audio",
            ResourceType::Otro => "otro",
        }
    }

    pub fn parse(s: &str) -> Option<ResourceType> {
        let s = s.trim().to_lowercase();
        ResourceType::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub type_resource: ResourceType,
    #[serde(default)]
    pub url_resource: Option<String>,
    pub created_by_user_email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Resource {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok().map(|d| d.with_timezone(&Utc))
    }
}

/// Body of `POST /resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub type_resource: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_resource: Option<String>,
}

/// Resources whose title, detail or type name contains `term`, ignoring case.
pub fn filter_resources<'a>(resources: &'a [Resource], term: &str) -> Vec<&'a Resource> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return resources.iter().collect();
    }
    resources
        .iter()
        .filter(|r| {
            r.title.to_lowercase().contains(&term)
                || r.detail.as_deref().map(|d| d.to_lowercase().contains(&term)).unwrap_or(false)
                || r.type_resource.as_str().contains(&term)
        })
        .collect()
}

#[derive(Clone)]
pub struct ResourcesApi {
    api: ApiClient,
    session: SessionContext,
}

impl ResourcesApi {
    pub fn new(api: ApiClient, session: SessionContext) -> Self { Self { api, session } }

    pub async fn list(&self) -> AppResult<Vec<Resource>> {
        let sent = self.api.session_store().token();
        self.session.observe(sent.as_deref(), self.api.get::<Vec<Resource>>(RESOURCES_PATH).await)
    }

    pub async fn create(&self, payload: &ResourcePayload) -> AppResult<MutationReceipt> {
        let sent = self.api.session_store().token();
        let res = self.api.post::<_, MutationReceipt>(RESOURCES_PATH, payload).await;
        let receipt = self.session.observe(sent.as_deref(), res)?;
        info!(target: "api", "resource created id={:?}", receipt.id);
        Ok(receipt)
    }
}
