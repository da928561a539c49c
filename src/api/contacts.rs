use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiClient, MutationReceipt};
use crate::error::AppResult;
use crate::identity::SessionContext;

pub const CONTACTS_PATH: &str = "/contacts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactNumber {
    pub id: i64,
    pub numero: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub full_name: String,
    pub boss_name: String,
    pub position: String,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub contact_numbers: Option<Vec<ContactNumber>>,
    pub created_by_user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Contact {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok().map(|d| d.with_timezone(&Utc))
    }

    pub fn numbers(&self) -> impl Iterator<Item = &str> {
        self.contact_numbers.iter().flatten().map(|n| n.numero.as_str())
    }
}

/// Body of `POST /contacts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub full_name: String,
    pub boss_name: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_numbers: Option<Vec<String>>,
}

/// Contacts whose name or vehicle plate contains `term`, ignoring case. A blank term keeps all.
pub fn filter_contacts<'a>(contacts: &'a [Contact], term: &str) -> Vec<&'a Contact> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return contacts.iter().collect();
    }
    contacts
        .iter()
        .filter(|c| {
            c.full_name.to_lowercase().contains(&term)
                || c.vehicle.as_ref().map(|v| v.plate.to_lowercase().contains(&term)).unwrap_or(false)
        })
        .collect()
}

#[derive(Clone)]
pub struct ContactsApi {
    api: ApiClient,
    session: SessionContext,
}

impl ContactsApi {
    pub fn new(api: ApiClient, session: SessionContext) -> Self { Self { api, session } }

    pub async fn list(&self) -> AppResult<Vec<Contact>> {
        let sent = self.api.session_store().token();
        self.session.observe(sent.as_deref(), self.api.get::<Vec<Contact>>(CONTACTS_PATH).await)
    }

    pub async fn create(&self, payload: &ContactPayload) -> AppResult<MutationReceipt> {
        let sent = self.api.session_store().token();
        let res = self.api.post::<_, MutationReceipt>(CONTACTS_PATH, payload).await;
        let receipt = self.session.observe(sent.as_deref(), res)?;
        info!(target: "api", "contact created id={:?}", receipt.id);
        Ok(receipt)
    }
}
