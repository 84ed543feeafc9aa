//! Legal entity read/write surface of the enrichment engine.
//!
//! The entity record is owned by the CRUD layer; enrichment only reads the
//! country and name and writes back a small set of fields when a fresher
//! registry snapshot is available.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member company as seen by the enrichment engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalEntity {
    pub id: Uuid,
    pub name: String,
    /// ISO-3166 alpha-2 country code, uppercase.
    pub country: String,
    pub domain: Option<String>,
    pub legal_form: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub logo_url: Option<String>,
}

/// Candidate values for the "sync entity fields from registry data" step.
/// `None` means "leave the column alone"; the store reports back which
/// fields actually changed.
#[derive(Debug, Clone, Default)]
pub struct EntityFieldUpdate {
    pub name: Option<String>,
    pub legal_form: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub registration_date: Option<NaiveDate>,
}

impl EntityFieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.legal_form.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
            && self.registration_date.is_none()
    }
}
