//! Denormalized per-registry snapshots.
//!
//! One row per (legal entity, source registry): the richest response received
//! from that registry so far. Re-fetching upserts rather than appends, so
//! there is at most one active snapshot per pair. The orchestrator's field
//! sync reads from here, never from a live response.

use crate::registry::CompanyRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Source registry a snapshot was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistrySource {
    Kvk,
    /// German Handelsregister.
    German,
    /// Belgian KBO/BCE.
    Belgian,
    Gleif,
    Vies,
    Peppol,
    Eori,
}

impl RegistrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kvk => "KVK",
            Self::German => "HANDELSREGISTER",
            Self::Belgian => "KBO",
            Self::Gleif => "GLEIF",
            Self::Vies => "VIES",
            Self::Peppol => "PEPPOL",
            Self::Eori => "EORI",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "KVK" => Some(Self::Kvk),
            "HANDELSREGISTER" => Some(Self::German),
            "KBO" => Some(Self::Belgian),
            "GLEIF" => Some(Self::Gleif),
            "VIES" => Some(Self::Vies),
            "PEPPOL" => Some(Self::Peppol),
            "EORI" => Some(Self::Eori),
            _ => None,
        }
    }
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the richest response from one registry for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub legal_entity_id: Uuid,
    pub source: RegistrySource,
    pub name: Option<String>,
    pub legal_form: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub status: Option<String>,
    /// German register court code (e.g. "B1601R"), required for the DE EUID.
    pub court_code: Option<String>,
    pub register_number: Option<String>,
    /// RSIN as reported by the KVK registry.
    pub rsin: Option<String>,
    pub registration_date: Option<NaiveDate>,
    /// Raw response payload as received.
    pub raw: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    /// Build a snapshot from a normalized company record.
    pub fn from_record(
        legal_entity_id: Uuid,
        source: RegistrySource,
        record: &CompanyRecord,
    ) -> Self {
        Self {
            legal_entity_id,
            source,
            name: record.name.clone(),
            legal_form: record.legal_form.clone(),
            address: record.address.clone(),
            city: record.city.clone(),
            postal_code: record.postal_code.clone(),
            status: record.status.clone(),
            court_code: record.court_code.clone(),
            register_number: record.registry_number.clone(),
            rsin: record.rsin.clone(),
            registration_date: record.registration_date,
            raw: record.raw.clone(),
            fetched_at: Utc::now(),
        }
    }

    /// RSIN from the structured column, falling back to the raw payload.
    pub fn rsin_value(&self) -> Option<String> {
        if let Some(ref rsin) = self.rsin {
            return Some(rsin.clone());
        }
        self.raw
            .get("rsin")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}
