//! Result and summary contract all derivation modules report through.

use crate::models::IdentifierType;
use serde::Serialize;
use std::fmt::Write as _;

/// Outcome of one attempted identifier derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// A new identifier row was written.
    Added,
    /// An active identifier of this type was already present.
    Exists,
    /// Nothing to do: missing source identifier, inapplicable country,
    /// ambiguous match. Not a failure.
    NotAvailable,
    /// An external call or store write failed; the rest of the run continued.
    Error,
}

/// One result per identifier type attempted during a run.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentResult {
    pub identifier: IdentifierType,
    pub status: EnrichmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EnrichmentResult {
    pub fn added(identifier: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            identifier,
            status: EnrichmentStatus::Added,
            value: Some(value.into()),
            message: None,
        }
    }

    pub fn exists(identifier: IdentifierType) -> Self {
        Self {
            identifier,
            status: EnrichmentStatus::Exists,
            value: None,
            message: None,
        }
    }

    pub fn not_available(identifier: IdentifierType, message: impl Into<String>) -> Self {
        Self {
            identifier,
            status: EnrichmentStatus::NotAvailable,
            value: None,
            message: Some(message.into()),
        }
    }

    pub fn error(identifier: IdentifierType, message: impl Into<String>) -> Self {
        Self {
            identifier,
            status: EnrichmentStatus::Error,
            value: None,
            message: Some(message.into()),
        }
    }
}

/// Aggregate returned to the caller; reflected into the store only as the
/// side effects the modules already performed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub results: Vec<EnrichmentResult>,
    pub company_details_updated: bool,
    pub updated_fields: Vec<String>,
    pub logo_fetched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub german_registry_fetched: bool,
}

impl EnrichmentSummary {
    pub fn bucket(&self, status: EnrichmentStatus) -> Vec<&EnrichmentResult> {
        self.results
            .iter()
            .filter(|r| r.status == status)
            .collect()
    }

    /// Human-readable per-bucket rendering for the admin response.
    pub fn overview(&self) -> String {
        let mut out = String::new();
        for (status, label) in [
            (EnrichmentStatus::Added, "Added"),
            (EnrichmentStatus::Exists, "Already present"),
            (EnrichmentStatus::NotAvailable, "Not available"),
            (EnrichmentStatus::Error, "Failed"),
        ] {
            let bucket = self.bucket(status);
            if bucket.is_empty() {
                continue;
            }
            let rendered: Vec<String> = bucket
                .iter()
                .map(|r| match (&r.value, &r.message) {
                    (Some(value), _) => format!("{} ({})", r.identifier, value),
                    (None, Some(message)) => format!("{} — {}", r.identifier, message),
                    (None, None) => r.identifier.to_string(),
                })
                .collect();
            let _ = writeln!(out, "{}: {}", label, rendered.join(", "));
        }
        if !self.updated_fields.is_empty() {
            let _ = writeln!(out, "Updated fields: {}", self.updated_fields.join(", "));
        }
        if self.logo_fetched {
            let _ = writeln!(
                out,
                "Logo: {}",
                self.logo_url.as_deref().unwrap_or("fetched")
            );
        }
        out
    }
}
