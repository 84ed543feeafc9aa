//! Regulatory identifiers attached to a legal entity.
//!
//! Invariant: at most one *active* identifier per (legal entity, type). The
//! store enforces this by checking existing state before every insert and by
//! treating a duplicate-key rejection as "already exists" — never by a plain
//! uniqueness constraint alone, because soft-deleted rows must be excluded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed vocabulary of identifier types known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierType {
    /// Dutch Chamber of Commerce number.
    Kvk,
    /// Dutch legal-entity tax number, the seed for NL VAT derivation.
    Rsin,
    Vat,
    Lei,
    Eori,
    /// European Unique Identifier (BRIS).
    Euid,
    Peppol,
    /// German Handelsregister B (Kapitalgesellschaften).
    Hrb,
    /// German Handelsregister A (Personengesellschaften).
    Hra,
    /// Belgian Kruispuntbank van Ondernemingen number.
    Kbo,
    /// Belgian Banque-Carrefour des Entreprises number (same register as KBO).
    Bce,
    /// UK Companies House registration number.
    Crn,
    /// Luxembourg Registre de Commerce et des Sociétés number.
    Rcs,
    /// French SIREN number.
    Siren,
    /// Italian Repertorio Economico Amministrativo number.
    Rea,
    /// Spanish Código de Identificación Fiscal.
    Cif,
    /// Danish Centrale Virksomhedsregister number.
    Cvr,
    /// Swiss commercial register number.
    Chr,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kvk => "KVK",
            Self::Rsin => "RSIN",
            Self::Vat => "VAT",
            Self::Lei => "LEI",
            Self::Eori => "EORI",
            Self::Euid => "EUID",
            Self::Peppol => "PEPPOL",
            Self::Hrb => "HRB",
            Self::Hra => "HRA",
            Self::Kbo => "KBO",
            Self::Bce => "BCE",
            Self::Crn => "CRN",
            Self::Rcs => "RCS",
            Self::Siren => "SIREN",
            Self::Rea => "REA",
            Self::Cif => "CIF",
            Self::Cvr => "CVR",
            Self::Chr => "CHR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "KVK" => Some(Self::Kvk),
            "RSIN" => Some(Self::Rsin),
            "VAT" => Some(Self::Vat),
            "LEI" => Some(Self::Lei),
            "EORI" => Some(Self::Eori),
            "EUID" => Some(Self::Euid),
            "PEPPOL" => Some(Self::Peppol),
            "HRB" => Some(Self::Hrb),
            "HRA" => Some(Self::Hra),
            "KBO" => Some(Self::Kbo),
            "BCE" => Some(Self::Bce),
            "CRN" => Some(Self::Crn),
            "RCS" => Some(Self::Rcs),
            "SIREN" => Some(Self::Siren),
            "REA" => Some(Self::Rea),
            "CIF" => Some(Self::Cif),
            "CVR" => Some(Self::Cvr),
            "CHR" => Some(Self::Chr),
            _ => None,
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation/verification state of an identifier value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierStatus {
    Pending,
    /// Confirmed against the issuing registry (e.g. VIES said yes).
    Valid,
    /// Confirmed by a human or a verified document.
    Verified,
    Invalid,
    /// Computed from another identifier without external confirmation.
    Derived,
}

impl IdentifierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Valid => "VALID",
            Self::Verified => "VERIFIED",
            Self::Invalid => "INVALID",
            Self::Derived => "DERIVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "VALID" => Some(Self::Valid),
            "VERIFIED" => Some(Self::Verified),
            "INVALID" => Some(Self::Invalid),
            "DERIVED" => Some(Self::Derived),
            _ => None,
        }
    }
}

impl fmt::Display for IdentifierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An active (legal entity, type, value) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub id: Uuid,
    pub legal_entity_id: Uuid,
    pub identifier_type: IdentifierType,
    pub value: String,
    pub status: IdentifierStatus,
    /// How the value was obtained, for the audit trail.
    pub provenance: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a newly discovered identifier.
#[derive(Debug, Clone)]
pub struct NewIdentifier {
    pub legal_entity_id: Uuid,
    pub identifier_type: IdentifierType,
    pub value: String,
    pub status: IdentifierStatus,
    pub provenance: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_type_round_trips_through_strings() {
        for ty in [
            IdentifierType::Kvk,
            IdentifierType::Rsin,
            IdentifierType::Euid,
            IdentifierType::Bce,
            IdentifierType::Chr,
        ] {
            assert_eq!(IdentifierType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(IdentifierType::parse("kvk"), Some(IdentifierType::Kvk));
        assert_eq!(IdentifierType::parse("BSN"), None);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(
            IdentifierStatus::parse("derived"),
            Some(IdentifierStatus::Derived)
        );
        assert_eq!(IdentifierStatus::parse("unknown"), None);
    }
}
