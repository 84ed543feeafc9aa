//! EUID (European Unique Identifier, BRIS) derivation.
//!
//! One code path decides EUID for every supported country: a static,
//! declarative table maps a country code to the identifier types that can
//! seed an EUID, a pure formatting function, and the registry snapshot the
//! formatter needs (currently only Germany, for the register court code).
//! Adding a country is a table entry, not a new branch.

use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::result::EnrichmentResult;
use crate::models::{
    IdentifierStatus, IdentifierType, NewIdentifier, RegistrySnapshot, RegistrySource,
};
use crate::store::{EnrichmentStore, InsertOutcome};
use tracing::debug;

type EuidFormatter = fn(IdentifierType, &str, Option<&RegistrySnapshot>) -> Option<String>;

pub struct EuidRule {
    pub country: &'static str,
    /// Acceptable seed identifiers, scanned in declared order.
    pub sources: &'static [IdentifierType],
    /// Snapshot the formatter needs, if any.
    pub registry_source: Option<RegistrySource>,
    pub format: EuidFormatter,
}

use IdentifierType::{Bce, Cif, Crn, Cvr, Hra, Hrb, Kbo, Kvk, Rcs, Rea, Siren};

/// Per-country EUID formatting rules.
pub static EUID_RULES: &[EuidRule] = &[
    EuidRule { country: "NL", sources: &[Kvk], registry_source: None, format: euid_nl },
    EuidRule { country: "BE", sources: &[Kbo, Bce], registry_source: None, format: euid_be },
    EuidRule {
        country: "DE",
        sources: &[Hrb, Hra],
        registry_source: Some(RegistrySource::German),
        format: euid_de,
    },
    EuidRule { country: "FR", sources: &[Siren, Rcs], registry_source: None, format: euid_fr },
    EuidRule { country: "LU", sources: &[Rcs], registry_source: None, format: euid_lu },
    EuidRule { country: "IE", sources: &[Crn], registry_source: None, format: euid_ie },
    EuidRule { country: "ES", sources: &[Cif], registry_source: None, format: euid_es },
    EuidRule { country: "IT", sources: &[Rea], registry_source: None, format: euid_it },
    EuidRule { country: "DK", sources: &[Cvr], registry_source: None, format: euid_dk },
    EuidRule { country: "SE", sources: &[Crn], registry_source: None, format: euid_se },
    EuidRule { country: "FI", sources: &[Crn], registry_source: None, format: euid_fi },
    EuidRule { country: "AT", sources: &[Crn], registry_source: None, format: euid_at },
    EuidRule { country: "PL", sources: &[Crn], registry_source: None, format: euid_pl },
    EuidRule { country: "PT", sources: &[Crn], registry_source: None, format: euid_pt },
    EuidRule { country: "EE", sources: &[Crn], registry_source: None, format: euid_ee },
    EuidRule { country: "LV", sources: &[Crn], registry_source: None, format: euid_lv },
    EuidRule { country: "LT", sources: &[Crn], registry_source: None, format: euid_lt },
];

pub fn rule_for(country: &str) -> Option<&'static EuidRule> {
    EUID_RULES.iter().find(|rule| rule.country == country)
}

/// Derive the EUID for any country. Early-returns `exists`/`not_available`
/// when inapplicable, so the orchestrator can run it unconditionally.
pub async fn enrich_euid(
    ctx: &EnrichmentContext,
    store: &dyn EnrichmentStore,
) -> EnrichmentResult {
    if ctx.has(IdentifierType::Euid) {
        return EnrichmentResult::exists(IdentifierType::Euid);
    }

    let Some(rule) = rule_for(&ctx.country) else {
        return EnrichmentResult::not_available(
            IdentifierType::Euid,
            format!("no EUID format configured for country {}", ctx.country),
        );
    };

    let Some((source_type, value)) = ctx.first_present(rule.sources) else {
        let expected: Vec<&str> = rule.sources.iter().map(|t| t.as_str()).collect();
        return EnrichmentResult::not_available(
            IdentifierType::Euid,
            format!(
                "no source identifier available (expected one of {})",
                expected.join(", ")
            ),
        );
    };

    // Some countries need registry data before the EUID can be formatted;
    // absent data is a soft skip, never a guess.
    let snapshot = match rule.registry_source {
        Some(source) => match store.latest_snapshot(ctx.legal_entity_id, source).await {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => {
                return EnrichmentResult::not_available(
                    IdentifierType::Euid,
                    format!("requires {} registry data which has not been fetched", source),
                );
            }
            Err(e) => return EnrichmentResult::error(IdentifierType::Euid, e.to_string()),
        },
        None => None,
    };

    let Some(euid) = (rule.format)(source_type, value, snapshot.as_ref()) else {
        return EnrichmentResult::not_available(
            IdentifierType::Euid,
            format!("could not format an EUID from {} {}", source_type, value),
        );
    };

    debug!(country = %ctx.country, source = %source_type, euid = %euid, "Derived EUID");

    let insert = store
        .insert_identifier(NewIdentifier {
            legal_entity_id: ctx.legal_entity_id,
            identifier_type: IdentifierType::Euid,
            value: euid.clone(),
            status: IdentifierStatus::Derived,
            provenance: format!("Formatted from {} {}", source_type, value),
        })
        .await;

    match insert {
        Ok(InsertOutcome::Inserted) => EnrichmentResult::added(IdentifierType::Euid, euid),
        Ok(InsertOutcome::AlreadyExists) => EnrichmentResult::exists(IdentifierType::Euid),
        Err(e) => EnrichmentResult::error(IdentifierType::Euid, e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers. Each returns None on malformed input; the caller maps
// that to `not_available`, never to an error.

fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_exact(value: &str, width: usize) -> Option<String> {
    let d = digits(value);
    if d.is_empty() || d.len() > width {
        return None;
    }
    Some(format!("{:0>width$}", d))
}

fn alnum_upper(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn euid_nl(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("NL.KVK.{}", digits_exact(value, 8)?))
}

fn euid_be(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("BE.KBO.{}", digits_exact(value, 10)?))
}

fn euid_de(
    source: IdentifierType,
    value: &str,
    snapshot: Option<&RegistrySnapshot>,
) -> Option<String> {
    let court = snapshot?.court_code.as_deref()?;
    let register = match source {
        IdentifierType::Hra => "HRA",
        _ => "HRB",
    };
    Some(format!(
        "DE.{}.{}{}",
        alnum_upper(court)?,
        register,
        alnum_upper(value)?
    ))
}

fn euid_fr(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("FR.RCS.{}", digits_exact(value, 9)?))
}

fn euid_lu(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("LU.RCS.{}", alnum_upper(value)?))
}

fn euid_ie(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    let d = digits(value);
    if d.is_empty() {
        return None;
    }
    Some(format!("IE.CRO.{}", d))
}

fn euid_es(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("ES.RMC.{}", alnum_upper(value)?))
}

fn euid_it(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("IT.REA.{}", alnum_upper(value)?))
}

fn euid_dk(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("DK.CVR.{}", digits_exact(value, 8)?))
}

fn euid_se(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("SE.BOL.{}", digits_exact(value, 10)?))
}

fn euid_fi(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("FI.PRH.{}", digits_exact(value, 8)?))
}

fn euid_at(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("AT.FB.{}", alnum_upper(value)?))
}

fn euid_pl(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("PL.KRS.{}", digits_exact(value, 10)?))
}

fn euid_pt(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("PT.RC.{}", digits_exact(value, 9)?))
}

fn euid_ee(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("EE.RIK.{}", digits_exact(value, 8)?))
}

fn euid_lv(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("LV.UR.{}", digits_exact(value, 11)?))
}

fn euid_lt(_: IdentifierType, value: &str, _: Option<&RegistrySnapshot>) -> Option<String> {
    Some(format!("LT.JAR.{}", digits_exact(value, 9)?))
}
