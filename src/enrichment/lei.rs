//! LEI discovery through GLEIF.
//!
//! Works from whichever Chamber-of-Commerce identifier is available, in a
//! fixed precedence order; falls back to a company-name search with strict
//! disambiguation. The precedence order is kept for compatibility with the
//! existing data and carries no meaning beyond tie-breaking.

use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::result::EnrichmentResult;
use crate::models::{
    IdentifierStatus, IdentifierType, NewIdentifier, RegistrySnapshot, RegistrySource,
};
use crate::registry::{LeiRecord, LeiRegistry};
use crate::store::{EnrichmentStore, InsertOutcome};
use tracing::{debug, warn};

/// Chamber-of-Commerce identifier precedence for registry-number lookups.
pub const COC_PRIORITY: &[IdentifierType] = &[
    IdentifierType::Kvk,
    IdentifierType::Hrb,
    IdentifierType::Hra,
    IdentifierType::Kbo,
    IdentifierType::Bce,
    IdentifierType::Crn,
    IdentifierType::Rcs,
    IdentifierType::Siren,
    IdentifierType::Rea,
    IdentifierType::Cif,
    IdentifierType::Cvr,
    IdentifierType::Chr,
];

/// GLEIF registration-authority code for a national register.
fn registration_authority(identifier_type: IdentifierType) -> Option<&'static str> {
    match identifier_type {
        IdentifierType::Kvk => Some("RA000463"),
        IdentifierType::Hrb | IdentifierType::Hra => Some("RA000242"),
        IdentifierType::Kbo | IdentifierType::Bce => Some("RA000035"),
        IdentifierType::Crn => Some("RA000585"),
        IdentifierType::Rcs => Some("RA000432"),
        IdentifierType::Siren => Some("RA000189"),
        IdentifierType::Rea => Some("RA000407"),
        IdentifierType::Cif => Some("RA000524"),
        IdentifierType::Cvr => Some("RA000170"),
        IdentifierType::Chr => Some("RA000548"),
        _ => None,
    }
}

/// Lowercase and strip everything non-alphanumeric, so "Acme B.V." and
/// "ACME BV" compare equal but "Acme Holding B.V." does not.
pub fn normalize_company_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Disambiguate a name search: exactly one candidate is accepted as-is;
/// among several, only a single exact normalized match wins. Anything else
/// is ambiguous and the caller must skip, never guess.
pub fn unambiguous_name_match<'a, T>(
    query: &str,
    candidates: &'a [T],
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    match candidates {
        [] => None,
        [single] => Some(single),
        many => {
            let wanted = normalize_company_name(query);
            let mut exact = many
                .iter()
                .filter(|c| normalize_company_name(name_of(c)) == wanted);
            match (exact.next(), exact.next()) {
                (Some(hit), None) => Some(hit),
                _ => None,
            }
        }
    }
}

pub async fn enrich_lei(
    ctx: &EnrichmentContext,
    store: &dyn EnrichmentStore,
    gleif: &dyn LeiRegistry,
) -> EnrichmentResult {
    if ctx.has(IdentifierType::Lei) {
        return EnrichmentResult::exists(IdentifierType::Lei);
    }

    let (record, provenance) = if let Some((source_type, number)) = ctx.first_present(COC_PRIORITY)
    {
        let Some(authority) = registration_authority(source_type) else {
            return EnrichmentResult::not_available(
                IdentifierType::Lei,
                format!("no GLEIF registration authority mapped for {}", source_type),
            );
        };
        match gleif.lookup_by_registration(authority, number).await {
            Ok(Some(record)) => (
                record,
                format!("GLEIF lookup by {} {}", source_type, number),
            ),
            Ok(None) => {
                return EnrichmentResult::not_available(
                    IdentifierType::Lei,
                    format!("no LEI registered for {} {}", source_type, number),
                );
            }
            Err(e) => return EnrichmentResult::error(IdentifierType::Lei, e.to_string()),
        }
    } else {
        let candidates = match gleif.search_by_name(&ctx.name).await {
            Ok(candidates) => candidates,
            Err(e) => return EnrichmentResult::error(IdentifierType::Lei, e.to_string()),
        };
        let count = candidates.len();
        match unambiguous_name_match(&ctx.name, &candidates, |r: &LeiRecord| &r.legal_name) {
            Some(record) => (
                record.clone(),
                format!("GLEIF name search for \"{}\"", ctx.name),
            ),
            None if count == 0 => {
                return EnrichmentResult::not_available(
                    IdentifierType::Lei,
                    format!("no GLEIF record found for \"{}\"", ctx.name),
                );
            }
            None => {
                return EnrichmentResult::not_available(
                    IdentifierType::Lei,
                    format!(
                        "ambiguous GLEIF name search: {} candidates, none an exact match for \"{}\"",
                        count, ctx.name
                    ),
                );
            }
        }
    };

    debug!(legal_entity_id = %ctx.legal_entity_id, lei = %record.lei, "Found LEI");

    // Keep the richest GLEIF response alongside the identifier.
    let snapshot = RegistrySnapshot {
        legal_entity_id: ctx.legal_entity_id,
        source: RegistrySource::Gleif,
        name: Some(record.legal_name.clone()),
        legal_form: None,
        address: None,
        city: None,
        postal_code: None,
        status: record.status.clone(),
        court_code: None,
        register_number: None,
        rsin: None,
        registration_date: None,
        raw: record.raw.clone(),
        fetched_at: chrono::Utc::now(),
    };
    if let Err(e) = store.upsert_snapshot(snapshot).await {
        warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "Failed to store GLEIF snapshot");
    }

    let insert = store
        .insert_identifier(NewIdentifier {
            legal_entity_id: ctx.legal_entity_id,
            identifier_type: IdentifierType::Lei,
            value: record.lei.clone(),
            status: IdentifierStatus::Valid,
            provenance,
        })
        .await;

    match insert {
        Ok(InsertOutcome::Inserted) => EnrichmentResult::added(IdentifierType::Lei, record.lei),
        Ok(InsertOutcome::AlreadyExists) => EnrichmentResult::exists(IdentifierType::Lei),
        Err(e) => EnrichmentResult::error(IdentifierType::Lei, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_company_name("Acme B.V."), "acmebv");
        assert_eq!(normalize_company_name("ACME  BV"), "acmebv");
        assert_ne!(
            normalize_company_name("Acme Holding B.V."),
            normalize_company_name("Acme B.V.")
        );
    }

    #[test]
    fn single_candidate_is_accepted() {
        let candidates = vec!["Acme Holding B.V.".to_string()];
        let hit = unambiguous_name_match("Acme B.V.", &candidates, |s: &String| s.as_str());
        assert_eq!(hit, Some(&candidates[0]));
    }

    #[test]
    fn multiple_candidates_require_exact_normalized_match() {
        let candidates = vec!["Acme B.V.".to_string(), "Acme Holding B.V.".to_string()];
        let hit = unambiguous_name_match("Acme B.V.", &candidates, |s: &String| s.as_str());
        assert_eq!(hit, Some(&candidates[0]));
    }

    #[test]
    fn ambiguous_partial_matches_are_rejected() {
        let candidates = vec![
            "Acme Holding B.V.".to_string(),
            "Acme Beheer B.V.".to_string(),
        ];
        assert_eq!(
            unambiguous_name_match("Acme B.V.", &candidates, |s: &String| s.as_str()),
            None
        );
    }

    #[test]
    fn duplicate_exact_matches_are_ambiguous() {
        let candidates = vec!["Acme B.V.".to_string(), "ACME BV".to_string()];
        assert_eq!(
            unambiguous_name_match("Acme B.V.", &candidates, |s: &String| s.as_str()),
            None
        );
    }

    #[test]
    fn every_coc_type_has_an_authority() {
        for ty in COC_PRIORITY {
            assert!(
                registration_authority(*ty).is_some(),
                "{} has no registration authority",
                ty
            );
        }
    }

    proptest::proptest! {
        #[test]
        fn normalization_is_idempotent_and_lowercase(name in "[ -~]{0,40}") {
            let normalized = normalize_company_name(&name);
            proptest::prop_assert_eq!(&normalize_company_name(&normalized), &normalized);
            proptest::prop_assert!(normalized.chars().all(|c| c.is_alphanumeric() && !c.is_uppercase()));
        }
    }
}
