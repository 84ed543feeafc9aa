//! Peppol participant discovery through the Peppol Directory.
//!
//! Same precedence pattern as the LEI lookup, over Peppol's ISO 6523 scheme
//! codes instead of GLEIF authority codes. VAT is scheme-coded per country,
//! so it is resolved through a separate country table.

use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::lei::{unambiguous_name_match, COC_PRIORITY};
use crate::enrichment::result::EnrichmentResult;
use crate::models::{
    IdentifierStatus, IdentifierType, NewIdentifier, RegistrySnapshot, RegistrySource,
};
use crate::registry::{PeppolDirectory, PeppolParticipant};
use crate::store::{EnrichmentStore, InsertOutcome};
use tracing::{debug, warn};

/// ISO 6523 scheme code for a Chamber-of-Commerce identifier type.
fn coc_scheme(identifier_type: IdentifierType) -> Option<&'static str> {
    match identifier_type {
        IdentifierType::Kvk => Some("0106"),
        IdentifierType::Kbo | IdentifierType::Bce => Some("0208"),
        IdentifierType::Siren => Some("0002"),
        IdentifierType::Cvr => Some("0096"),
        IdentifierType::Crn => Some("0195"),
        _ => None,
    }
}

/// Per-country Peppol VAT scheme code (the 99xx EAS range).
fn vat_scheme(country: &str) -> Option<&'static str> {
    match country {
        "NL" => Some("9944"),
        "BE" => Some("9925"),
        "DE" => Some("9930"),
        "FR" => Some("9957"),
        "LU" => Some("9938"),
        "IE" => Some("9935"),
        "ES" => Some("9920"),
        "IT" => Some("9906"),
        "DK" => Some("9902"),
        "SE" => Some("9955"),
        "FI" => Some("9931"),
        "AT" => Some("9914"),
        "PL" => Some("9945"),
        "PT" => Some("9946"),
        _ => None,
    }
}

pub async fn enrich_peppol(
    ctx: &EnrichmentContext,
    store: &dyn EnrichmentStore,
    directory: &dyn PeppolDirectory,
) -> EnrichmentResult {
    if ctx.has(IdentifierType::Peppol) {
        return EnrichmentResult::exists(IdentifierType::Peppol);
    }

    // First CoC identifier with a scheme mapping, then VAT, then name search.
    let keyed_lookup = COC_PRIORITY
        .iter()
        .find_map(|ty| {
            let value = ctx.value_of(*ty)?;
            let scheme = coc_scheme(*ty)?;
            Some((*ty, scheme, value))
        })
        .or_else(|| {
            let value = ctx.value_of(IdentifierType::Vat)?;
            let scheme = vat_scheme(&ctx.country)?;
            Some((IdentifierType::Vat, scheme, value))
        });

    let (participant, provenance) = if let Some((source_type, scheme, value)) = keyed_lookup {
        match directory.lookup(scheme, value).await {
            Ok(Some(participant)) => (
                participant,
                format!("Peppol Directory lookup by {} (scheme {})", source_type, scheme),
            ),
            Ok(None) => {
                return EnrichmentResult::not_available(
                    IdentifierType::Peppol,
                    format!(
                        "no Peppol participant registered under scheme {} for {} {}",
                        scheme, source_type, value
                    ),
                );
            }
            Err(e) => return EnrichmentResult::error(IdentifierType::Peppol, e.to_string()),
        }
    } else {
        let candidates = match directory.search_by_name(&ctx.name, &ctx.country).await {
            Ok(candidates) => candidates,
            Err(e) => return EnrichmentResult::error(IdentifierType::Peppol, e.to_string()),
        };
        let count = candidates.len();
        let matched = unambiguous_name_match(&ctx.name, &candidates, |p: &PeppolParticipant| {
            p.name.as_deref().unwrap_or("")
        });
        match matched {
            Some(participant) => (
                participant.clone(),
                format!("Peppol Directory name search for \"{}\"", ctx.name),
            ),
            None if count == 0 => {
                return EnrichmentResult::not_available(
                    IdentifierType::Peppol,
                    format!("no Peppol participant found for \"{}\"", ctx.name),
                );
            }
            None => {
                return EnrichmentResult::not_available(
                    IdentifierType::Peppol,
                    format!(
                        "ambiguous Peppol name search: {} candidates, none an exact match",
                        count
                    ),
                );
            }
        }
    };

    debug!(
        legal_entity_id = %ctx.legal_entity_id,
        participant = %participant.participant_id,
        "Found Peppol participant"
    );

    // Keep the directory response as a snapshot next to the identifier.
    let snapshot = RegistrySnapshot {
        legal_entity_id: ctx.legal_entity_id,
        source: RegistrySource::Peppol,
        name: participant.name.clone(),
        legal_form: None,
        address: None,
        city: None,
        postal_code: None,
        status: None,
        court_code: None,
        register_number: None,
        rsin: None,
        registration_date: None,
        raw: serde_json::json!({
            "participantID": participant.participant_id,
            "name": participant.name,
            "countryCode": participant.country,
        }),
        fetched_at: chrono::Utc::now(),
    };
    if let Err(e) = store.upsert_snapshot(snapshot).await {
        warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "Failed to store Peppol snapshot");
    }

    let insert = store
        .insert_identifier(NewIdentifier {
            legal_entity_id: ctx.legal_entity_id,
            identifier_type: IdentifierType::Peppol,
            value: participant.participant_id.clone(),
            status: IdentifierStatus::Valid,
            provenance,
        })
        .await;

    match insert {
        Ok(InsertOutcome::Inserted) => {
            EnrichmentResult::added(IdentifierType::Peppol, participant.participant_id)
        }
        Ok(InsertOutcome::AlreadyExists) => EnrichmentResult::exists(IdentifierType::Peppol),
        Err(e) => EnrichmentResult::error(IdentifierType::Peppol, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vat_scheme_covers_the_core_countries() {
        assert_eq!(vat_scheme("NL"), Some("9944"));
        assert_eq!(vat_scheme("BE"), Some("9925"));
        assert_eq!(vat_scheme("DE"), Some("9930"));
        assert_eq!(vat_scheme("US"), None);
    }

    #[test]
    fn kvk_maps_to_the_dutch_scheme() {
        assert_eq!(coc_scheme(IdentifierType::Kvk), Some("0106"));
        assert_eq!(coc_scheme(IdentifierType::Hrb), None);
    }
}
