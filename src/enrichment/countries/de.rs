//! Germany: Handelsregister search.
//!
//! Searches by register number when HRB/HRA is already known, otherwise by
//! company name — and only a single unambiguous hit is accepted. The snapshot
//! is stored for later use; the EUID is deliberately NOT produced here but by
//! the generic EUID module, which knows how to source the court code from the
//! snapshot.

use super::{CountryModule, CountryOutcome, ModuleDeps};
use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::result::EnrichmentResult;
use crate::models::{IdentifierStatus, IdentifierType, NewIdentifier, RegistrySnapshot, RegistrySource};
use crate::registry::CompanyRecord;
use crate::store::InsertOutcome;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct GermanModule;

#[async_trait]
impl CountryModule for GermanModule {
    fn country(&self) -> &'static str {
        "DE"
    }

    async fn enrich(&self, ctx: &EnrichmentContext, deps: &ModuleDeps<'_>) -> CountryOutcome {
        let mut outcome = CountryOutcome::default();

        let known = ctx
            .value_of(IdentifierType::Hrb)
            .map(|v| (IdentifierType::Hrb, v))
            .or_else(|| ctx.value_of(IdentifierType::Hra).map(|v| (IdentifierType::Hra, v)));

        let record = if let Some((_, number)) = known {
            match deps.registries.handelsregister.search_by_number(number).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    outcome.results.push(EnrichmentResult::not_available(
                        known.map(|(ty, _)| ty).unwrap_or(IdentifierType::Hrb),
                        format!("register number {} not found in the Handelsregister", number),
                    ));
                    return outcome;
                }
                Err(e) => {
                    outcome.results.push(EnrichmentResult::error(
                        known.map(|(ty, _)| ty).unwrap_or(IdentifierType::Hrb),
                        e.to_string(),
                    ));
                    return outcome;
                }
            }
        } else {
            match deps.registries.handelsregister.search_by_name(&ctx.name).await {
                Ok(candidates) => match single_match(candidates) {
                    Ok(record) => record,
                    Err(result) => {
                        outcome.results.push(result);
                        return outcome;
                    }
                },
                Err(e) => {
                    outcome
                        .results
                        .push(EnrichmentResult::error(IdentifierType::Hrb, e.to_string()));
                    return outcome;
                }
            }
        };

        debug!(
            legal_entity_id = %ctx.legal_entity_id,
            register_number = ?record.registry_number,
            court_code = ?record.court_code,
            "Fetched Handelsregister record"
        );

        let snapshot =
            RegistrySnapshot::from_record(ctx.legal_entity_id, RegistrySource::German, &record);
        if let Err(e) = deps.store.upsert_snapshot(snapshot).await {
            warn!(
                legal_entity_id = %ctx.legal_entity_id,
                error = %e,
                "Failed to store Handelsregister snapshot"
            );
        } else {
            outcome.registry_fetched = true;
        }

        // For an already-known number, report under the type the entity
        // actually holds; the gateway record may omit its own register type.
        if let Some((known_type, _)) = known {
            outcome.results.push(EnrichmentResult::exists(known_type));
            return outcome;
        }

        let register_type = match record.register_type.as_deref() {
            Some("HRA") => IdentifierType::Hra,
            _ => IdentifierType::Hrb,
        };

        let Some(number) = record.registry_number.clone() else {
            outcome.results.push(EnrichmentResult::not_available(
                register_type,
                "Handelsregister record carries no register number",
            ));
            return outcome;
        };

        let insert = deps
            .store
            .insert_identifier(NewIdentifier {
                legal_entity_id: ctx.legal_entity_id,
                identifier_type: register_type,
                value: number.clone(),
                status: IdentifierStatus::Valid,
                provenance: format!("Handelsregister name search for \"{}\"", ctx.name),
            })
            .await;

        outcome.results.push(match insert {
            Ok(InsertOutcome::Inserted) => EnrichmentResult::added(register_type, number),
            Ok(InsertOutcome::AlreadyExists) => EnrichmentResult::exists(register_type),
            Err(e) => EnrichmentResult::error(register_type, e.to_string()),
        });
        outcome
    }
}

/// Name search acceptance: exactly one hit, anything else is reported, not
/// guessed.
fn single_match(mut candidates: Vec<CompanyRecord>) -> Result<CompanyRecord, EnrichmentResult> {
    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(EnrichmentResult::not_available(
            IdentifierType::Hrb,
            "no Handelsregister match for the company name",
        )),
        n => Err(EnrichmentResult::not_available(
            IdentifierType::Hrb,
            format!("ambiguous Handelsregister name search: {} matches", n),
        )),
    }
}
