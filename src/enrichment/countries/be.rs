//! Belgium: KBO lookup and deterministic VAT derivation.
//!
//! An existing KBO/BCE number is required — name search over the public KBO
//! interface is unreliable and is skipped outright with that reasoning. The
//! paid structured API is preferred when configured, with the public
//! interface as fallback. Belgian VAT numbers are definitionally the KBO
//! number with the country prefix, so VAT derivation needs no external
//! validation call (unlike NL).

use super::{CountryModule, CountryOutcome, ModuleDeps};
use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::result::EnrichmentResult;
use crate::models::{IdentifierStatus, IdentifierType, NewIdentifier, RegistrySnapshot, RegistrySource};
use crate::store::InsertOutcome;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct BelgianModule;

#[async_trait]
impl CountryModule for BelgianModule {
    fn country(&self) -> &'static str {
        "BE"
    }

    async fn enrich(&self, ctx: &EnrichmentContext, deps: &ModuleDeps<'_>) -> CountryOutcome {
        let mut outcome = CountryOutcome::default();

        let kbo = ctx
            .value_of(IdentifierType::Kbo)
            .or_else(|| ctx.value_of(IdentifierType::Bce));

        let Some(kbo) = kbo else {
            outcome.results.push(EnrichmentResult::not_available(
                IdentifierType::Kbo,
                "name search on the public KBO interface is unreliable; a KBO number must be registered first",
            ));
            outcome.results.push(EnrichmentResult::not_available(
                IdentifierType::Vat,
                "requires a KBO number (Belgian VAT is the KBO number with BE prefix)",
            ));
            return outcome;
        };

        let Some(kbo10) = normalize_kbo(kbo) else {
            outcome.results.push(EnrichmentResult::not_available(
                IdentifierType::Kbo,
                format!("{} is not a valid ten-digit KBO number", kbo),
            ));
            outcome.results.push(EnrichmentResult::not_available(
                IdentifierType::Vat,
                "requires a well-formed KBO number",
            ));
            return outcome;
        };

        outcome.results.push(EnrichmentResult::exists(IdentifierType::Kbo));
        fetch_snapshot(ctx, deps, &kbo10).await;
        outcome.results.push(derive_vat(ctx, deps, &kbo10).await);
        outcome
    }
}

/// KBO numbers are ten digits, usually written as 0XXX.XXX.XXX.
fn normalize_kbo(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > 10 {
        return None;
    }
    Some(format!("{:0>10}", digits))
}

/// Refresh the Belgian registry snapshot, preferring the paid structured API.
/// Snapshot failures never affect the VAT derivation.
async fn fetch_snapshot(ctx: &EnrichmentContext, deps: &ModuleDeps<'_>, kbo: &str) {
    let record = match (&deps.registries.kbo_api, deps.config.kbo_api_enabled) {
        (Some(api), true) => match api.search_by_number(kbo).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(
                    legal_entity_id = %ctx.legal_entity_id,
                    error = %e,
                    "Paid KBO API failed, falling back to the public interface"
                );
                deps.registries.kbo_public.search_by_number(kbo).await
            }
        },
        _ => deps.registries.kbo_public.search_by_number(kbo).await,
    };

    match record {
        Ok(Some(record)) => {
            debug!(legal_entity_id = %ctx.legal_entity_id, kbo = %kbo, "Fetched KBO record");
            let snapshot = RegistrySnapshot::from_record(
                ctx.legal_entity_id,
                RegistrySource::Belgian,
                &record,
            );
            if let Err(e) = deps.store.upsert_snapshot(snapshot).await {
                warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "Failed to store KBO snapshot");
            }
        }
        Ok(None) => {
            warn!(legal_entity_id = %ctx.legal_entity_id, kbo = %kbo, "KBO number not found in the registry");
        }
        Err(e) => {
            warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "KBO registry unavailable");
        }
    }
}

async fn derive_vat(
    ctx: &EnrichmentContext,
    deps: &ModuleDeps<'_>,
    kbo10: &str,
) -> EnrichmentResult {
    if ctx.has(IdentifierType::Vat) {
        return EnrichmentResult::exists(IdentifierType::Vat);
    }

    let vat = format!("BE{}", kbo10);
    let insert = deps
        .store
        .insert_identifier(NewIdentifier {
            legal_entity_id: ctx.legal_entity_id,
            identifier_type: IdentifierType::Vat,
            value: vat.clone(),
            status: IdentifierStatus::Derived,
            provenance: "Belgian VAT is the KBO number with BE prefix".to_string(),
        })
        .await;

    match insert {
        Ok(InsertOutcome::Inserted) => EnrichmentResult::added(IdentifierType::Vat, vat),
        Ok(InsertOutcome::AlreadyExists) => EnrichmentResult::exists(IdentifierType::Vat),
        Err(e) => EnrichmentResult::error(IdentifierType::Vat, e.to_string()),
    }
}
