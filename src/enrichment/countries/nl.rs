//! Netherlands: the KVK → RSIN → VAT derivation chain.
//!
//! The RSIN comes from KVK registry data — the cached snapshot (including its
//! raw payload) is consulted before any live call. The VAT number is derived
//! as `NL + RSIN + B01` and validated through VIES; when B01 is rejected the
//! fiscal-unit suffix `B02` is tried once before giving up.

use super::{CountryModule, CountryOutcome, ModuleDeps};
use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::result::EnrichmentResult;
use crate::models::{IdentifierStatus, IdentifierType, NewIdentifier, RegistrySnapshot, RegistrySource};
use crate::store::InsertOutcome;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct DutchModule;

#[async_trait]
impl CountryModule for DutchModule {
    fn country(&self) -> &'static str {
        "NL"
    }

    async fn enrich(&self, ctx: &EnrichmentContext, deps: &ModuleDeps<'_>) -> CountryOutcome {
        let mut outcome = CountryOutcome::default();

        let (rsin_result, rsin_value) = derive_rsin(ctx, deps).await;
        outcome.results.push(rsin_result);

        outcome
            .results
            .push(derive_vat(ctx, deps, rsin_value.as_deref()).await);

        outcome
    }
}

/// RSIN derivation. Returns the RSIN value alongside the result so the VAT
/// step can use it without re-reading the store.
async fn derive_rsin(
    ctx: &EnrichmentContext,
    deps: &ModuleDeps<'_>,
) -> (EnrichmentResult, Option<String>) {
    if let Some(existing) = ctx.value_of(IdentifierType::Rsin) {
        return (
            EnrichmentResult::exists(IdentifierType::Rsin),
            Some(existing.to_string()),
        );
    }

    // Cached KVK snapshot first; only hit the live registry when the cache
    // has nothing to offer.
    let cached = match deps
        .store
        .latest_snapshot(ctx.legal_entity_id, RegistrySource::Kvk)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => return (EnrichmentResult::error(IdentifierType::Rsin, e.to_string()), None),
    };

    let rsin = match cached.as_ref().and_then(RegistrySnapshot::rsin_value) {
        Some(rsin) => {
            debug!(legal_entity_id = %ctx.legal_entity_id, "RSIN taken from cached KVK snapshot");
            Some(rsin)
        }
        None => {
            let Some(kvk) = ctx.value_of(IdentifierType::Kvk) else {
                return (
                    EnrichmentResult::not_available(
                        IdentifierType::Rsin,
                        "requires a KVK number to consult the KVK registry",
                    ),
                    None,
                );
            };
            match deps.registries.kvk.search_by_number(kvk).await {
                Ok(Some(record)) => {
                    let rsin = record.rsin.clone();
                    let snapshot = RegistrySnapshot::from_record(
                        ctx.legal_entity_id,
                        RegistrySource::Kvk,
                        &record,
                    );
                    if let Err(e) = deps.store.upsert_snapshot(snapshot).await {
                        warn!(
                            legal_entity_id = %ctx.legal_entity_id,
                            error = %e,
                            "Failed to store KVK snapshot"
                        );
                    }
                    rsin
                }
                Ok(None) => {
                    return (
                        EnrichmentResult::not_available(
                            IdentifierType::Rsin,
                            format!("KVK {} not found in the registry", kvk),
                        ),
                        None,
                    );
                }
                Err(e) => {
                    return (
                        EnrichmentResult::error(IdentifierType::Rsin, e.to_string()),
                        None,
                    );
                }
            }
        }
    };

    let Some(rsin) = rsin else {
        return (
            EnrichmentResult::not_available(
                IdentifierType::Rsin,
                "KVK registry data carries no RSIN for this entity",
            ),
            None,
        );
    };

    let insert = deps
        .store
        .insert_identifier(NewIdentifier {
            legal_entity_id: ctx.legal_entity_id,
            identifier_type: IdentifierType::Rsin,
            value: rsin.clone(),
            status: IdentifierStatus::Derived,
            provenance: "Derived from KVK registry data".to_string(),
        })
        .await;

    match insert {
        Ok(InsertOutcome::Inserted) => (
            EnrichmentResult::added(IdentifierType::Rsin, rsin.clone()),
            Some(rsin),
        ),
        Ok(InsertOutcome::AlreadyExists) => (
            EnrichmentResult::exists(IdentifierType::Rsin),
            Some(rsin),
        ),
        Err(e) => (EnrichmentResult::error(IdentifierType::Rsin, e.to_string()), None),
    }
}

/// Dutch VAT numbers are `NL` + nine-digit RSIN + `B` + two-digit suffix.
/// B01 is the default; B02 is the fiscal-unit convention.
const VAT_SUFFIXES: [&str; 2] = ["B01", "B02"];

async fn derive_vat(
    ctx: &EnrichmentContext,
    deps: &ModuleDeps<'_>,
    rsin: Option<&str>,
) -> EnrichmentResult {
    if let Some(existing) = ctx.value_of(IdentifierType::Vat) {
        refresh_vat_status(ctx, deps, existing).await;
        return EnrichmentResult::exists(IdentifierType::Vat);
    }

    let Some(rsin) = rsin else {
        return EnrichmentResult::not_available(
            IdentifierType::Vat,
            "requires an RSIN to derive the VAT number",
        );
    };

    let rsin_digits: String = rsin.chars().filter(|c| c.is_ascii_digit()).collect();
    if rsin_digits.is_empty() || rsin_digits.len() > 9 {
        return EnrichmentResult::not_available(
            IdentifierType::Vat,
            format!("RSIN {} is not a valid nine-digit number", rsin),
        );
    }
    let rsin9 = format!("{:0>9}", rsin_digits);

    for suffix in VAT_SUFFIXES {
        let number = format!("{}{}", rsin9, suffix);
        match deps.registries.vies.validate("NL", &number).await {
            Ok(validation) if validation.is_valid => {
                let vat = format!("NL{}", number);
                store_vies_snapshot(ctx, deps, &vat, &validation).await;
                let insert = deps
                    .store
                    .insert_identifier(NewIdentifier {
                        legal_entity_id: ctx.legal_entity_id,
                        identifier_type: IdentifierType::Vat,
                        value: vat.clone(),
                        status: IdentifierStatus::Valid,
                        provenance: format!("Derived from RSIN, validated via VIES ({})", suffix),
                    })
                    .await;
                return match insert {
                    Ok(InsertOutcome::Inserted) => {
                        EnrichmentResult::added(IdentifierType::Vat, vat)
                    }
                    Ok(InsertOutcome::AlreadyExists) => {
                        EnrichmentResult::exists(IdentifierType::Vat)
                    }
                    Err(e) => EnrichmentResult::error(IdentifierType::Vat, e.to_string()),
                };
            }
            // Rejected; try the next suffix.
            Ok(_) => continue,
            Err(e) => return EnrichmentResult::error(IdentifierType::Vat, e.to_string()),
        }
    }

    EnrichmentResult::not_available(
        IdentifierType::Vat,
        format!("VIES rejected both NL{}B01 and NL{}B02", rsin9, rsin9),
    )
}

/// Keep the VIES confirmation (trader name/address) as a snapshot next to
/// the derived VAT number. Best-effort, like every snapshot write.
async fn store_vies_snapshot(
    ctx: &EnrichmentContext,
    deps: &ModuleDeps<'_>,
    vat: &str,
    validation: &crate::registry::VatValidation,
) {
    let snapshot = RegistrySnapshot {
        legal_entity_id: ctx.legal_entity_id,
        source: RegistrySource::Vies,
        name: validation.trader_name.clone(),
        legal_form: None,
        address: validation.trader_address.clone(),
        city: None,
        postal_code: None,
        status: Some("VALID".to_string()),
        court_code: None,
        register_number: None,
        rsin: None,
        registration_date: None,
        raw: serde_json::json!({
            "vatNumber": vat,
            "valid": true,
            "name": validation.trader_name,
            "address": validation.trader_address,
        }),
        fetched_at: chrono::Utc::now(),
    };
    if let Err(e) = deps.store.upsert_snapshot(snapshot).await {
        warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "Failed to store VIES snapshot");
    }
}

/// On re-run, refresh the validation status of an existing VAT number.
/// Best-effort: a VIES outage must not affect the result.
async fn refresh_vat_status(ctx: &EnrichmentContext, deps: &ModuleDeps<'_>, vat: &str) {
    let number = vat.strip_prefix("NL").unwrap_or(vat);
    match deps.registries.vies.validate("NL", number).await {
        Ok(validation) => {
            let status = if validation.is_valid {
                IdentifierStatus::Valid
            } else {
                IdentifierStatus::Invalid
            };
            if let Err(e) = deps
                .store
                .refresh_identifier_status(ctx.legal_entity_id, IdentifierType::Vat, status)
                .await
            {
                warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "Failed to refresh VAT status");
            }
        }
        Err(e) => {
            warn!(legal_entity_id = %ctx.legal_entity_id, error = %e, "VIES revalidation skipped");
        }
    }
}
