//! The enrichment orchestrator: one entry point, fixed module order,
//! per-module fault isolation.

use crate::config::EnrichmentConfig;
use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::countries::{country_modules, CountryModule, ModuleDeps};
use crate::enrichment::result::{EnrichmentResult, EnrichmentStatus, EnrichmentSummary};
use crate::enrichment::{branding, euid, lei, peppol, sync};
use crate::error::EnrichError;
use crate::models::{IdentifierType, LegalEntity};
use crate::registry::Registries;
use crate::store::EnrichmentStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct EnrichmentService {
    store: Arc<dyn EnrichmentStore>,
    registries: Registries,
    config: EnrichmentConfig,
    countries: HashMap<&'static str, Box<dyn CountryModule>>,
}

impl EnrichmentService {
    pub fn new(
        store: Arc<dyn EnrichmentStore>,
        registries: Registries,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            store,
            registries,
            config,
            countries: country_modules(),
        }
    }

    /// Run one best-effort enrichment pass over a legal entity.
    ///
    /// Only a missing entity is fatal; every module failure is captured as an
    /// `error` result and the remaining modules still run. Steps are ordered
    /// because later ones read identifiers written by earlier ones (NL chain
    /// and HRB/HRA before EUID, KVK snapshot before field sync).
    pub async fn enrich(&self, legal_entity_id: Uuid) -> Result<EnrichmentSummary, EnrichError> {
        let entity = self
            .store
            .load_entity(legal_entity_id)
            .await?
            .ok_or(EnrichError::EntityNotFound(legal_entity_id))?;

        info!(
            legal_entity_id = %legal_entity_id,
            country = %entity.country,
            name = %entity.name,
            "Starting enrichment run"
        );

        let mut ctx = self.context(&entity).await?;
        let deps = ModuleDeps {
            store: self.store.as_ref(),
            registries: &self.registries,
            config: &self.config,
        };

        let mut results: Vec<EnrichmentResult> = Vec::new();
        let mut german_registry_fetched = false;

        // 1. Country-specific chain first: it may write identifiers the
        //    generic modules depend on.
        if let Some(module) = self.countries.get(ctx.country.as_str()) {
            let outcome = module.enrich(&ctx, &deps).await;
            german_registry_fetched = outcome.registry_fetched;
            results.extend(outcome.results);
            ctx = self.context(&entity).await?;
        }

        // 2. Every run reports a VAT outcome, even where no country module
        //    covers the jurisdiction.
        ensure_vat_result(&ctx, &mut results);

        // 3. Generic EUID: one code path for all configured countries.
        results.push(euid::enrich_euid(&ctx, self.store.as_ref()).await);

        // 4/5. Global lookups.
        results.push(lei::enrich_lei(&ctx, self.store.as_ref(), self.registries.gleif.as_ref()).await);
        results.push(
            peppol::enrich_peppol(&ctx, self.store.as_ref(), self.registries.peppol.as_ref())
                .await,
        );

        // 6. NL only: field sync from the freshest KVK data.
        let mut updated_fields = Vec::new();
        if ctx.country == "NL" {
            match sync::sync_from_kvk(&entity, &ctx, self.store.as_ref(), &self.registries).await {
                Ok(changed) => updated_fields = changed,
                Err(e) => {
                    warn!(legal_entity_id = %legal_entity_id, error = %e, "KVK field sync failed");
                }
            }
        }

        // 7. Branding, best-effort.
        let (logo_fetched, logo_url) =
            branding::enrich_branding(&entity, self.store.as_ref(), self.registries.logos.as_ref())
                .await;

        let summary = EnrichmentSummary {
            company_details_updated: !updated_fields.is_empty(),
            updated_fields,
            logo_fetched,
            logo_url,
            german_registry_fetched,
            results,
        };

        info!(
            legal_entity_id = %legal_entity_id,
            added = summary.bucket(EnrichmentStatus::Added).len(),
            errors = summary.bucket(EnrichmentStatus::Error).len(),
            "Enrichment run finished"
        );
        Ok(summary)
    }

    async fn context(&self, entity: &LegalEntity) -> Result<EnrichmentContext, EnrichError> {
        let identifiers = self.store.active_identifiers(entity.id).await?;
        Ok(EnrichmentContext::new(entity, identifiers))
    }
}

/// VAT is only auto-derived inside the NL (via VIES) and BE (from KBO)
/// modules; everywhere else the caller still gets an explicit outcome.
fn ensure_vat_result(ctx: &EnrichmentContext, results: &mut Vec<EnrichmentResult>) {
    if results.iter().any(|r| r.identifier == IdentifierType::Vat) {
        return;
    }
    if ctx.has(IdentifierType::Vat) {
        results.push(EnrichmentResult::exists(IdentifierType::Vat));
    } else {
        results.push(EnrichmentResult::not_available(
            IdentifierType::Vat,
            format!(
                "VAT cannot be derived automatically for country {}; only NL (from RSIN) and BE (from KBO) support derivation",
                ctx.country
            ),
        ));
    }
}
