//! Per-country derivation modules.
//!
//! Each jurisdiction registers a strategy implementing [`CountryModule`];
//! the orchestrator dispatches by country code. Errors never cross the
//! module boundary: every step is converted to an `EnrichmentResult`.

pub mod be;
pub mod de;
pub mod nl;

use crate::config::EnrichmentConfig;
use crate::enrichment::context::EnrichmentContext;
use crate::enrichment::result::EnrichmentResult;
use crate::registry::Registries;
use crate::store::EnrichmentStore;
use async_trait::async_trait;
use std::collections::HashMap;

/// Shared collaborators handed to every module invocation.
pub struct ModuleDeps<'a> {
    pub store: &'a dyn EnrichmentStore,
    pub registries: &'a Registries,
    pub config: &'a EnrichmentConfig,
}

/// What a country module produced.
#[derive(Debug, Default)]
pub struct CountryOutcome {
    pub results: Vec<EnrichmentResult>,
    /// Set when a national registry snapshot was fetched during this run
    /// (surfaced to the caller for Germany).
    pub registry_fetched: bool,
}

#[async_trait]
pub trait CountryModule: Send + Sync {
    fn country(&self) -> &'static str;

    async fn enrich(&self, ctx: &EnrichmentContext, deps: &ModuleDeps<'_>) -> CountryOutcome;
}

/// The registered strategies. Adding a jurisdiction means adding an entry
/// here plus (usually) an EUID table row.
pub fn country_modules() -> HashMap<&'static str, Box<dyn CountryModule>> {
    let modules: Vec<Box<dyn CountryModule>> = vec![
        Box::new(nl::DutchModule),
        Box::new(de::GermanModule),
        Box::new(be::BelgianModule),
    ];
    modules.into_iter().map(|m| (m.country(), m)).collect()
}
