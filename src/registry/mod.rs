//! External registry collaborators.
//!
//! The enrichment engine talks to every registry through the traits in this
//! module; the concrete reqwest clients in the submodules are thin reference
//! implementations. All transport and parse failures surface as
//! [`RegistryError::Unavailable`] and are handled identically by the engine
//! (captured as an `error` result, never propagated).

pub mod branding;
pub mod gleif;
pub mod handelsregister;
pub mod kbo;
pub mod kvk;
pub mod peppol;
pub mod vies;

use crate::config::EnrichmentConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use gleif::GleifClient;
pub use peppol::PeppolDirectoryClient;
pub use vies::ViesClient;

/// Failure modes of an external registry call.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached or answered with a server failure.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The registry answered but the response could not be interpreted.
    #[error("unexpected registry response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Normalized company record returned by a national registry client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub registry_number: Option<String>,
    pub name: Option<String>,
    pub legal_form: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub status: Option<String>,
    /// German register court code, when the source is the Handelsregister.
    pub court_code: Option<String>,
    /// "HRB" or "HRA", when the source is the Handelsregister.
    pub register_type: Option<String>,
    /// RSIN, when the source is the KVK registry.
    pub rsin: Option<String>,
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// VIES validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VatValidation {
    pub is_valid: bool,
    pub trader_name: Option<String>,
    pub trader_address: Option<String>,
}

/// GLEIF LEI record, reduced to what the engine consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeiRecord {
    pub lei: String,
    pub legal_name: String,
    pub jurisdiction: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Peppol Directory participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeppolParticipant {
    /// Full scheme-qualified participant id, e.g. "0106:12345678".
    pub participant_id: String,
    pub name: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// A national company registry (KVK, Handelsregister, KBO, ...).
#[async_trait]
pub trait CompanyRegistry: Send + Sync {
    /// Look up a company by its registry number. `Ok(None)` means not found.
    async fn search_by_number(&self, number: &str)
        -> Result<Option<CompanyRecord>, RegistryError>;

    /// Best-effort name search; may return zero or many candidates.
    async fn search_by_name(&self, name: &str) -> Result<Vec<CompanyRecord>, RegistryError>;
}

/// EU VIES VAT validation.
#[async_trait]
pub trait VatValidator: Send + Sync {
    /// Validate `number` (without country prefix) against `country`.
    async fn validate(&self, country: &str, number: &str)
        -> Result<VatValidation, RegistryError>;
}

/// GLEIF LEI registry.
#[async_trait]
pub trait LeiRegistry: Send + Sync {
    /// Look up by (GLEIF registration-authority code, local registry number).
    async fn lookup_by_registration(
        &self,
        authority: &str,
        number: &str,
    ) -> Result<Option<LeiRecord>, RegistryError>;

    async fn search_by_name(&self, name: &str) -> Result<Vec<LeiRecord>, RegistryError>;
}

/// Peppol Directory.
#[async_trait]
pub trait PeppolDirectory: Send + Sync {
    /// Look up a participant by (scheme code, identifier value).
    async fn lookup(
        &self,
        scheme: &str,
        value: &str,
    ) -> Result<Option<PeppolParticipant>, RegistryError>;

    async fn search_by_name(
        &self,
        name: &str,
        country: &str,
    ) -> Result<Vec<PeppolParticipant>, RegistryError>;
}

/// Logo discovery from a company web domain. Side enrichment, best-effort.
#[async_trait]
pub trait LogoFinder: Send + Sync {
    async fn find_logo(&self, domain: &str) -> Result<Option<String>, RegistryError>;
}

/// The full set of registry collaborators handed to the orchestrator.
#[derive(Clone)]
pub struct Registries {
    pub kvk: Arc<dyn CompanyRegistry>,
    pub handelsregister: Arc<dyn CompanyRegistry>,
    /// Public KBO interface, always available.
    pub kbo_public: Arc<dyn CompanyRegistry>,
    /// Paid structured KBO API, wired only when configured.
    pub kbo_api: Option<Arc<dyn CompanyRegistry>>,
    pub vies: Arc<dyn VatValidator>,
    pub gleif: Arc<dyn LeiRegistry>,
    pub peppol: Arc<dyn PeppolDirectory>,
    pub logos: Arc<dyn LogoFinder>,
}

/// Wire the reference clients from the environment.
///
/// `KVK_API_KEY` and `HANDELSREGISTER_BASE_URL` select the national clients;
/// the KBO paid API is attached when the config enables it.
pub fn default_registries(config: &EnrichmentConfig) -> anyhow::Result<Registries> {
    use anyhow::Context;

    let timeout = config.registry_timeout;
    let kvk_api_key = std::env::var("KVK_API_KEY").unwrap_or_default();
    let hr_base = std::env::var("HANDELSREGISTER_BASE_URL")
        .context("HANDELSREGISTER_BASE_URL must point at the Handelsregister gateway")?;

    let kbo_api: Option<Arc<dyn CompanyRegistry>> = match (&config.kbo_api_key, config.kbo_api_enabled)
    {
        (Some(key), true) => Some(Arc::new(kbo::KboApiClient::new(key.clone(), timeout)?)),
        _ => None,
    };

    Ok(Registries {
        kvk: Arc::new(kvk::KvkClient::new(kvk_api_key, timeout)?),
        handelsregister: Arc::new(handelsregister::HandelsregisterClient::new(hr_base, timeout)?),
        kbo_public: Arc::new(kbo::KboPublicClient::new(timeout)?),
        kbo_api,
        vies: Arc::new(vies::ViesClient::new(timeout)?),
        gleif: Arc::new(gleif::GleifClient::new(timeout)?),
        peppol: Arc::new(peppol::PeppolDirectoryClient::new(timeout)?),
        logos: Arc::new(branding::LogoClient::new(timeout)?),
    })
}
