//! Shared test infrastructure: an in-memory store and programmable registry
//! mocks, so the engine's behavior can be exercised without Postgres or the
//! network.

// Each integration test binary compiles this module and uses a subset of it.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use registry_enrichment::config::EnrichmentConfig;
use registry_enrichment::models::{
    EntityFieldUpdate, Identifier, IdentifierStatus, IdentifierType, LegalEntity, NewIdentifier,
    RegistrySnapshot, RegistrySource,
};
use registry_enrichment::registry::{
    CompanyRecord, CompanyRegistry, LeiRecord, LeiRegistry, LogoFinder, PeppolDirectory,
    PeppolParticipant, Registries, RegistryError, VatValidation, VatValidator,
};
use registry_enrichment::store::{EnrichmentStore, InsertOutcome};
use registry_enrichment::EnrichmentService;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// In-memory store

#[derive(Default)]
struct State {
    entities: HashMap<Uuid, LegalEntity>,
    identifiers: Vec<Identifier>,
    snapshots: Vec<RegistrySnapshot>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_entity(&self, entity: LegalEntity) {
        self.inner
            .lock()
            .unwrap()
            .entities
            .insert(entity.id, entity);
    }

    pub fn seed_identifier(&self, legal_entity_id: Uuid, ty: IdentifierType, value: &str) {
        self.inner.lock().unwrap().identifiers.push(Identifier {
            id: Uuid::new_v4(),
            legal_entity_id,
            identifier_type: ty,
            value: value.to_string(),
            status: IdentifierStatus::Verified,
            provenance: Some("seeded by test".to_string()),
            created_at: Utc::now(),
        });
    }

    pub fn seed_snapshot(&self, snapshot: RegistrySnapshot) {
        self.inner.lock().unwrap().snapshots.push(snapshot);
    }

    pub fn identifier_count(&self, legal_entity_id: Uuid, ty: IdentifierType) -> usize {
        self.inner
            .lock()
            .unwrap()
            .identifiers
            .iter()
            .filter(|i| i.legal_entity_id == legal_entity_id && i.identifier_type == ty)
            .count()
    }

    pub fn identifier_value(&self, legal_entity_id: Uuid, ty: IdentifierType) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .identifiers
            .iter()
            .find(|i| i.legal_entity_id == legal_entity_id && i.identifier_type == ty)
            .map(|i| i.value.clone())
    }

    pub fn entity(&self, legal_entity_id: Uuid) -> Option<LegalEntity> {
        self.inner
            .lock()
            .unwrap()
            .entities
            .get(&legal_entity_id)
            .cloned()
    }

    pub fn snapshot(
        &self,
        legal_entity_id: Uuid,
        source: RegistrySource,
    ) -> Option<RegistrySnapshot> {
        self.inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .find(|s| s.legal_entity_id == legal_entity_id && s.source == source)
            .cloned()
    }
}

#[async_trait]
impl EnrichmentStore for MemoryStore {
    async fn load_entity(&self, id: Uuid) -> Result<Option<LegalEntity>> {
        Ok(self.inner.lock().unwrap().entities.get(&id).cloned())
    }

    async fn active_identifiers(&self, legal_entity_id: Uuid) -> Result<Vec<Identifier>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .identifiers
            .iter()
            .filter(|i| i.legal_entity_id == legal_entity_id)
            .cloned()
            .collect())
    }

    async fn insert_identifier(&self, new: NewIdentifier) -> Result<InsertOutcome> {
        let mut state = self.inner.lock().unwrap();
        let exists = state.identifiers.iter().any(|i| {
            i.legal_entity_id == new.legal_entity_id && i.identifier_type == new.identifier_type
        });
        if exists {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.identifiers.push(Identifier {
            id: Uuid::new_v4(),
            legal_entity_id: new.legal_entity_id,
            identifier_type: new.identifier_type,
            value: new.value,
            status: new.status,
            provenance: Some(new.provenance),
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn refresh_identifier_status(
        &self,
        legal_entity_id: Uuid,
        identifier_type: IdentifierType,
        status: IdentifierStatus,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        for identifier in state.identifiers.iter_mut() {
            if identifier.legal_entity_id == legal_entity_id
                && identifier.identifier_type == identifier_type
            {
                identifier.status = status;
            }
        }
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        legal_entity_id: Uuid,
        source: RegistrySource,
    ) -> Result<Option<RegistrySnapshot>> {
        Ok(self.snapshot(legal_entity_id, source))
    }

    async fn upsert_snapshot(&self, snapshot: RegistrySnapshot) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state
            .snapshots
            .retain(|s| !(s.legal_entity_id == snapshot.legal_entity_id && s.source == snapshot.source));
        state.snapshots.push(snapshot);
        Ok(())
    }

    async fn update_entity_fields(
        &self,
        legal_entity_id: Uuid,
        update: EntityFieldUpdate,
    ) -> Result<Vec<String>> {
        let mut state = self.inner.lock().unwrap();
        let Some(entity) = state.entities.get_mut(&legal_entity_id) else {
            return Ok(vec![]);
        };

        let mut changed = Vec::new();
        if let Some(name) = update.name {
            if entity.name != name {
                entity.name = name;
                changed.push("name".to_string());
            }
        }
        if let Some(legal_form) = update.legal_form {
            if entity.legal_form.as_deref() != Some(legal_form.as_str()) {
                entity.legal_form = Some(legal_form);
                changed.push("legal_form".to_string());
            }
        }
        if let Some(address) = update.address {
            if entity.address.as_deref() != Some(address.as_str()) {
                entity.address = Some(address);
                changed.push("address".to_string());
            }
        }
        if let Some(city) = update.city {
            if entity.city.as_deref() != Some(city.as_str()) {
                entity.city = Some(city);
                changed.push("city".to_string());
            }
        }
        if let Some(postal_code) = update.postal_code {
            if entity.postal_code.as_deref() != Some(postal_code.as_str()) {
                entity.postal_code = Some(postal_code);
                changed.push("postal_code".to_string());
            }
        }
        if let Some(date) = update.registration_date {
            if entity.registration_date != Some(date) {
                entity.registration_date = Some(date);
                changed.push("registration_date".to_string());
            }
        }
        Ok(changed)
    }

    async fn set_logo_url(&self, legal_entity_id: Uuid, url: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if let Some(entity) = state.entities.get_mut(&legal_entity_id) {
            entity.logo_url = Some(url.to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry mocks

#[derive(Default)]
pub struct MockCompanyRegistry {
    pub by_number: HashMap<String, CompanyRecord>,
    pub by_name: Vec<CompanyRecord>,
    pub fail: bool,
}

#[async_trait]
impl CompanyRegistry for MockCompanyRegistry {
    async fn search_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CompanyRecord>, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        Ok(self.by_number.get(number).cloned())
    }

    async fn search_by_name(&self, _name: &str) -> Result<Vec<CompanyRecord>, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        Ok(self.by_name.clone())
    }
}

/// Validates any "country:number" pair present in `valid`.
#[derive(Default)]
pub struct MockVies {
    pub valid: HashSet<String>,
    pub fail: bool,
}

#[async_trait]
impl VatValidator for MockVies {
    async fn validate(
        &self,
        country: &str,
        number: &str,
    ) -> Result<VatValidation, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        let is_valid = self.valid.contains(&format!("{}:{}", country, number));
        Ok(VatValidation {
            is_valid,
            trader_name: is_valid.then(|| "Mock Trader".to_string()),
            trader_address: None,
        })
    }
}

#[derive(Default)]
pub struct MockGleif {
    pub by_registration: HashMap<(String, String), LeiRecord>,
    pub by_name: Vec<LeiRecord>,
    pub fail: bool,
}

#[async_trait]
impl LeiRegistry for MockGleif {
    async fn lookup_by_registration(
        &self,
        authority: &str,
        number: &str,
    ) -> Result<Option<LeiRecord>, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        Ok(self
            .by_registration
            .get(&(authority.to_string(), number.to_string()))
            .cloned())
    }

    async fn search_by_name(&self, _name: &str) -> Result<Vec<LeiRecord>, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        Ok(self.by_name.clone())
    }
}

#[derive(Default)]
pub struct MockPeppol {
    pub by_key: HashMap<(String, String), PeppolParticipant>,
    pub by_name: Vec<PeppolParticipant>,
    pub fail: bool,
}

#[async_trait]
impl PeppolDirectory for MockPeppol {
    async fn lookup(
        &self,
        scheme: &str,
        value: &str,
    ) -> Result<Option<PeppolParticipant>, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        Ok(self
            .by_key
            .get(&(scheme.to_string(), value.to_string()))
            .cloned())
    }

    async fn search_by_name(
        &self,
        _name: &str,
        _country: &str,
    ) -> Result<Vec<PeppolParticipant>, RegistryError> {
        if self.fail {
            return Err(RegistryError::Unavailable("mock outage".into()));
        }
        Ok(self.by_name.clone())
    }
}

pub struct NoLogos;

#[async_trait]
impl LogoFinder for NoLogos {
    async fn find_logo(&self, _domain: &str) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }
}

pub struct FixedLogo(pub String);

#[async_trait]
impl LogoFinder for FixedLogo {
    async fn find_logo(&self, _domain: &str) -> Result<Option<String>, RegistryError> {
        Ok(Some(self.0.clone()))
    }
}

// ---------------------------------------------------------------------------
// Builders

pub fn empty_registries() -> Registries {
    Registries {
        kvk: Arc::new(MockCompanyRegistry::default()),
        handelsregister: Arc::new(MockCompanyRegistry::default()),
        kbo_public: Arc::new(MockCompanyRegistry::default()),
        kbo_api: None,
        vies: Arc::new(MockVies::default()),
        gleif: Arc::new(MockGleif::default()),
        peppol: Arc::new(MockPeppol::default()),
        logos: Arc::new(NoLogos),
    }
}

pub fn service(store: Arc<MemoryStore>, registries: Registries) -> EnrichmentService {
    EnrichmentService::new(store, registries, EnrichmentConfig::default())
}

pub fn entity(country: &str, name: &str) -> LegalEntity {
    LegalEntity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        country: country.to_string(),
        domain: None,
        legal_form: None,
        address: None,
        city: None,
        postal_code: None,
        registration_date: None,
        logo_url: None,
    }
}

pub fn lei_record(lei: &str, name: &str) -> LeiRecord {
    LeiRecord {
        lei: lei.to_string(),
        legal_name: name.to_string(),
        jurisdiction: None,
        status: Some("ACTIVE".to_string()),
        raw: serde_json::Value::Null,
    }
}

pub fn company_record(number: &str, name: &str) -> CompanyRecord {
    CompanyRecord {
        registry_number: Some(number.to_string()),
        name: Some(name.to_string()),
        ..CompanyRecord::default()
    }
}

pub fn raw_snapshot(
    legal_entity_id: Uuid,
    source: RegistrySource,
    raw: serde_json::Value,
) -> RegistrySnapshot {
    RegistrySnapshot {
        legal_entity_id,
        source,
        name: None,
        legal_form: None,
        address: None,
        city: None,
        postal_code: None,
        status: None,
        court_code: None,
        register_number: None,
        rsin: None,
        registration_date: None,
        raw,
        fetched_at: Utc::now(),
    }
}

pub fn result_for<'a>(
    summary: &'a registry_enrichment::EnrichmentSummary,
    ty: IdentifierType,
) -> &'a registry_enrichment::EnrichmentResult {
    summary
        .results
        .iter()
        .find(|r| r.identifier == ty)
        .unwrap_or_else(|| panic!("no result for {}", ty))
}
