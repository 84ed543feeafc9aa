//! Persistence seam of the enrichment engine.
//!
//! The engine only ever adds identifier rows, upserts registry snapshots and
//! syncs a handful of entity columns; everything else belongs to the CRUD
//! layer. Each write commits independently — there is no transaction spanning
//! a run, so a mid-run crash leaves a valid partial result.

use crate::models::{
    EntityFieldUpdate, Identifier, IdentifierStatus, IdentifierType, LegalEntity, NewIdentifier,
    RegistrySnapshot, RegistrySource,
};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Outcome of an identifier insert attempt.
///
/// `AlreadyExists` covers both the pre-insert existence check and a benign
/// duplicate-key rejection from a racing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    /// Load an entity; `Ok(None)` when missing or soft-deleted.
    async fn load_entity(&self, id: Uuid) -> Result<Option<LegalEntity>>;

    /// All active (non-deleted) identifiers of an entity.
    async fn active_identifiers(&self, legal_entity_id: Uuid) -> Result<Vec<Identifier>>;

    /// Insert an identifier unless one of that type is already active.
    async fn insert_identifier(&self, new: NewIdentifier) -> Result<InsertOutcome>;

    /// Refresh the validation status of an existing identifier. Values are
    /// never rewritten once created.
    async fn refresh_identifier_status(
        &self,
        legal_entity_id: Uuid,
        identifier_type: IdentifierType,
        status: IdentifierStatus,
    ) -> Result<()>;

    /// The active snapshot for (entity, source), if any.
    async fn latest_snapshot(
        &self,
        legal_entity_id: Uuid,
        source: RegistrySource,
    ) -> Result<Option<RegistrySnapshot>>;

    /// Insert or replace the active snapshot for (entity, source).
    async fn upsert_snapshot(&self, snapshot: RegistrySnapshot) -> Result<()>;

    /// Apply candidate field values and report which columns changed.
    async fn update_entity_fields(
        &self,
        legal_entity_id: Uuid,
        update: EntityFieldUpdate,
    ) -> Result<Vec<String>>;

    async fn set_logo_url(&self, legal_entity_id: Uuid, url: &str) -> Result<()>;
}
