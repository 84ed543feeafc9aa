//! Sync legal-entity fields from the freshest KVK registry data (NL only).

use crate::enrichment::context::EnrichmentContext;
use crate::models::{EntityFieldUpdate, IdentifierType, LegalEntity, RegistrySnapshot, RegistrySource};
use crate::registry::Registries;
use crate::store::EnrichmentStore;
use anyhow::Result;
use tracing::info;

/// Ensure a KVK snapshot exists (fetch if missing) and apply its fields to
/// the entity. Returns the list of changed columns.
pub async fn sync_from_kvk(
    entity: &LegalEntity,
    ctx: &EnrichmentContext,
    store: &dyn EnrichmentStore,
    registries: &Registries,
) -> Result<Vec<String>> {
    let snapshot = match store.latest_snapshot(entity.id, RegistrySource::Kvk).await? {
        Some(snapshot) => Some(snapshot),
        None => fetch_missing(entity, ctx, store, registries).await?,
    };

    let Some(snapshot) = snapshot else {
        return Ok(vec![]);
    };

    let update = EntityFieldUpdate {
        name: snapshot.name.clone(),
        legal_form: snapshot.legal_form.clone(),
        address: snapshot.address.clone(),
        city: snapshot.city.clone(),
        postal_code: snapshot.postal_code.clone(),
        registration_date: snapshot.registration_date,
    };
    if update.is_empty() {
        return Ok(vec![]);
    }

    let changed = store.update_entity_fields(entity.id, update).await?;
    if !changed.is_empty() {
        info!(
            legal_entity_id = %entity.id,
            fields = ?changed,
            "Entity fields updated from KVK registry data"
        );
    }
    Ok(changed)
}

async fn fetch_missing(
    entity: &LegalEntity,
    ctx: &EnrichmentContext,
    store: &dyn EnrichmentStore,
    registries: &Registries,
) -> Result<Option<RegistrySnapshot>> {
    let Some(kvk) = ctx.value_of(IdentifierType::Kvk) else {
        return Ok(None);
    };
    let Some(record) = registries
        .kvk
        .search_by_number(kvk)
        .await
        .map_err(anyhow::Error::from)?
    else {
        return Ok(None);
    };

    let snapshot = RegistrySnapshot::from_record(entity.id, RegistrySource::Kvk, &record);
    store.upsert_snapshot(snapshot.clone()).await?;
    Ok(Some(snapshot))
}
