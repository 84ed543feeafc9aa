//! sqlx/Postgres store for identifiers, registry snapshots and entity fields.
//!
//! Schema lives in `migrations/0001_enrichment_schema.sql`. The one-active-row
//! invariants are backed by partial unique indexes over `deleted_at IS NULL`,
//! but every insert still checks existing state first: the index is the last
//! line of defense against a racing run, and its rejection is reported as
//! `AlreadyExists`, not as an error.

use crate::models::{
    EntityFieldUpdate, Identifier, IdentifierStatus, IdentifierType, LegalEntity, NewIdentifier,
    RegistrySnapshot, RegistrySource,
};
use crate::store::{EnrichmentStore, InsertOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

pub struct PgEnrichmentStore {
    pool: PgPool,
}

impl PgEnrichmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LegalEntityRow {
    id: Uuid,
    name: String,
    country: String,
    domain: Option<String>,
    legal_form: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    registration_date: Option<NaiveDate>,
    logo_url: Option<String>,
}

impl From<LegalEntityRow> for LegalEntity {
    fn from(row: LegalEntityRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            country: row.country,
            domain: row.domain,
            legal_form: row.legal_form,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            registration_date: row.registration_date,
            logo_url: row.logo_url,
        }
    }
}

#[derive(Debug, FromRow)]
struct IdentifierRow {
    id: Uuid,
    legal_entity_id: Uuid,
    identifier_type: String,
    value: String,
    status: String,
    provenance: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    legal_entity_id: Uuid,
    source: String,
    name: Option<String>,
    legal_form: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    status: Option<String>,
    court_code: Option<String>,
    register_number: Option<String>,
    rsin: Option<String>,
    registration_date: Option<NaiveDate>,
    raw: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

#[async_trait]
impl EnrichmentStore for PgEnrichmentStore {
    async fn load_entity(&self, id: Uuid) -> Result<Option<LegalEntity>> {
        let row = sqlx::query_as::<_, LegalEntityRow>(
            r#"
            SELECT id, name, country, domain, legal_form, address, city,
                   postal_code, registration_date, logo_url
            FROM registry.legal_entities
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load legal entity")?;

        Ok(row.map(Into::into))
    }

    async fn active_identifiers(&self, legal_entity_id: Uuid) -> Result<Vec<Identifier>> {
        let rows = sqlx::query_as::<_, IdentifierRow>(
            r#"
            SELECT id, legal_entity_id, identifier_type, value, status,
                   provenance, created_at
            FROM registry.identifiers
            WHERE legal_entity_id = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(legal_entity_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load identifiers")?;

        let mut identifiers = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(identifier_type) = IdentifierType::parse(&row.identifier_type) else {
                warn!(
                    legal_entity_id = %legal_entity_id,
                    identifier_type = %row.identifier_type,
                    "Skipping identifier with unknown type"
                );
                continue;
            };
            let status =
                IdentifierStatus::parse(&row.status).unwrap_or(IdentifierStatus::Pending);
            identifiers.push(Identifier {
                id: row.id,
                legal_entity_id: row.legal_entity_id,
                identifier_type,
                value: row.value,
                status,
                provenance: row.provenance,
                created_at: row.created_at,
            });
        }
        Ok(identifiers)
    }

    async fn insert_identifier(&self, new: NewIdentifier) -> Result<InsertOutcome> {
        // Re-check immediately before the insert; a concurrent run may have
        // just written the same type.
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM registry.identifiers
                WHERE legal_entity_id = $1 AND identifier_type = $2
                  AND deleted_at IS NULL
            )
            "#,
        )
        .bind(new.legal_entity_id)
        .bind(new.identifier_type.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check identifier existence")?;

        if exists {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO registry.identifiers (
                id, legal_entity_id, identifier_type, value, status,
                provenance, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.legal_entity_id)
        .bind(new.identifier_type.as_str())
        .bind(&new.value)
        .bind(new.status.as_str())
        .bind(&new.provenance)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    legal_entity_id = %new.legal_entity_id,
                    identifier_type = %new.identifier_type,
                    value = %new.value,
                    "Inserted identifier"
                );
                Ok(InsertOutcome::Inserted)
            }
            // Unique violation from a racing run is benign.
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(e).context("Failed to insert identifier"),
        }
    }

    async fn refresh_identifier_status(
        &self,
        legal_entity_id: Uuid,
        identifier_type: IdentifierType,
        status: IdentifierStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE registry.identifiers
            SET status = $3, updated_at = NOW()
            WHERE legal_entity_id = $1 AND identifier_type = $2
              AND deleted_at IS NULL
            "#,
        )
        .bind(legal_entity_id)
        .bind(identifier_type.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to refresh identifier status")?;

        Ok(())
    }

    async fn latest_snapshot(
        &self,
        legal_entity_id: Uuid,
        source: RegistrySource,
    ) -> Result<Option<RegistrySnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT legal_entity_id, source, name, legal_form, address, city,
                   postal_code, status, court_code, register_number, rsin,
                   registration_date, raw, fetched_at
            FROM registry.registry_snapshots
            WHERE legal_entity_id = $1 AND source = $2 AND deleted_at IS NULL
            ORDER BY fetched_at DESC
            LIMIT 1
            "#,
        )
        .bind(legal_entity_id)
        .bind(source.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load registry snapshot")?;

        Ok(row.map(|row| RegistrySnapshot {
            legal_entity_id: row.legal_entity_id,
            source: RegistrySource::parse(&row.source).unwrap_or(source),
            name: row.name,
            legal_form: row.legal_form,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            status: row.status,
            court_code: row.court_code,
            register_number: row.register_number,
            rsin: row.rsin,
            registration_date: row.registration_date,
            raw: row.raw,
            fetched_at: row.fetched_at,
        }))
    }

    async fn upsert_snapshot(&self, snapshot: RegistrySnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO registry.registry_snapshots (
                legal_entity_id, source, name, legal_form, address, city,
                postal_code, status, court_code, register_number, rsin,
                registration_date, raw, fetched_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (legal_entity_id, source) WHERE deleted_at IS NULL
            DO UPDATE SET
                name = EXCLUDED.name,
                legal_form = EXCLUDED.legal_form,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                postal_code = EXCLUDED.postal_code,
                status = EXCLUDED.status,
                court_code = EXCLUDED.court_code,
                register_number = EXCLUDED.register_number,
                rsin = EXCLUDED.rsin,
                registration_date = EXCLUDED.registration_date,
                raw = EXCLUDED.raw,
                fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(snapshot.legal_entity_id)
        .bind(snapshot.source.as_str())
        .bind(&snapshot.name)
        .bind(&snapshot.legal_form)
        .bind(&snapshot.address)
        .bind(&snapshot.city)
        .bind(&snapshot.postal_code)
        .bind(&snapshot.status)
        .bind(&snapshot.court_code)
        .bind(&snapshot.register_number)
        .bind(&snapshot.rsin)
        .bind(snapshot.registration_date)
        .bind(&snapshot.raw)
        .bind(snapshot.fetched_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert registry snapshot")?;

        Ok(())
    }

    async fn update_entity_fields(
        &self,
        legal_entity_id: Uuid,
        update: EntityFieldUpdate,
    ) -> Result<Vec<String>> {
        let Some(current) = self.load_entity(legal_entity_id).await? else {
            return Ok(vec![]);
        };

        // Only write columns whose candidate value actually differs.
        let mut changed = Vec::new();
        let name = diff(&mut changed, "name", update.name, Some(&current.name));
        let legal_form = diff(
            &mut changed,
            "legal_form",
            update.legal_form,
            current.legal_form.as_ref(),
        );
        let address = diff(
            &mut changed,
            "address",
            update.address,
            current.address.as_ref(),
        );
        let city = diff(&mut changed, "city", update.city, current.city.as_ref());
        let postal_code = diff(
            &mut changed,
            "postal_code",
            update.postal_code,
            current.postal_code.as_ref(),
        );
        let registration_date = match update.registration_date {
            Some(date) if current.registration_date != Some(date) => {
                changed.push("registration_date".to_string());
                Some(date)
            }
            _ => None,
        };

        if changed.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query(
            r#"
            UPDATE registry.legal_entities
            SET name = COALESCE($2, name),
                legal_form = COALESCE($3, legal_form),
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                postal_code = COALESCE($6, postal_code),
                registration_date = COALESCE($7, registration_date),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(legal_entity_id)
        .bind(name)
        .bind(legal_form)
        .bind(address)
        .bind(city)
        .bind(postal_code)
        .bind(registration_date)
        .execute(&self.pool)
        .await
        .context("Failed to sync entity fields")?;

        info!(
            legal_entity_id = %legal_entity_id,
            fields = ?changed,
            "Synced entity fields from registry data"
        );
        Ok(changed)
    }

    async fn set_logo_url(&self, legal_entity_id: Uuid, url: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE registry.legal_entities
            SET logo_url = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(legal_entity_id)
        .bind(url)
        .execute(&self.pool)
        .await
        .context("Failed to store logo URL")?;

        Ok(())
    }
}

fn diff(
    changed: &mut Vec<String>,
    column: &str,
    candidate: Option<String>,
    current: Option<&String>,
) -> Option<String> {
    match candidate {
        Some(value) if Some(&value) != current => {
            changed.push(column.to_string());
            Some(value)
        }
        _ => None,
    }
}
