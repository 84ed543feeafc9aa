//! Request-scoped view of an entity's current identifier state.
//!
//! Built by the orchestrator, passed by reference to every module, never
//! persisted. The value itself is immutable; the orchestrator builds a fresh
//! one between ordered phases so later phases observe identifiers written by
//! earlier ones (NL chain before EUID, HRB/HRA before EUID).

use crate::models::{Identifier, IdentifierType, LegalEntity};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub legal_entity_id: Uuid,
    /// ISO-3166 alpha-2, uppercase.
    pub country: String,
    pub name: String,
    pub domain: Option<String>,
    identifiers: Vec<Identifier>,
    present: HashSet<IdentifierType>,
}

impl EnrichmentContext {
    pub fn new(entity: &LegalEntity, identifiers: Vec<Identifier>) -> Self {
        let present = identifiers.iter().map(|i| i.identifier_type).collect();
        Self {
            legal_entity_id: entity.id,
            country: entity.country.to_ascii_uppercase(),
            name: entity.name.clone(),
            domain: entity.domain.clone(),
            identifiers,
            present,
        }
    }

    pub fn has(&self, identifier_type: IdentifierType) -> bool {
        self.present.contains(&identifier_type)
    }

    pub fn value_of(&self, identifier_type: IdentifierType) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|i| i.identifier_type == identifier_type)
            .map(|i| i.value.as_str())
    }

    /// First identifier present in the given precedence order.
    pub fn first_present(&self, order: &[IdentifierType]) -> Option<(IdentifierType, &str)> {
        order
            .iter()
            .find_map(|ty| self.value_of(*ty).map(|value| (*ty, value)))
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }
}
