//! Error taxonomy for the enrichment engine.
//!
//! Only a missing root entity is fatal to a run. Everything a derivation
//! module can encounter (missing source identifier, ambiguous name search,
//! unreachable registry) is reported through `EnrichmentResult` statuses and
//! never crosses a module boundary as an error.

use thiserror::Error;
use uuid::Uuid;

/// Fatal errors from the enrichment entry point.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The legal entity does not exist or is soft-deleted.
    #[error("legal entity {0} not found")]
    EntityNotFound(Uuid),

    /// The store failed while loading the root entity or its identifiers.
    /// Module-local store failures are isolated per module instead.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}
