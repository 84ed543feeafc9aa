//! Postgres implementation of the enrichment persistence seam.

mod pg_store;

pub use pg_store::PgEnrichmentStore;
