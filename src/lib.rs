//! Cross-registry identifier enrichment engine for the member company registry.
//!
//! Given a legal entity's country and whatever identifiers are already known,
//! the engine derives and looks up the remaining regulatory identifiers
//! (KVK, RSIN, VAT, LEI, EUID, Peppol, HRB/HRA, KBO) from national and
//! pan-European registries. It is a pull-on-demand, best-effort discovery
//! pass: each run only adds missing identifiers and refreshes registry
//! snapshots, never deletes or overwrites confirmed values.
//!
//! ## Architecture
//!
//! - [`registry`] holds the trait seams for the external registries (KVK,
//!   Handelsregister, KBO, VIES, GLEIF, Peppol Directory) plus thin reqwest
//!   reference clients.
//! - [`store`] is the persistence seam; [`database`] implements it on
//!   Postgres via sqlx.
//! - [`enrichment`] is the engine itself: the orchestrator, the per-country
//!   derivation modules, the declarative EUID format table and the global
//!   LEI/Peppol lookups.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! use registry_enrichment::{config::EnrichmentConfig, EnrichmentService};
//! use registry_enrichment::database::PgEnrichmentStore;
//! use registry_enrichment::registry::default_registries;
//! use std::sync::Arc;
//!
//! let config = EnrichmentConfig::from_env();
//! let pool = sqlx::PgPool::connect("postgresql:///registry").await?;
//! let store = Arc::new(PgEnrichmentStore::new(pool));
//! let service = EnrichmentService::new(store, default_registries(&config)?, config);
//! let summary = service.enrich(uuid::Uuid::new_v4()).await?;
//! println!("{}", summary.overview());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;

pub use enrichment::{EnrichmentResult, EnrichmentService, EnrichmentStatus, EnrichmentSummary};
pub use error::EnrichError;
