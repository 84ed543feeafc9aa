//! The cross-registry identifier enrichment engine.
//!
//! The orchestrator runs the applicable country module, then the generic
//! EUID/LEI/Peppol modules, then field sync and branding, aggregating every
//! per-identifier outcome into an [`EnrichmentSummary`]. A failure in any
//! module is recorded and the pipeline continues.

pub mod branding;
pub mod context;
pub mod countries;
pub mod euid;
pub mod lei;
pub mod orchestrator;
pub mod peppol;
pub mod result;
pub mod sync;

pub use context::EnrichmentContext;
pub use orchestrator::EnrichmentService;
pub use result::{EnrichmentResult, EnrichmentStatus, EnrichmentSummary};
