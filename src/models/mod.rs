//! Domain model shared by the enrichment engine and the store.

pub mod identifier;
pub mod legal_entity;
pub mod registry_data;

pub use identifier::{Identifier, IdentifierStatus, IdentifierType, NewIdentifier};
pub use legal_entity::{EntityFieldUpdate, LegalEntity};
pub use registry_data::{RegistrySnapshot, RegistrySource};
