//! drillplan-store: file-backed collaborators for the scheduler.
//!
//! Implements the core `RecordStore`, `ItemCatalog` and `ClassRegistry`
//! traits over a JSON journal and TOML catalog / profile files, and loads the
//! workspace configuration that points at them.

pub mod catalog;
pub mod config;
pub mod error;
pub mod journal;
pub mod profiles;

pub use catalog::{load_catalog_path, validate_catalog, Catalog, ValidationWarning};
pub use config::{load_config, load_config_from, DrillplanConfig};
pub use error::StoreError;
pub use journal::{Journal, PaperLog};
pub use profiles::{load_profiles, validate_profiles, ClassInfo, ProfileWarning, Profiles};
