//! # gdb-reproject
//!
//! Reprojects a geodatabase into a freshly generated store with a new
//! spatial reference.
//!
//! A run walks the source store, rewrites its schema descriptor to the new
//! spatial reference, generates the target from that descriptor, recreates
//! every relationship class, reloads all rows and finally compares row
//! counts between the two stores.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gdb_reproject::{
//!     Config, ConfiguredLicenses, LicenseManager, LocalStore, Orchestrator, WorkbookInterchange,
//! };
//!
//! fn main() -> gdb_reproject::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let licenses = LicenseManager::new(
//!         ConfiguredLicenses::new(config.license.available.clone()),
//!         config.license.extension.clone(),
//!     );
//!     let mut orchestrator = Orchestrator::new(
//!         config,
//!         Box::new(LocalStore::open("/data/cscl.gdb")?),
//!         Box::new(LocalStore::open("/data/cscl_6539.gdb")?),
//!         Box::new(WorkbookInterchange::new(licenses)),
//!         "/data/work",
//!     );
//!     let result = orchestrator.run()?;
//!     println!("{} count mismatches", result.mismatch_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod descriptor;
pub mod error;
pub mod license;
pub mod orchestrator;
pub mod relationship;
pub mod state;
pub mod store;
pub mod transfer;
pub mod verify;

// Re-exports for convenient access
pub use config::{Config, LicenseConfig, LoggingConfig, MigrationConfig};
pub use crate::core::{Catalog, CatalogEntry, EntityType, GeoStore, SchemaInterchange};
pub use descriptor::{update_all_spatial_reference, SchemaDescriptor, WorkbookInterchange};
pub use error::{MigrateError, Result, ValidationError};
pub use license::{ConfiguredLicenses, LicenseManager, LicenseProvider, LicenseToken};
pub use orchestrator::{MigrationResult, Orchestrator};
pub use relationship::{
    RelationshipClassManager, RelationshipClassParameters, RelationshipDescriptor,
};
pub use state::{Phase, RunState, RunStatus};
pub use store::LocalStore;
pub use transfer::{CrossReference, DataLoader, LoadItem, LoadKind};
pub use verify::{CountMismatch, CountVerifier, MigrationReport};
