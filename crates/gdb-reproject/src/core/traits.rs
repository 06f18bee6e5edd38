//! Collaborator traits the reprojection pipeline drives.
//!
//! - [`GeoStore`]: the data-store engine (catalog, relationship primitive,
//!   truncate/append/count, store lifecycle)
//! - [`SchemaInterchange`]: generation of schema descriptors from a store
//!   and of empty stores from a descriptor
//!
//! All calls are blocking. Entities are addressed by full path: the store
//! root joined with an optional feature dataset name and the entity name.

use std::path::Path;

use crate::error::Result;

use super::schema::{RelationshipDescription, StoreSchema};
use super::value::{FieldDef, Row};

/// Dataset type reported for feature datasets; walkers descend into these.
pub const FEATURE_DATASET: &str = "FeatureDataset";

/// One child of a store container, as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreItem {
    pub name: String,
    /// Store-reported dataset type (`FeatureClass`, `Table`,
    /// `RelationshipClass`, `FeatureDataset`, ...).
    pub dataset_type: String,
}

impl StoreItem {
    pub fn new(name: impl Into<String>, dataset_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dataset_type: dataset_type.into(),
        }
    }

    /// Check if this item is a container to descend into.
    pub fn is_container(&self) -> bool {
        self.dataset_type == FEATURE_DATASET
    }
}

/// A geographic data store.
pub trait GeoStore {
    /// Root path of the store.
    fn root(&self) -> &Path;

    /// Check if the store itself exists.
    fn exists(&self) -> bool;

    /// Create an empty store at [`GeoStore::root`].
    fn create(&mut self) -> Result<()>;

    /// Compact and remove the store. A missing store is not an error.
    fn clean(&mut self) -> Result<()>;

    /// List the direct children of a container (the root or a feature dataset).
    fn list(&self, container: &Path) -> Result<Vec<StoreItem>>;

    /// Check if an entity exists at `path`.
    fn item_exists(&self, path: &Path) -> bool;

    /// Describe the relationship class at `path` in store vocabulary.
    fn describe_relationship(&self, path: &Path) -> Result<RelationshipDescription>;

    /// Create a relationship class.
    ///
    /// The argument order is a contract with the store primitive and must
    /// not be permuted. Enumerated arguments use the parameter vocabulary
    /// (`SIMPLE`, `ONE_TO_MANY`, `ATTRIBUTED`, ...).
    #[allow(clippy::too_many_arguments)]
    fn create_relationship_class(
        &mut self,
        origin: &Path,
        destination: &Path,
        output: &Path,
        relationship_type: &str,
        forward_label: &str,
        backward_label: &str,
        message_direction: &str,
        cardinality: &str,
        attributed: &str,
        origin_primary_key: &str,
        origin_foreign_key: &str,
        destination_primary_key: &str,
        destination_foreign_key: &str,
    ) -> Result<()>;

    /// Delete the entity at `path`.
    fn delete(&mut self, path: &Path) -> Result<()>;

    /// Column definitions of a table, feature class or attributed
    /// relationship table.
    fn fields(&self, path: &Path) -> Result<Vec<FieldDef>>;

    /// Read every row of an entity.
    fn read_rows(&self, path: &Path) -> Result<Vec<Row>>;

    /// Remove every row of an entity, keeping its schema.
    fn truncate(&mut self, path: &Path) -> Result<()>;

    /// Append rows to an entity. Returns the number of rows appended.
    fn append_rows(&mut self, path: &Path, rows: Vec<Row>) -> Result<u64>;

    /// Count rows of an entity.
    fn row_count(&self, path: &Path) -> Result<u64>;

    /// Export the spatial references, containers and classes of the store.
    fn schema(&self) -> Result<StoreSchema>;

    /// Create the containers and empty classes described by `schema`.
    fn apply_schema(&mut self, schema: &StoreSchema) -> Result<()>;
}

/// Schema descriptor interchange.
///
/// Needs the licensed capability; callers hold a
/// [`LicenseToken`](crate::license::LicenseToken) around these calls.
pub trait SchemaInterchange {
    /// Write a schema descriptor describing `store` to `descriptor`.
    fn generate_descriptor(&self, store: &dyn GeoStore, descriptor: &Path) -> Result<()>;

    /// Create `target` with the schema held in `descriptor`.
    fn generate_store(&self, descriptor: &Path, target: &mut dyn GeoStore) -> Result<()>;
}
