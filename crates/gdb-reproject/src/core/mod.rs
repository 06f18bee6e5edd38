//! Core types shared across the crate.

pub mod catalog;
pub mod schema;
pub mod traits;
pub mod value;

pub use catalog::{Catalog, CatalogEntry, EntityType, PathMapping};
pub use schema::{
    ClassKey, ClassKind, ClassSchema, ContainerSchema, GeometryType, RelationshipDescription,
    SpatialReference, StoreSchema, NO_SPATIAL_REFERENCE,
};
pub use traits::{GeoStore, SchemaInterchange, StoreItem, FEATURE_DATASET};
pub use value::{FieldDef, FieldType, FieldValue, Row};
