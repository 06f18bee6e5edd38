//! Relationship classes: parameter validation, extraction from a source
//! store, and recreation in a target store.

pub mod descriptor;
pub mod manager;
pub mod params;
pub mod rebuild;

pub use descriptor::{KeyRole, RelationshipDescriptor};
pub use manager::{RelationshipClassManager, RelationshipInstance};
pub use params::{
    sanitize, validate, Attributed, Cardinality, MessageDirection, RelationshipClassParameters,
    RelationshipParamsBuilder, RelationshipType, SanitizedParams,
};
pub use rebuild::{RebuiltRelationship, RelationshipRebuilder};

use std::path::Path;

use tracing::debug;

use crate::core::traits::GeoStore;
use crate::error::Result;

/// Create a relationship class, deleting any existing one at `output` first.
pub fn replace_relationship_class(
    store: &mut dyn GeoStore,
    origin: &Path,
    destination: &Path,
    output: &Path,
    params: &RelationshipClassParameters,
) -> Result<()> {
    if store.item_exists(output) {
        debug!("Deleting existing relationship class {}", output.display());
        store.delete(output)?;
    }

    store.create_relationship_class(
        origin,
        destination,
        output,
        params.relationship_type().as_str(),
        params.forward_label(),
        params.backward_label(),
        params.message_direction().as_str(),
        params.cardinality().as_str(),
        params.attributed().as_str(),
        params.origin_primary_key(),
        params.origin_foreign_key(),
        params.destination_primary_key(),
        params.destination_foreign_key(),
    )
}
