//! Standalone relationship class manager.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::schema::RelationshipDescription;
use crate::core::traits::GeoStore;
use crate::error::{MigrateError, Result};

use super::params::RelationshipClassParameters;
use super::replace_relationship_class;

/// Manages one relationship class in one store, outside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipClassManager {
    store_path: PathBuf,
    name: String,
    origin_class: String,
    destination_class: String,
    params: RelationshipClassParameters,
}

/// Parameter view of a manager, as returned by
/// [`RelationshipClassManager::describe_instance`].
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipInstance<'a> {
    pub name: &'a str,
    pub path: PathBuf,
    pub store: &'a Path,
    pub origin_class: &'a str,
    pub destination_class: &'a str,
    #[serde(flatten)]
    pub params: &'a RelationshipClassParameters,
}

impl RelationshipClassManager {
    pub fn new(
        store_path: impl Into<PathBuf>,
        name: impl Into<String>,
        origin_class: impl Into<String>,
        destination_class: impl Into<String>,
        params: RelationshipClassParameters,
    ) -> Self {
        Self {
            store_path: store_path.into(),
            name: name.into(),
            origin_class: origin_class.into(),
            destination_class: destination_class.into(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn params(&self) -> &RelationshipClassParameters {
        &self.params
    }

    /// Replace the parameters.
    pub fn set_params(&mut self, params: RelationshipClassParameters) {
        self.params = params;
    }

    /// Full path of the relationship class.
    pub fn path(&self) -> PathBuf {
        self.store_path.join(&self.name)
    }

    fn origin_path(&self) -> PathBuf {
        self.store_path.join(&self.origin_class)
    }

    fn destination_path(&self) -> PathBuf {
        self.store_path.join(&self.destination_class)
    }

    /// Create the relationship class, replacing an existing one.
    pub fn create(&self, store: &mut dyn GeoStore) -> Result<()> {
        replace_relationship_class(
            store,
            &self.origin_path(),
            &self.destination_path(),
            &self.path(),
            &self.params,
        )
    }

    /// Delete the relationship class if it exists.
    pub fn delete(&self, store: &mut dyn GeoStore) -> Result<()> {
        if self.exists(store) {
            store.delete(&self.path())?;
        }
        Ok(())
    }

    pub fn exists(&self, store: &dyn GeoStore) -> bool {
        store.item_exists(&self.path())
    }

    /// The store's description of the relationship class.
    pub fn describe(&self, store: &dyn GeoStore) -> Result<RelationshipDescription> {
        if !self.exists(store) {
            return Err(MigrateError::not_found(
                "Relationship class",
                self.path().display().to_string(),
            ));
        }
        store.describe_relationship(&self.path())
    }

    /// This manager's own parameters.
    pub fn describe_instance(&self) -> RelationshipInstance<'_> {
        RelationshipInstance {
            name: &self.name,
            path: self.path(),
            store: &self.store_path,
            origin_class: &self.origin_class,
            destination_class: &self.destination_class,
            params: &self.params,
        }
    }

    /// Multi-line rendering of either description.
    pub fn describe_pretty<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Independent copy pointed at another store.
    pub fn copy_to(&self, store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ClassKind, GeometryType};
    use crate::core::value::{FieldDef, FieldType};
    use crate::error::ValidationError;
    use crate::relationship::params::RelationshipParamsBuilder;
    use crate::store::LocalStore;

    const STORE: &str = "/tmp/test.gdb";

    fn sample_store() -> LocalStore {
        let mut store = LocalStore::in_memory(STORE);
        store.create().unwrap();
        store
            .add_class(
                "nybb",
                None,
                ClassKind::FeatureClass(GeometryType::Polygon),
                1,
                vec![
                    FieldDef::new("OBJECTID", FieldType::ObjectId),
                    FieldDef::new("BoroCode", FieldType::SmallInteger),
                ],
            )
            .unwrap();
        store
            .add_class(
                "NEIGHBORHOODS",
                None,
                ClassKind::Table,
                -1,
                vec![
                    FieldDef::new("OBJECTID", FieldType::ObjectId),
                    FieldDef::new("BOROCODE", FieldType::SmallInteger),
                ],
            )
            .unwrap();
        store
    }

    fn base_params() -> RelationshipParamsBuilder {
        RelationshipParamsBuilder::new()
            .origin_primary_key("BoroCode")
            .destination_foreign_key("BOROCODE")
    }

    fn manager() -> RelationshipClassManager {
        RelationshipClassManager::new(
            STORE,
            "Boroughs_Neighborhoods_Rel",
            "nybb",
            "NEIGHBORHOODS",
            base_params().build().unwrap(),
        )
    }

    #[test]
    fn test_exists_create_delete() {
        let mut store = sample_store();
        let rel = manager();
        assert!(!rel.exists(&store));

        rel.create(&mut store).unwrap();
        assert!(rel.exists(&store));

        rel.delete(&mut store).unwrap();
        assert!(!rel.exists(&store));

        // Deleting again is a no-op
        rel.delete(&mut store).unwrap();
    }

    #[test]
    fn test_create_twice_describes_the_same() {
        let mut store = sample_store();
        let rel = manager();
        rel.create(&mut store).unwrap();
        let first = rel.describe(&store).unwrap();
        rel.create(&mut store).unwrap();
        assert_eq!(rel.describe(&store).unwrap(), first);
    }

    #[test]
    fn test_describe_missing_is_not_found() {
        let store = sample_store();
        assert!(matches!(
            manager().describe(&store),
            Err(MigrateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_describe_pretty_store_view() {
        let mut store = sample_store();
        let rel = manager();
        rel.create(&mut store).unwrap();

        let pretty =
            RelationshipClassManager::describe_pretty(&rel.describe(&store).unwrap()).unwrap();
        assert!(pretty.contains("name"));
        assert!(pretty.contains("Boroughs_Neighborhoods_Rel"));
        assert!(pretty.contains("cardinality"));
        assert!(pretty.contains("OneToMany"));
        assert!(pretty.matches('\n').count() > 0);

        // The instance keeps its own vocabulary
        assert_eq!(rel.params().cardinality().as_str(), "ONE_TO_MANY");
    }

    #[test]
    fn test_describe_pretty_instance_view() {
        let rel = manager();
        let pretty = RelationshipClassManager::describe_pretty(&rel.describe_instance()).unwrap();
        assert!(pretty.contains("\"name\": \"Boroughs_Neighborhoods_Rel\""));
        assert!(pretty.contains("\"cardinality\": \"ONE_TO_MANY\""));
        assert!(!pretty.contains("OneToMany"));
        assert!(pretty.matches('\n').count() > 0);
    }

    #[test]
    fn test_copy_to_is_independent() {
        let mut store = sample_store();
        let rel = manager();
        let mut clone = rel.copy_to(STORE);
        assert_eq!(clone, rel);

        clone.create(&mut store).unwrap();
        assert!(clone.exists(&store));

        clone.set_params(
            base_params()
                .cardinality("ONE_TO_ONE")
                .build()
                .unwrap(),
        );
        assert_eq!(rel.params().cardinality().as_str(), "ONE_TO_MANY");

        let elsewhere = rel.copy_to("/tmp/other.gdb");
        assert_eq!(elsewhere.path(), PathBuf::from("/tmp/other.gdb/Boroughs_Neighborhoods_Rel"));
        assert_eq!(rel.store_path(), Path::new(STORE));
    }

    #[test]
    fn test_create_attributed() {
        let mut store = sample_store();
        let mut rel = manager();
        rel.set_params(
            base_params()
                .attributed("ATTRIBUTED")
                .origin_foreign_key("OBJECTID")
                .build()
                .unwrap(),
        );
        rel.create(&mut store).unwrap();
        assert!(rel.exists(&store));
        assert!(rel.describe(&store).unwrap().is_attributed);
    }

    #[test]
    fn test_attributed_without_origin_foreign_key_fails_before_create() {
        let store = sample_store();
        let err = base_params().attributed("ATTRIBUTED").build().unwrap_err();
        assert_eq!(err, ValidationError::MissingOriginForeignKey);
        assert!(!manager().exists(&store));
    }
}
