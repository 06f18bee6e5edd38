//! Rebuilding source relationship classes in the target store.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::catalog::{Catalog, CatalogEntry, EntityType};
use crate::core::traits::GeoStore;
use crate::error::{MigrateError, Result};
use crate::transfer::{LoadItem, LoadKind};

use super::descriptor::RelationshipDescriptor;
use super::params::RelationshipClassParameters;
use super::replace_relationship_class;

/// A relationship class recreated in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltRelationship {
    pub name: String,
    pub target_path: PathBuf,
    /// Join table to reload, for attributed relationships.
    pub join_table: Option<LoadItem>,
}

/// Recreates relationship classes using a walked catalog to resolve where
/// origin and destination classes live in the target.
pub struct RelationshipRebuilder<'a> {
    catalog: &'a Catalog,
}

impl<'a> RelationshipRebuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Rebuild every relationship class in the catalog, in walk order.
    ///
    /// Every source relationship is described, resolved and validated
    /// before the first one is created, so an ambiguous or invalid
    /// relationship leaves the target untouched. A store failure while
    /// creating stops the rebuild; relationships already created stay.
    pub fn rebuild_all(
        &self,
        source: &dyn GeoStore,
        target: &mut dyn GeoStore,
    ) -> Result<Vec<RebuiltRelationship>> {
        let planned = self
            .catalog
            .of_type(EntityType::RelationshipClass)
            .map(|entry| self.plan(source, entry))
            .collect::<Result<Vec<_>>>()?;
        debug!("Planned {} relationship classes", planned.len());

        planned.into_iter().map(|p| p.apply(target)).collect()
    }

    /// Describe one source relationship and recreate it in the target.
    pub fn rebuild(
        &self,
        source: &dyn GeoStore,
        target: &mut dyn GeoStore,
        entry: &CatalogEntry,
    ) -> Result<RebuiltRelationship> {
        self.plan(source, entry)?.apply(target)
    }

    /// Read, resolve and validate one relationship. Touches the source only.
    fn plan<'e>(
        &self,
        source: &dyn GeoStore,
        entry: &'e CatalogEntry,
    ) -> Result<PlannedRelationship<'e>> {
        info!(
            "{} - {} - {}",
            entry.name,
            entry.entity_type,
            entry.container_path.display()
        );

        let descriptor = RelationshipDescriptor::read(source, &entry.path())?;
        let target_container = self.catalog.target_container(entry)?;
        let output = target_container.join(&descriptor.name);
        info!(
            "--- out_relationship_class  = {} - target = {}",
            descriptor.name,
            target_container.display()
        );

        let origin = self.resolve("Origin", &descriptor.origin_class_name)?;
        info!("--- origin_table            = {}", origin.display());
        let destination = self.resolve("Destination", &descriptor.destination_class_name)?;
        info!("--- destination_table       = {}", destination.display());

        let params = descriptor.to_parameters()?;
        info!("----- relationship_type       = {}", params.relationship_type());
        info!("----- forward_label           = {}", params.forward_label());
        info!("----- backward_label          = {}", params.backward_label());
        info!("----- message_direction       = {}", params.message_direction());
        info!("----- cardinality             = {}", params.cardinality());
        info!("----- attributed              = {}", params.attributed());
        info!("----- origin_primary_key      = {}", params.origin_primary_key());
        info!("----- origin_foreign_key      = {}", params.origin_foreign_key());
        info!("----- destination_primary_key = {}", params.destination_primary_key());
        info!("----- destination_foreign_key = {}", params.destination_foreign_key());

        Ok(PlannedRelationship {
            entry,
            name: descriptor.name,
            target_container,
            output,
            origin,
            destination,
            params,
        })
    }

    /// Join tables of the attributed relationships in the catalog. Reads
    /// the source only.
    pub fn join_tables(&self, source: &dyn GeoStore) -> Result<Vec<LoadItem>> {
        let mut items = Vec::new();
        for entry in self.catalog.of_type(EntityType::RelationshipClass) {
            let descriptor = RelationshipDescriptor::read(source, &entry.path())?;
            if let Some(table) = descriptor.attributed_table.as_deref() {
                let target_container = self.catalog.target_container(entry)?;
                items.push(join_table_item(entry, &target_container, table));
            }
        }
        Ok(items)
    }

    fn resolve(&self, role: &str, class_name: &str) -> Result<PathBuf> {
        let entry = self
            .catalog
            .get(class_name)
            .ok_or_else(|| MigrateError::not_found(format!("{} item", role), class_name))?;
        self.catalog.target_path(entry)
    }
}

/// A validated relationship waiting to be created.
struct PlannedRelationship<'e> {
    entry: &'e CatalogEntry,
    name: String,
    target_container: PathBuf,
    output: PathBuf,
    origin: PathBuf,
    destination: PathBuf,
    params: RelationshipClassParameters,
}

impl PlannedRelationship<'_> {
    fn apply(self, target: &mut dyn GeoStore) -> Result<RebuiltRelationship> {
        info!("Creating relationship class {}", self.output.display());
        replace_relationship_class(
            target,
            &self.origin,
            &self.destination,
            &self.output,
            &self.params,
        )?;

        let join_table = self.params.attributed_table().map(|table| {
            info!(
                "adding attributed relationship table {} {}",
                self.entry.container_path.display(),
                self.target_container.display()
            );
            join_table_item(self.entry, &self.target_container, table)
        });

        Ok(RebuiltRelationship {
            name: self.name,
            target_path: self.output,
            join_table,
        })
    }
}

fn join_table_item(entry: &CatalogEntry, target_container: &Path, table: &str) -> LoadItem {
    LoadItem {
        name: table.to_string(),
        kind: LoadKind::AttributedTable,
        source_path: entry.container_path.join(table),
        target_path: target_container.join(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ClassKind, GeometryType};
    use crate::core::value::{FieldDef, FieldType};
    use crate::store::LocalStore;

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("OBJECTID", FieldType::ObjectId),
            FieldDef::new("BoroCode", FieldType::SmallInteger),
        ]
    }

    fn source_with(attributed: bool) -> LocalStore {
        let mut store = LocalStore::in_memory("/src/sample.gdb");
        store.create().unwrap();
        store.add_container("Admin", 1).unwrap();
        store
            .add_class(
                "nybb",
                Some("Admin"),
                ClassKind::FeatureClass(GeometryType::Polygon),
                1,
                fields(),
            )
            .unwrap();
        store
            .add_class("NEIGHBORHOODS", None, ClassKind::Table, -1, fields())
            .unwrap();
        let (attr, origin_fk, dest_fk) = if attributed {
            ("ATTRIBUTED", "BoroFK", "HoodFK")
        } else {
            ("NONE", "", "BoroCode")
        };
        store
            .create_relationship_class(
                Path::new("/src/sample.gdb/Admin/nybb"),
                Path::new("/src/sample.gdb/NEIGHBORHOODS"),
                Path::new("/src/sample.gdb/Admin/BoroHood"),
                "SIMPLE",
                "",
                "",
                "NONE",
                if attributed { "MANY_TO_MANY" } else { "ONE_TO_MANY" },
                attr,
                "BoroCode",
                origin_fk,
                "",
                dest_fk,
            )
            .unwrap();
        store
    }

    fn target_for(source: &LocalStore) -> LocalStore {
        let mut target = LocalStore::in_memory("/out/new.gdb");
        target.create().unwrap();
        target.apply_schema(&source.schema().unwrap()).unwrap();
        target
    }

    #[test]
    fn test_rebuild_simple_relationship() {
        let source = source_with(false);
        let mut target = target_for(&source);
        let catalog = Catalog::walk(&source, Path::new("/out/new.gdb")).unwrap();

        let rebuilt = RelationshipRebuilder::new(&catalog)
            .rebuild_all(&source, &mut target)
            .unwrap();
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].target_path, PathBuf::from("/out/new.gdb/Admin/BoroHood"));
        assert!(rebuilt[0].join_table.is_none());

        let desc = target.describe_relationship(&rebuilt[0].target_path).unwrap();
        assert_eq!(desc.cardinality, "OneToMany");
        assert_eq!(desc.origin_class_names, vec!["nybb"]);
    }

    #[test]
    fn test_rebuild_attributed_returns_join_table() {
        let source = source_with(true);
        let mut target = target_for(&source);
        let catalog = Catalog::walk(&source, Path::new("/out/new.gdb")).unwrap();

        let rebuilt = RelationshipRebuilder::new(&catalog)
            .rebuild_all(&source, &mut target)
            .unwrap();
        let join = rebuilt[0].join_table.as_ref().unwrap();
        assert_eq!(join.kind, LoadKind::AttributedTable);
        assert_eq!(join.source_path, PathBuf::from("/src/sample.gdb/Admin/BoroHood"));
        assert_eq!(join.target_path, PathBuf::from("/out/new.gdb/Admin/BoroHood"));
        assert!(target.item_exists(&join.target_path));
    }

    #[test]
    fn test_join_tables_reads_source_only() {
        let source = source_with(true);
        let catalog = Catalog::walk(&source, Path::new("/out/new.gdb")).unwrap();

        let items = RelationshipRebuilder::new(&catalog).join_tables(&source).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "BoroHood");
        assert_eq!(items[0].target_path, PathBuf::from("/out/new.gdb/Admin/BoroHood"));

        let simple = source_with(false);
        let catalog = Catalog::walk(&simple, Path::new("/out/new.gdb")).unwrap();
        assert!(RelationshipRebuilder::new(&catalog)
            .join_tables(&simple)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rebuild_twice_replaces() {
        let source = source_with(false);
        let mut target = target_for(&source);
        let catalog = Catalog::walk(&source, Path::new("/out/new.gdb")).unwrap();
        let rebuilder = RelationshipRebuilder::new(&catalog);

        let first = rebuilder.rebuild_all(&source, &mut target).unwrap();
        let before = target.describe_relationship(&first[0].target_path).unwrap();
        rebuilder.rebuild_all(&source, &mut target).unwrap();
        let after = target.describe_relationship(&first[0].target_path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_ambiguous_relationship_creates_nothing() {
        let mut source = source_with(false);
        // Walked after BoroHood, which is valid
        source
            .create_relationship_class(
                Path::new("/src/sample.gdb/Admin/nybb"),
                Path::new("/src/sample.gdb/NEIGHBORHOODS"),
                Path::new("/src/sample.gdb/Admin/ZZRel"),
                "SIMPLE",
                "",
                "",
                "NONE",
                "ONE_TO_MANY",
                "NONE",
                "BoroCode",
                "",
                "",
                "BoroCode",
            )
            .unwrap();
        source
            .relationship_description_mut(Path::new("/src/sample.gdb/Admin/ZZRel"))
            .unwrap()
            .origin_class_names
            .push("nybb_wi".into());

        let mut target = target_for(&source);
        let catalog = Catalog::walk(&source, Path::new("/out/new.gdb")).unwrap();
        let names: Vec<_> = catalog
            .of_type(EntityType::RelationshipClass)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["BoroHood", "ZZRel"]);

        let err = RelationshipRebuilder::new(&catalog)
            .rebuild_all(&source, &mut target)
            .unwrap_err();
        assert!(matches!(err, MigrateError::Ambiguity { ref relationship, .. } if relationship == "ZZRel"));
        assert!(!target.item_exists(Path::new("/out/new.gdb/Admin/BoroHood")));
        assert!(!target.item_exists(Path::new("/out/new.gdb/Admin/ZZRel")));
    }

    #[test]
    fn test_missing_origin_in_catalog_is_not_found() {
        let source = source_with(false);
        let mut target = target_for(&source);
        let catalog = Catalog::walk(&source, Path::new("/out/new.gdb")).unwrap();

        // Same relationship name, but its origin was never walked
        let mut renamed = source.clone();
        renamed.delete(Path::new("/src/sample.gdb/Admin/BoroHood")).unwrap();
        renamed
            .add_class("nybb_v2", None, ClassKind::Table, -1, fields())
            .unwrap();
        renamed
            .create_relationship_class(
                Path::new("/src/sample.gdb/nybb_v2"),
                Path::new("/src/sample.gdb/NEIGHBORHOODS"),
                Path::new("/src/sample.gdb/Admin/BoroHood"),
                "SIMPLE",
                "",
                "",
                "NONE",
                "ONE_TO_MANY",
                "NONE",
                "BoroCode",
                "",
                "",
                "BoroCode",
            )
            .unwrap();

        let err = RelationshipRebuilder::new(&catalog)
            .rebuild_all(&renamed, &mut target)
            .unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { ref kind, .. } if kind == "Origin item"));
    }
}
