//! Local reference implementation of [`GeoStore`].
//!
//! A [`LocalStore`] keeps its contents in memory. When opened from a
//! directory it persists them to `catalog.json` inside that directory after
//! every mutation (write to a temp file, then rename).

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::schema::{
    ClassKey, ClassKind, ClassSchema, ContainerSchema, RelationshipDescription, SpatialReference,
    StoreSchema,
};
use crate::core::traits::{GeoStore, StoreItem, FEATURE_DATASET};
use crate::core::value::{FieldDef, FieldType, Row};
use crate::error::{MigrateError, Result};

/// File holding a persisted store's contents.
pub const CATALOG_FILE: &str = "catalog.json";

/// Base name of a store path: its file name up to the first `.`.
///
/// `/data/cscl_pub.gdb` has base name `cscl_pub`.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreContents {
    spatial_references: Vec<SpatialReference>,
    containers: Vec<ContainerSchema>,
    classes: Vec<StoredClass>,
    relationships: Vec<StoredRelationship>,
    others: Vec<StoredOther>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredClass {
    schema: ClassSchema,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRelationship {
    container: Option<String>,
    description: RelationshipDescription,
    /// Join table columns; empty unless attributed.
    fields: Vec<FieldDef>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredOther {
    name: String,
    container: Option<String>,
    dataset_type: String,
}

/// In-memory store, optionally persisted to a directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    catalog_file: Option<PathBuf>,
    present: bool,
    contents: StoreContents,
}

impl LocalStore {
    /// A store that lives only in memory. It does not exist until
    /// [`GeoStore::create`] is called.
    pub fn in_memory(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog_file: None,
            present: false,
            contents: StoreContents::default(),
        }
    }

    /// Open a directory-backed store. The directory need not exist yet, so
    /// an unopened path can still be cleaned or created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let catalog_file = root.join(CATALOG_FILE);
        let (present, contents) = if catalog_file.exists() {
            let content = fs::read_to_string(&catalog_file)?;
            (true, serde_json::from_str(&content)?)
        } else {
            (false, StoreContents::default())
        };

        Ok(Self {
            root,
            catalog_file: Some(catalog_file),
            present,
            contents,
        })
    }

    /// Store name without extension.
    pub fn basename(&self) -> String {
        basename(&self.root)
    }

    /// Check for leftover `*.lock` files in the store directory.
    pub fn has_locks(&self) -> bool {
        if self.catalog_file.is_none() {
            return false;
        }
        fs::read_dir(&self.root)
            .map(|entries| {
                entries.filter_map(|e| e.ok()).any(|e| {
                    e.path()
                        .extension()
                        .map(|ext| ext == "lock")
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }

    /// Copy the store to `out`, returning the copy.
    pub fn copy_to(&self, out: impl Into<PathBuf>) -> Result<LocalStore> {
        let out = out.into();
        self.require_present()?;

        match &self.catalog_file {
            Some(_) => {
                fs::create_dir_all(&out)?;
                for entry in fs::read_dir(&self.root)? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        fs::copy(entry.path(), out.join(entry.file_name()))?;
                    }
                }
                LocalStore::open(out)
            }
            None => {
                let mut copy = self.clone();
                copy.root = out;
                Ok(copy)
            }
        }
    }

    /// Register a spatial reference, replacing one with the same id.
    pub fn add_spatial_reference(&mut self, sr: SpatialReference) -> Result<()> {
        self.require_present()?;
        self.contents.spatial_references.retain(|s| s.id != sr.id);
        self.contents.spatial_references.push(sr);
        self.persist()
    }

    /// Add a feature dataset.
    pub fn add_container(&mut self, name: &str, spatial_reference_id: i64) -> Result<()> {
        self.require_present()?;
        if self.contents.containers.iter().any(|c| c.name == name) {
            return Err(MigrateError::store(format!(
                "Feature dataset already exists: {}",
                name
            )));
        }
        self.contents.containers.push(ContainerSchema {
            name: name.to_string(),
            spatial_reference_id,
        });
        self.persist()
    }

    /// Add an empty feature class or table.
    pub fn add_class(
        &mut self,
        name: &str,
        container: Option<&str>,
        kind: ClassKind,
        spatial_reference_id: i64,
        fields: Vec<FieldDef>,
    ) -> Result<()> {
        self.insert_class(ClassSchema {
            name: name.to_string(),
            container: container.map(str::to_string),
            kind,
            spatial_reference_id,
            fields,
        })?;
        self.persist()
    }

    /// Add a catalog entry the pipeline does not migrate (topology, etc.).
    pub fn add_other(
        &mut self,
        name: &str,
        container: Option<&str>,
        dataset_type: &str,
    ) -> Result<()> {
        self.require_present()?;
        self.require_container(container)?;
        self.ensure_unused(name)?;
        self.contents.others.push(StoredOther {
            name: name.to_string(),
            container: container.map(str::to_string),
            dataset_type: dataset_type.to_string(),
        });
        self.persist()
    }

    fn insert_class(&mut self, schema: ClassSchema) -> Result<()> {
        self.require_present()?;
        self.require_container(schema.container.as_deref())?;
        self.ensure_unused(&schema.name)?;
        self.contents.classes.push(StoredClass {
            schema,
            rows: Vec::new(),
        });
        Ok(())
    }

    fn require_present(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(MigrateError::not_found(
                "Store",
                self.root.display().to_string(),
            ))
        }
    }

    fn require_container(&self, container: Option<&str>) -> Result<()> {
        match container {
            Some(name) if !self.contents.containers.iter().any(|c| c.name == name) => Err(
                MigrateError::not_found("Feature dataset", name.to_string()),
            ),
            _ => Ok(()),
        }
    }

    fn ensure_unused(&self, name: &str) -> Result<()> {
        let taken = self.contents.classes.iter().any(|c| c.schema.name == name)
            || self
                .contents
                .relationships
                .iter()
                .any(|r| r.description.name == name)
            || self.contents.others.iter().any(|o| o.name == name);
        if taken {
            return Err(MigrateError::store(format!(
                "An entity named {} already exists in {}",
                name,
                self.root.display()
            )));
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(ref file) = self.catalog_file {
            let content = serde_json::to_vec(&self.contents)?;
            let temp_path = file.with_extension("tmp");
            fs::write(&temp_path, &content)?;
            fs::rename(&temp_path, file)?;
        }
        Ok(())
    }

    /// Split an entity path into (feature dataset, name).
    fn locate(&self, path: &Path) -> Result<(Option<String>, String)> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| MigrateError::not_found("Entity", path.display().to_string()))?;
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        match parts.as_slice() {
            [name] => Ok((None, name.clone())),
            [container, name] => Ok((Some(container.clone()), name.clone())),
            _ => Err(MigrateError::not_found(
                "Entity",
                path.display().to_string(),
            )),
        }
    }

    fn class_index(&self, path: &Path) -> Option<usize> {
        let (container, name) = self.locate(path).ok()?;
        self.contents
            .classes
            .iter()
            .position(|c| c.schema.name == name && c.schema.container == container)
    }

    fn relationship_index(&self, path: &Path) -> Option<usize> {
        let (container, name) = self.locate(path).ok()?;
        self.contents
            .relationships
            .iter()
            .position(|r| r.description.name == name && r.container == container)
    }

    /// Edit a stored relationship description in place, for shaping
    /// descriptions the relationship primitive never produces.
    #[cfg(test)]
    pub(crate) fn relationship_description_mut(
        &mut self,
        path: &Path,
    ) -> Option<&mut RelationshipDescription> {
        let i = self.relationship_index(path)?;
        Some(&mut self.contents.relationships[i].description)
    }

    fn other_index(&self, path: &Path) -> Option<usize> {
        let (container, name) = self.locate(path).ok()?;
        self.contents
            .others
            .iter()
            .position(|o| o.name == name && o.container == container)
    }

    fn table(&self, path: &Path) -> Result<(&[FieldDef], &Vec<Row>)> {
        self.require_present()?;
        if let Some(i) = self.class_index(path) {
            let class = &self.contents.classes[i];
            return Ok((&class.schema.fields, &class.rows));
        }
        if let Some(i) = self.relationship_index(path) {
            let rel = &self.contents.relationships[i];
            if rel.description.is_attributed {
                return Ok((&rel.fields, &rel.rows));
            }
            return Err(MigrateError::store(format!(
                "Relationship class {} is not attributed and has no rows",
                path.display()
            )));
        }
        Err(MigrateError::not_found("Table", path.display().to_string()))
    }

    fn table_mut(&mut self, path: &Path) -> Result<(&[FieldDef], &mut Vec<Row>)> {
        self.require_present()?;
        if let Some(i) = self.class_index(path) {
            let StoredClass { schema, rows } = &mut self.contents.classes[i];
            return Ok((&schema.fields, rows));
        }
        if let Some(i) = self.relationship_index(path) {
            let rel = &mut self.contents.relationships[i];
            if rel.description.is_attributed {
                return Ok((&rel.fields, &mut rel.rows));
            }
            return Err(MigrateError::store(format!(
                "Relationship class {} is not attributed and has no rows",
                path.display()
            )));
        }
        Err(MigrateError::not_found("Table", path.display().to_string()))
    }

    fn field_type_of(&self, class: usize, field: &str) -> FieldType {
        self.contents.classes[class]
            .schema
            .fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
            .map(|f| f.field_type)
            .filter(|t| *t != FieldType::ObjectId)
            .unwrap_or(FieldType::Integer)
    }
}

fn store_cardinality(cardinality: &str) -> Result<&'static str> {
    match cardinality {
        "ONE_TO_ONE" => Ok("OneToOne"),
        "ONE_TO_MANY" => Ok("OneToMany"),
        "MANY_TO_MANY" => Ok("ManyToMany"),
        other => Err(MigrateError::store(format!(
            "Invalid cardinality argument: {}",
            other
        ))),
    }
}

fn store_notification(direction: &str) -> Result<&'static str> {
    match direction {
        "NONE" => Ok("None"),
        "FORWARD" => Ok("Forward"),
        "BACKWARD" => Ok("Backward"),
        "BOTH" => Ok("Both"),
        other => Err(MigrateError::store(format!(
            "Invalid message direction argument: {}",
            other
        ))),
    }
}

fn keys(pairs: [(&str, &str); 2]) -> Vec<ClassKey> {
    pairs
        .into_iter()
        .filter(|(field, _)| !field.is_empty())
        .map(|(field, role)| ClassKey::new(field, role))
        .collect()
}

impl GeoStore for LocalStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self) -> bool {
        match &self.catalog_file {
            Some(file) => file.exists(),
            None => self.present,
        }
    }

    fn create(&mut self) -> Result<()> {
        if self.exists() {
            return Err(MigrateError::store(format!(
                "Store already exists: {}",
                self.root.display()
            )));
        }
        if self.catalog_file.is_some() {
            fs::create_dir_all(&self.root)?;
        }
        self.contents = StoreContents::default();
        self.present = true;
        self.persist()
    }

    fn clean(&mut self) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }
        debug!("Compacting {}", self.root.display());
        if self.catalog_file.is_some() {
            fs::remove_dir_all(&self.root)?;
        }
        self.contents = StoreContents::default();
        self.present = false;
        Ok(())
    }

    fn list(&self, container: &Path) -> Result<Vec<StoreItem>> {
        self.require_present()?;

        let scope = if container == self.root {
            None
        } else {
            let (parent, name) = self.locate(container)?;
            if parent.is_some() || !self.contents.containers.iter().any(|c| c.name == name) {
                return Err(MigrateError::not_found(
                    "Feature dataset",
                    container.display().to_string(),
                ));
            }
            Some(name)
        };

        let mut items = Vec::new();
        if scope.is_none() {
            items.extend(
                self.contents
                    .containers
                    .iter()
                    .map(|c| StoreItem::new(&c.name, FEATURE_DATASET)),
            );
        }
        items.extend(
            self.contents
                .classes
                .iter()
                .filter(|c| c.schema.container == scope)
                .map(|c| StoreItem::new(&c.schema.name, c.schema.kind.dataset_type())),
        );
        items.extend(
            self.contents
                .relationships
                .iter()
                .filter(|r| r.container == scope)
                .map(|r| StoreItem::new(&r.description.name, &r.description.data_type)),
        );
        items.extend(
            self.contents
                .others
                .iter()
                .filter(|o| o.container == scope)
                .map(|o| StoreItem::new(&o.name, &o.dataset_type)),
        );
        Ok(items)
    }

    fn item_exists(&self, path: &Path) -> bool {
        self.exists()
            && (self.class_index(path).is_some()
                || self.relationship_index(path).is_some()
                || self.other_index(path).is_some())
    }

    fn describe_relationship(&self, path: &Path) -> Result<RelationshipDescription> {
        self.require_present()?;
        self.relationship_index(path)
            .map(|i| self.contents.relationships[i].description.clone())
            .ok_or_else(|| {
                MigrateError::not_found("Relationship class", path.display().to_string())
            })
    }

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
    ) -> Result<()> {
        self.require_present()?;

        let origin_idx = self
            .class_index(origin)
            .ok_or_else(|| MigrateError::not_found("Origin class", origin.display().to_string()))?;
        let destination_idx = self.class_index(destination).ok_or_else(|| {
            MigrateError::not_found("Destination class", destination.display().to_string())
        })?;

        let (container, name) = self.locate(output)?;
        self.require_container(container.as_deref())?;
        self.ensure_unused(&name)?;

        let is_composite = match relationship_type {
            "SIMPLE" => false,
            "COMPOSITE" => true,
            other => {
                return Err(MigrateError::store(format!(
                    "Invalid relationship type argument: {}",
                    other
                )))
            }
        };
        let is_attributed = match attributed {
            "NONE" => false,
            "ATTRIBUTED" => true,
            other => {
                return Err(MigrateError::store(format!(
                    "Invalid attributed argument: {}",
                    other
                )))
            }
        };

        let mut fields = Vec::new();
        if is_attributed {
            fields.push(FieldDef::new("RID", FieldType::ObjectId));
            if !origin_foreign_key.is_empty() {
                let field_type = self.field_type_of(origin_idx, origin_primary_key);
                fields.push(FieldDef::new(origin_foreign_key, field_type));
            }
            if !destination_foreign_key.is_empty() {
                let field_type = self.field_type_of(destination_idx, destination_primary_key);
                fields.push(FieldDef::new(destination_foreign_key, field_type));
            }
        }

        let description = RelationshipDescription {
            name: name.clone(),
            data_type: "RelationshipClass".to_string(),
            origin_class_names: vec![self.contents.classes[origin_idx].schema.name.clone()],
            destination_class_names: vec![self.contents.classes[destination_idx]
                .schema
                .name
                .clone()],
            cardinality: store_cardinality(cardinality)?.to_string(),
            is_composite,
            is_attributed,
            forward_path_label: forward_label.to_string(),
            backward_path_label: backward_label.to_string(),
            notification: store_notification(message_direction)?.to_string(),
            origin_class_keys: keys([
                (origin_primary_key, "OriginPrimary"),
                (origin_foreign_key, "OriginForeign"),
            ]),
            destination_class_keys: keys([
                (destination_primary_key, "DestinationPrimary"),
                (destination_foreign_key, "DestinationForeign"),
            ]),
            attributed_table: is_attributed.then(|| name.clone()),
        };

        self.contents.relationships.push(StoredRelationship {
            container,
            description,
            fields,
            rows: Vec::new(),
        });
        self.persist()
    }

    fn delete(&mut self, path: &Path) -> Result<()> {
        self.require_present()?;
        if let Some(i) = self.relationship_index(path) {
            self.contents.relationships.remove(i);
        } else if let Some(i) = self.class_index(path) {
            self.contents.classes.remove(i);
        } else if let Some(i) = self.other_index(path) {
            self.contents.others.remove(i);
        } else {
            return Err(MigrateError::not_found(
                "Entity",
                path.display().to_string(),
            ));
        }
        self.persist()
    }

    fn fields(&self, path: &Path) -> Result<Vec<FieldDef>> {
        let (fields, _) = self.table(path)?;
        Ok(fields.to_vec())
    }

    fn read_rows(&self, path: &Path) -> Result<Vec<Row>> {
        let (_, rows) = self.table(path)?;
        Ok(rows.clone())
    }

    fn truncate(&mut self, path: &Path) -> Result<()> {
        let (_, rows) = self.table_mut(path)?;
        rows.clear();
        self.persist()
    }

    fn append_rows(&mut self, path: &Path, new_rows: Vec<Row>) -> Result<u64> {
        let (fields, rows) = self.table_mut(path)?;
        let width = fields.len();
        if let Some(bad) = new_rows.iter().find(|r| r.len() != width) {
            return Err(MigrateError::store(format!(
                "Row for {} has {} values, expected {}",
                path.display(),
                bad.len(),
                width
            )));
        }
        let appended = new_rows.len() as u64;
        rows.extend(new_rows);
        self.persist()?;
        Ok(appended)
    }

    fn row_count(&self, path: &Path) -> Result<u64> {
        let (_, rows) = self.table(path)?;
        Ok(rows.len() as u64)
    }

    fn schema(&self) -> Result<StoreSchema> {
        self.require_present()?;
        Ok(StoreSchema {
            spatial_references: self.contents.spatial_references.clone(),
            containers: self.contents.containers.clone(),
            classes: self
                .contents
                .classes
                .iter()
                .map(|c| c.schema.clone())
                .collect(),
        })
    }

    fn apply_schema(&mut self, schema: &StoreSchema) -> Result<()> {
        self.require_present()?;
        for sr in &schema.spatial_references {
            self.contents.spatial_references.retain(|s| s.id != sr.id);
            self.contents.spatial_references.push(sr.clone());
        }
        for container in &schema.containers {
            if self.contents.containers.iter().any(|c| c.name == container.name) {
                return Err(MigrateError::store(format!(
                    "Feature dataset already exists: {}",
                    container.name
                )));
            }
            self.contents.containers.push(container.clone());
        }
        for class in &schema.classes {
            self.insert_class(class.clone())?;
        }
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::GeometryType;
    use crate::core::value::FieldValue;
    use tempfile::TempDir;

    fn borough_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("OBJECTID", FieldType::ObjectId),
            FieldDef::new("BoroCode", FieldType::SmallInteger),
            FieldDef::new("BoroName", FieldType::String),
        ]
    }

    fn memory_store() -> LocalStore {
        let mut store = LocalStore::in_memory("/tmp/sample.gdb");
        store.create().unwrap();
        store
            .add_class(
                "nybb",
                None,
                ClassKind::FeatureClass(GeometryType::Polygon),
                1,
                borough_fields(),
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

    #[test]
    fn test_basename() {
        assert_eq!(basename(Path::new("/data/cscl_pub.gdb")), "cscl_pub");
        assert_eq!(basename(Path::new("testsample.gdb")), "testsample");
    }

    #[test]
    fn test_directory_store_create_clean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("testsample.gdb");

        let mut store = LocalStore::open(&path).unwrap();
        assert!(!store.exists());
        assert_eq!(store.basename(), "testsample");

        store.create().unwrap();
        assert!(store.exists());
        assert!(path.join(CATALOG_FILE).exists());
        assert!(!store.has_locks());

        store.clean().unwrap();
        assert!(!store.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_has_locks_detects_lock_files() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open(dir.path().join("locked.gdb")).unwrap();
        store.create().unwrap();
        fs::write(dir.path().join("locked.gdb").join("_gdb.sr.lock"), b"").unwrap();
        assert!(store.has_locks());
    }

    #[test]
    fn test_directory_store_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persist.gdb");

        let mut store = LocalStore::open(&path).unwrap();
        store.create().unwrap();
        store
            .add_class("NEIGHBORHOODS", None, ClassKind::Table, -1, vec![
                FieldDef::new("OBJECTID", FieldType::ObjectId),
            ])
            .unwrap();
        let table = path.join("NEIGHBORHOODS");
        store
            .append_rows(&table, vec![vec![FieldValue::Integer(1)]])
            .unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert!(reopened.item_exists(&table));
        assert_eq!(reopened.row_count(&table).unwrap(), 1);
    }

    #[test]
    fn test_copy_to() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open(dir.path().join("a.gdb")).unwrap();
        store.create().unwrap();
        store.add_container("Transportation", 1).unwrap();

        let copy = store.copy_to(dir.path().join("b.gdb")).unwrap();
        assert!(copy.exists());
        assert_eq!(copy.schema().unwrap().containers.len(), 1);
    }

    #[test]
    fn test_list_root_and_dataset() {
        let mut store = memory_store();
        store.add_container("Transportation", 1).unwrap();
        store
            .add_class(
                "Centerline",
                Some("Transportation"),
                ClassKind::FeatureClass(GeometryType::Polyline),
                1,
                vec![FieldDef::new("OBJECTID", FieldType::ObjectId)],
            )
            .unwrap();

        let root = store.list(Path::new("/tmp/sample.gdb")).unwrap();
        let names: Vec<_> = root.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Transportation", "nybb", "NEIGHBORHOODS"]);
        assert!(root[0].is_container());

        let dataset = store
            .list(Path::new("/tmp/sample.gdb/Transportation"))
            .unwrap();
        assert_eq!(dataset, vec![StoreItem::new("Centerline", "FeatureClass")]);

        assert!(store.list(Path::new("/tmp/sample.gdb/Nope")).is_err());
    }

    #[test]
    fn test_create_relationship_class_uses_store_vocabulary() {
        let mut store = memory_store();
        let rel = Path::new("/tmp/sample.gdb/Boroughs_Neighborhoods_Rel");
        store
            .create_relationship_class(
                Path::new("/tmp/sample.gdb/nybb"),
                Path::new("/tmp/sample.gdb/NEIGHBORHOODS"),
                rel,
                "SIMPLE",
                "Neighborhoods",
                "Borough",
                "FORWARD",
                "ONE_TO_MANY",
                "NONE",
                "BoroCode",
                "",
                "",
                "BOROCODE",
            )
            .unwrap();

        let desc = store.describe_relationship(rel).unwrap();
        assert_eq!(desc.cardinality, "OneToMany");
        assert_eq!(desc.notification, "Forward");
        assert!(!desc.is_attributed);
        assert_eq!(desc.origin_class_names, vec!["nybb"]);
        assert_eq!(
            desc.origin_class_keys,
            vec![ClassKey::new("BoroCode", "OriginPrimary")]
        );
        assert_eq!(
            desc.destination_class_keys,
            vec![ClassKey::new("BOROCODE", "DestinationForeign")]
        );
        assert!(store.row_count(rel).is_err());
    }

    #[test]
    fn test_attributed_relationship_has_join_table() {
        let mut store = memory_store();
        let rel = Path::new("/tmp/sample.gdb/BoroHood");
        store
            .create_relationship_class(
                Path::new("/tmp/sample.gdb/nybb"),
                Path::new("/tmp/sample.gdb/NEIGHBORHOODS"),
                rel,
                "SIMPLE",
                "",
                "",
                "NONE",
                "MANY_TO_MANY",
                "ATTRIBUTED",
                "BoroCode",
                "BoroFK",
                "BOROCODE",
                "HoodFK",
            )
            .unwrap();

        let fields = store.fields(rel).unwrap();
        assert_eq!(
            fields,
            vec![
                FieldDef::new("RID", FieldType::ObjectId),
                FieldDef::new("BoroFK", FieldType::SmallInteger),
                FieldDef::new("HoodFK", FieldType::SmallInteger),
            ]
        );
        assert_eq!(store.row_count(rel).unwrap(), 0);
        let desc = store.describe_relationship(rel).unwrap();
        assert_eq!(desc.attributed_table.as_deref(), Some("BoroHood"));
    }

    #[test]
    fn test_create_relationship_requires_classes() {
        let mut store = memory_store();
        let err = store
            .create_relationship_class(
                Path::new("/tmp/sample.gdb/missing"),
                Path::new("/tmp/sample.gdb/NEIGHBORHOODS"),
                Path::new("/tmp/sample.gdb/Rel"),
                "SIMPLE",
                "",
                "",
                "NONE",
                "ONE_TO_MANY",
                "NONE",
                "BoroCode",
                "",
                "",
                "BOROCODE",
            )
            .unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { .. }));
    }

    #[test]
    fn test_append_truncate_count() {
        let mut store = memory_store();
        let nybb = Path::new("/tmp/sample.gdb/nybb");
        let rows = vec![
            vec![FieldValue::Integer(1), FieldValue::Integer(1), "Manhattan".into()],
            vec![FieldValue::Integer(2), FieldValue::Integer(2), "Bronx".into()],
        ];
        assert_eq!(store.append_rows(nybb, rows).unwrap(), 2);
        assert_eq!(store.row_count(nybb).unwrap(), 2);

        let short = vec![vec![FieldValue::Integer(3)]];
        assert!(store.append_rows(nybb, short).is_err());

        store.truncate(nybb).unwrap();
        assert_eq!(store.row_count(nybb).unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let mut store = memory_store();
        let err = store.delete(Path::new("/tmp/sample.gdb/ghost")).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { .. }));
        store.delete(Path::new("/tmp/sample.gdb/nybb")).unwrap();
        assert!(!store.item_exists(Path::new("/tmp/sample.gdb/nybb")));
    }

    #[test]
    fn test_apply_schema_round_trip() {
        let source = memory_store();
        let schema = source.schema().unwrap();

        let mut target = LocalStore::in_memory("/tmp/out.gdb");
        target.create().unwrap();
        target.apply_schema(&schema).unwrap();
        assert_eq!(target.schema().unwrap(), schema);

        // Applying twice collides on class names
        assert!(target.apply_schema(&schema).is_err());
    }
}
