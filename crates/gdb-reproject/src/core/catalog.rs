//! Catalog walker and classifier.
//!
//! [`Catalog::walk`] takes a read-only snapshot of every entity in a source
//! store, classifies each one and records where its container lives in the
//! target store. The snapshot is never mutated after the walk.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};

use super::traits::GeoStore;

/// Classification of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    FeatureClass,
    Table,
    RelationshipClass,
    Other,
}

impl EntityType {
    /// Classify a store-reported dataset type.
    pub fn classify(dataset_type: &str) -> Self {
        match dataset_type.to_ascii_lowercase().as_str() {
            "featureclass" => EntityType::FeatureClass,
            "table" => EntityType::Table,
            "relationshipclass" => EntityType::RelationshipClass,
            _ => EntityType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::FeatureClass => "FeatureClass",
            EntityType::Table => "Table",
            EntityType::RelationshipClass => "RelationshipClass",
            EntityType::Other => "Other",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity found in the source store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub entity_type: EntityType,
    pub container_path: PathBuf,
}

impl CatalogEntry {
    /// Full path of the entity in the source store.
    pub fn path(&self) -> PathBuf {
        self.container_path.join(&self.name)
    }
}

/// Source container → target container.
///
/// Entities inside a feature dataset keep that dataset's name under the
/// target root; top-level entities map to the target root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapping {
    containers: HashMap<PathBuf, PathBuf>,
}

impl PathMapping {
    /// Record a mapping.
    pub fn insert(&mut self, source: PathBuf, target: PathBuf) {
        self.containers.insert(source, target);
    }

    /// Target container for a source container.
    pub fn target_container(&self, source: &Path) -> Option<&Path> {
        self.containers.get(source).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

/// Immutable snapshot of a walked source store.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, usize>,
    mapping: PathMapping,
    counts: BTreeMap<EntityType, usize>,
}

impl Catalog {
    /// Recursively enumerate `source`, mapping its containers under `target_root`.
    ///
    /// Fails with [`MigrateError::NotFound`] when the source store is missing,
    /// before anything else happens.
    pub fn walk(source: &dyn GeoStore, target_root: &Path) -> Result<Self> {
        if !source.exists() {
            return Err(MigrateError::not_found(
                "Source store",
                source.root().display().to_string(),
            ));
        }

        let mut catalog = Catalog {
            entries: Vec::new(),
            by_name: HashMap::new(),
            mapping: PathMapping::default(),
            counts: BTreeMap::new(),
        };

        let root = source.root().to_path_buf();
        catalog.mapping.insert(root.clone(), target_root.to_path_buf());

        let mut pending = vec![root];
        while let Some(container) = pending.pop() {
            let target_container = catalog
                .mapping
                .target_container(&container)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| target_root.to_path_buf());

            for item in source.list(&container)? {
                if item.is_container() {
                    let child = container.join(&item.name);
                    catalog
                        .mapping
                        .insert(child.clone(), target_container.join(&item.name));
                    pending.push(child);
                    continue;
                }

                let entity_type = EntityType::classify(&item.dataset_type);
                debug!(
                    "Name = {} - Type = {} ({}) - Target = {}",
                    item.name,
                    entity_type,
                    item.dataset_type,
                    target_container.display()
                );
                catalog.push(CatalogEntry {
                    name: item.name,
                    entity_type,
                    container_path: container.clone(),
                })?;
            }
        }

        Ok(catalog)
    }

    fn push(&mut self, entry: CatalogEntry) -> Result<()> {
        if self.by_name.contains_key(&entry.name) {
            return Err(MigrateError::store(format!(
                "Duplicate entity name in source store: {}",
                entry.name
            )));
        }
        *self.counts.entry(entry.entity_type).or_insert(0) += 1;
        self.by_name.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// All entries, in walk order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries of one type, in walk order.
    pub fn of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &CatalogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }

    /// Find an entry by name.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn mapping(&self) -> &PathMapping {
        &self.mapping
    }

    /// Per-type entry counts.
    pub fn counts(&self) -> &BTreeMap<EntityType, usize> {
        &self.counts
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target container for an entry.
    pub fn target_container(&self, entry: &CatalogEntry) -> Result<PathBuf> {
        self.mapping
            .target_container(&entry.container_path)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                MigrateError::not_found(
                    "Target container",
                    entry.container_path.display().to_string(),
                )
            })
    }

    /// Full path of an entry in the target store.
    pub fn target_path(&self, entry: &CatalogEntry) -> Result<PathBuf> {
        Ok(self.target_container(entry)?.join(&entry.name))
    }

    /// Log the per-type summary.
    pub fn log_summary(&self) {
        info!("-- Item counts");
        for (entity_type, count) in &self.counts {
            info!("----- {} - {}", entity_type, count);
        }
        info!("-- TOTAL NUMBER OF ITEMS = {}", self.len());
    }
}
