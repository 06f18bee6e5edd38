//! Data loading: the cross-reference load plan and the truncate/append loader.
//!
//! The orchestrator writes the load plan to the work directory as a
//! [`CrossReference`] before any rows move, then drives [`DataLoader`] over
//! it in two passes: feature classes and tables first, attributed join
//! tables second (their relationship classes must already exist).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::catalog::{Catalog, EntityType};
use crate::core::traits::GeoStore;
use crate::core::value::{FieldDef, Row};
use crate::error::{MigrateError, Result};

/// What kind of entity a load item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    FeatureClass,
    Table,
    /// Physical join table behind an attributed relationship class.
    AttributedTable,
}

impl LoadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadKind::FeatureClass => "FeatureClass",
            LoadKind::Table => "Table",
            LoadKind::AttributedTable => "AttributedTable",
        }
    }
}

/// One entity to move from source to target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadItem {
    pub name: String,
    pub kind: LoadKind,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
}

/// Cross-reference between source and target entities, persisted in the
/// work directory for the duration of the load phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReference {
    pub source_store: PathBuf,
    pub target_store: PathBuf,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LoadItem>,
}

impl CrossReference {
    /// Build the plan: feature classes, then tables (walk order), then the
    /// attributed join tables discovered while rebuilding relationships.
    pub fn build(
        catalog: &Catalog,
        source_store: &Path,
        target_store: &Path,
        attributed: Vec<LoadItem>,
    ) -> Result<Self> {
        let mut items = Vec::new();
        for (entity_type, kind) in [
            (EntityType::FeatureClass, LoadKind::FeatureClass),
            (EntityType::Table, LoadKind::Table),
        ] {
            for entry in catalog.of_type(entity_type) {
                items.push(LoadItem {
                    name: entry.name.clone(),
                    kind,
                    source_path: entry.path(),
                    target_path: catalog.target_path(entry)?,
                });
            }
        }

        for item in attributed {
            if items.iter().any(|i| i.name == item.name) {
                return Err(MigrateError::store(format!(
                    "Attributed table {} collides with an existing entity name",
                    item.name
                )));
            }
            items.push(item);
        }

        Ok(Self {
            source_store: source_store.to_path_buf(),
            target_store: target_store.to_path_buf(),
            created_at: Utc::now(),
            items,
        })
    }

    /// Items of one kind, in plan order.
    pub fn of_kind(&self, kind: LoadKind) -> impl Iterator<Item = &LoadItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    /// Write to `path`, replacing any previous plan (temp file then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Read a plan written by [`CrossReference::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Statistics from loading one entity.
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// Time spent reading source rows.
    pub read_time: Duration,

    /// Time spent truncating and appending.
    pub write_time: Duration,

    /// Rows appended to the target.
    pub rows: u64,

    /// Rows in the target after the append.
    pub target_rows: u64,
}

/// Truncate-then-append loader with a schema check.
pub struct DataLoader;

impl DataLoader {
    /// Truncate the target entity and append every source row.
    ///
    /// Columns must match by name (case-insensitive) and type; rows are
    /// reordered to the target's column order. A mismatch is fatal for the
    /// entity and fails before the target is touched.
    pub fn load_item(
        source: &dyn GeoStore,
        target: &mut dyn GeoStore,
        item: &LoadItem,
    ) -> Result<LoadStats> {
        info!(
            "{} - Copying {} to {}",
            item.name,
            item.source_path.display(),
            item.target_path.display()
        );

        if !target.item_exists(&item.target_path) {
            return Err(MigrateError::not_found(
                format!("Target {}", item.kind.as_str()),
                item.target_path.display().to_string(),
            ));
        }

        let source_fields = source.fields(&item.source_path)?;
        let target_fields = target.fields(&item.target_path)?;
        let column_map = match_columns(&item.name, &source_fields, &target_fields)?;

        let read_start = Instant::now();
        let rows = source.read_rows(&item.source_path)?;
        let read_time = read_start.elapsed();

        if rows.is_empty() {
            warn!("--- {} has no records", item.name);
        }

        let write_start = Instant::now();
        target.truncate(&item.target_path)?;
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| reorder(row, &column_map))
            .collect();
        let appended = target.append_rows(&item.target_path, rows)?;
        let target_rows = target.row_count(&item.target_path)?;
        let write_time = write_start.elapsed();

        if target_rows == 0 {
            warn!("--- {} has no records in target", item.name);
        }
        debug!(
            "{}: {} rows appended (read {:?}, write {:?})",
            item.name, appended, read_time, write_time
        );

        Ok(LoadStats {
            read_time,
            write_time,
            rows: appended,
            target_rows,
        })
    }
}

/// For each target column, the index of the matching source column.
fn match_columns(entity: &str, source: &[FieldDef], target: &[FieldDef]) -> Result<Vec<usize>> {
    if source.len() != target.len() {
        return Err(MigrateError::schema_mismatch(
            entity,
            format!(
                "source has {} columns, target has {}",
                source.len(),
                target.len()
            ),
        ));
    }

    target
        .iter()
        .map(|t| {
            let (idx, s) = source
                .iter()
                .enumerate()
                .find(|(_, s)| s.name.eq_ignore_ascii_case(&t.name))
                .ok_or_else(|| {
                    MigrateError::schema_mismatch(
                        entity,
                        format!("target column {} missing from source", t.name),
                    )
                })?;
            if s.field_type != t.field_type {
                return Err(MigrateError::schema_mismatch(
                    entity,
                    format!(
                        "column {} is {} in source but {} in target",
                        t.name,
                        s.field_type.as_str(),
                        t.field_type.as_str()
                    ),
                ));
            }
            Ok(idx)
        })
        .collect()
}

fn reorder(row: Row, column_map: &[usize]) -> Row {
    if column_map.iter().enumerate().all(|(i, &j)| i == j) {
        return row;
    }
    column_map.iter().map(|&j| row[j].clone()).collect()
}
