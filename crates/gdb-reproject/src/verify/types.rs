//! Report types for count verification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::catalog::Catalog;
use crate::transfer::LoadKind;

/// Row-count disparity for one entity. Informational, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMismatch {
    pub entity_name: String,
    pub kind: LoadKind,
    pub source_count: u64,
    pub target_count: u64,
}

/// Source and target row counts for one verified entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
    pub entity_name: String,
    pub kind: LoadKind,
    pub source_count: u64,
    pub target_count: u64,
}

impl EntityCount {
    pub fn matches(&self) -> bool {
        self.source_count == self.target_count
    }
}

/// Rows appended for one loaded entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedEntity {
    pub entity_name: String,
    pub kind: LoadKind,
    pub rows: u64,
}

/// Accumulates the report while the pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    per_type_counts: BTreeMap<String, usize>,
    loaded: Vec<LoadedEntity>,
    verified: Vec<EntityCount>,
    mismatches: Vec<CountMismatch>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the per-type entity counts from a walked catalog.
    pub fn record_catalog(&mut self, catalog: &Catalog) {
        self.per_type_counts = catalog
            .counts()
            .iter()
            .map(|(t, n)| (t.as_str().to_string(), *n))
            .collect();
    }

    pub fn record_load(&mut self, entity_name: &str, kind: LoadKind, rows: u64) {
        self.loaded.push(LoadedEntity {
            entity_name: entity_name.to_string(),
            kind,
            rows,
        });
    }

    /// Record a count comparison. A disparity is logged and kept as a
    /// mismatch.
    pub fn record_count(&mut self, count: EntityCount) {
        if !count.matches() {
            warn!(
                "@@@ Count mismatch for {} - Source = {} - Target = {}",
                count.entity_name, count.source_count, count.target_count
            );
            self.mismatches.push(CountMismatch {
                entity_name: count.entity_name.clone(),
                kind: count.kind,
                source_count: count.source_count,
                target_count: count.target_count,
            });
        }
        self.verified.push(count);
    }

    /// Mismatches recorded so far.
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    /// Freeze the report.
    pub fn finish(self) -> MigrationReport {
        MigrationReport {
            per_type_counts: self.per_type_counts,
            loaded: self.loaded,
            verified: self.verified,
            mismatches: self.mismatches,
        }
    }
}

/// Finished, read-only report of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    per_type_counts: BTreeMap<String, usize>,
    loaded: Vec<LoadedEntity>,
    verified: Vec<EntityCount>,
    mismatches: Vec<CountMismatch>,
}

impl MigrationReport {
    /// Catalog entries per entity type.
    pub fn per_type_counts(&self) -> &BTreeMap<String, usize> {
        &self.per_type_counts
    }

    pub fn loaded(&self) -> &[LoadedEntity] {
        &self.loaded
    }

    pub fn verified(&self) -> &[EntityCount] {
        &self.verified
    }

    /// Mismatches, in the order they were found.
    pub fn mismatches(&self) -> &[CountMismatch] {
        &self.mismatches
    }

    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    /// Total rows appended across all loads.
    pub fn rows_loaded(&self) -> u64 {
        self.loaded.iter().map(|l| l.rows).sum()
    }

    /// Check if every verified count matched.
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}
