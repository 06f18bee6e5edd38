//! Row-count verification between source and target.
//!
//! Counts are compared per loaded entity, grouped by kind so the operator
//! gets one summary line per group. Disparities go into the report and are
//! logged as warnings; they never stop a run.

pub mod types;

pub use types::{CountMismatch, EntityCount, LoadedEntity, MigrationReport, ReportBuilder};

use tracing::{info, warn};

use crate::core::catalog::Catalog;
use crate::core::traits::GeoStore;
use crate::error::{MigrateError, Result};
use crate::relationship::RelationshipRebuilder;
use crate::transfer::{CrossReference, LoadItem, LoadKind};

/// Compares source and target row counts.
pub struct CountVerifier;

impl CountVerifier {
    /// Count one entity in both stores and record the result.
    pub fn verify_item(
        source: &dyn GeoStore,
        target: &dyn GeoStore,
        item: &LoadItem,
        report: &mut ReportBuilder,
    ) -> Result<EntityCount> {
        let source_count = source.row_count(&item.source_path)?;
        let target_count = target.row_count(&item.target_path)?;

        if source_count == 0 {
            warn!("--- {} has no records", item.name);
        }

        let count = EntityCount {
            entity_name: item.name.clone(),
            kind: item.kind,
            source_count,
            target_count,
        };
        report.record_count(count.clone());
        Ok(count)
    }

    /// Verify every item of a load plan. Returns the number of mismatches
    /// found by this call.
    pub fn verify_plan(
        source: &dyn GeoStore,
        target: &dyn GeoStore,
        plan: &CrossReference,
        report: &mut ReportBuilder,
    ) -> Result<usize> {
        let mut total = 0;
        for (kind, label) in [
            (LoadKind::FeatureClass, "Feature Class"),
            (LoadKind::Table, "Table"),
            (LoadKind::AttributedTable, "Attributed Table"),
        ] {
            let items: Vec<_> = plan.of_kind(kind).collect();
            if items.is_empty() {
                continue;
            }

            info!("Counting Source and Target {} records", label);
            let mut mismatched = 0;
            for item in items {
                if !Self::verify_item(source, target, item, report)?.matches() {
                    mismatched += 1;
                }
            }

            if mismatched == 0 {
                info!("All {} record counts match", label);
            } else {
                warn!("@@@ {} {} record counts don't match", mismatched, label);
            }
            total += mismatched;
        }
        Ok(total)
    }

    /// Compare row counts of an existing target against its source without
    /// changing either store. Join tables come from the source's
    /// relationship descriptions.
    pub fn validate_stores(source: &dyn GeoStore, target: &dyn GeoStore) -> Result<MigrationReport> {
        info!(
            "Validating {} against {}",
            target.root().display(),
            source.root().display()
        );

        let catalog = Catalog::walk(source, target.root())?;
        if !target.exists() {
            return Err(MigrateError::not_found(
                "Target store",
                target.root().display().to_string(),
            ));
        }

        let join_tables = RelationshipRebuilder::new(&catalog).join_tables(source)?;
        let plan = CrossReference::build(&catalog, source.root(), target.root(), join_tables)?;

        let mut report = ReportBuilder::new();
        report.record_catalog(&catalog);
        let mismatches = Self::verify_plan(source, target, &plan, &mut report)?;
        info!("VALIDATION COMPLETE - {} count mismatches", mismatches);

        Ok(report.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ClassKind;
    use crate::core::value::{FieldDef, FieldType, FieldValue};
    use crate::store::LocalStore;
    use crate::transfer::DataLoader;
    use chrono::Utc;
    use std::path::{Path, PathBuf};

    fn store(root: &str, rows: i64) -> LocalStore {
        let mut store = LocalStore::in_memory(root);
        store.create().unwrap();
        store
            .add_class(
                "NEIGHBORHOODS",
                None,
                ClassKind::Table,
                -1,
                vec![FieldDef::new("OBJECTID", FieldType::ObjectId)],
            )
            .unwrap();
        let rows = (0..rows).map(|i| vec![FieldValue::Integer(i)]).collect();
        store
            .append_rows(&Path::new(root).join("NEIGHBORHOODS"), rows)
            .unwrap();
        store
    }

    fn plan() -> CrossReference {
        CrossReference {
            source_store: PathBuf::from("/src/sample.gdb"),
            target_store: PathBuf::from("/out/new.gdb"),
            created_at: Utc::now(),
            items: vec![LoadItem {
                name: "NEIGHBORHOODS".into(),
                kind: LoadKind::Table,
                source_path: PathBuf::from("/src/sample.gdb/NEIGHBORHOODS"),
                target_path: PathBuf::from("/out/new.gdb/NEIGHBORHOODS"),
            }],
        }
    }

    #[test]
    fn test_full_load_has_no_mismatches() {
        let source = store("/src/sample.gdb", 195);
        let mut target = store("/out/new.gdb", 0);
        let plan = plan();

        for item in plan.of_kind(LoadKind::Table) {
            DataLoader::load_item(&source, &mut target, item).unwrap();
        }

        let mut report = ReportBuilder::new();
        let mismatches = CountVerifier::verify_plan(&source, &target, &plan, &mut report).unwrap();
        assert_eq!(mismatches, 0);

        let report = report.finish();
        assert!(report.is_clean());
        assert_eq!(report.verified()[0].target_count, 195);
    }

    #[test]
    fn test_mismatch_is_recorded_not_raised() {
        let source = store("/src/sample.gdb", 4);
        let target = store("/out/new.gdb", 3);

        let mut report = ReportBuilder::new();
        let mismatches = CountVerifier::verify_plan(&source, &target, &plan(), &mut report).unwrap();
        assert_eq!(mismatches, 1);

        let report = report.finish();
        assert_eq!(
            report.mismatches(),
            &[CountMismatch {
                entity_name: "NEIGHBORHOODS".into(),
                kind: LoadKind::Table,
                source_count: 4,
                target_count: 3,
            }]
        );
    }

    #[test]
    fn test_missing_target_entity_is_an_error() {
        let source = store("/src/sample.gdb", 1);
        let mut target = LocalStore::in_memory("/out/new.gdb");
        target.create().unwrap();

        let mut report = ReportBuilder::new();
        let err = CountVerifier::verify_plan(&source, &target, &plan(), &mut report).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { .. }));
    }

    #[test]
    fn test_validate_stores_leaves_target_untouched() {
        let source = store("/src/sample.gdb", 5);
        let target = store("/out/new.gdb", 5);

        let report = CountVerifier::validate_stores(&source, &target).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.verified().len(), 1);
        assert_eq!(target.row_count(Path::new("/out/new.gdb/NEIGHBORHOODS")).unwrap(), 5);
    }

    #[test]
    fn test_validate_stores_requires_target() {
        let source = store("/src/sample.gdb", 1);
        let target = LocalStore::in_memory("/out/new.gdb");

        let err = CountVerifier::validate_stores(&source, &target).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { .. }));
    }
}
