//! Reprojection orchestrator - main workflow coordinator.
//!
//! Runs the phases of [`Phase::PIPELINE`] strictly in order. A fatal error
//! stops the run where it happened; the target store is left as it was at
//! that point.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::catalog::Catalog;
use crate::core::traits::{GeoStore, SchemaInterchange};
use crate::descriptor::{update_all_spatial_reference, SchemaDescriptor};
use crate::error::Result;
use crate::relationship::RelationshipRebuilder;
use crate::state::{Phase, RunState, STATE_FILE};
use crate::transfer::{CrossReference, DataLoader, LoadItem, LoadKind};
use crate::verify::{CountVerifier, MigrationReport, ReportBuilder};

/// Reprojection orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Box<dyn GeoStore>,
    target: Box<dyn GeoStore>,
    interchange: Box<dyn SchemaInterchange>,
    workdir: PathBuf,
}

/// Result of a reprojection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    pub source_store: PathBuf,

    pub target_store: PathBuf,

    /// Spatial reference the target was generated with.
    pub spatial_reference_id: u32,

    /// Relationship classes recreated in the target.
    pub relationships_rebuilt: usize,

    /// Entities truncated and reloaded.
    pub entities_loaded: usize,

    /// Total rows appended.
    pub rows_loaded: u64,

    /// Entities whose source and target counts differ.
    pub mismatch_count: usize,

    /// Full report.
    pub report: MigrationReport,
}

/// Outputs of the working phases.
#[derive(Default)]
struct RunOutputs {
    relationships_rebuilt: usize,
}

impl Orchestrator {
    /// Create a new orchestrator. Intermediate files and the run record are
    /// written to `workdir`.
    pub fn new(
        config: Config,
        source: Box<dyn GeoStore>,
        target: Box<dyn GeoStore>,
        interchange: Box<dyn SchemaInterchange>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            interchange,
            workdir: workdir.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &dyn GeoStore {
        self.source.as_ref()
    }

    pub fn target(&self) -> &dyn GeoStore {
        self.target.as_ref()
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Path of the run record.
    pub fn state_file(&self) -> PathBuf {
        self.workdir.join(STATE_FILE)
    }

    /// Run the full pipeline.
    pub fn run(&mut self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let srid = self.config.migration.spatial_reference_id;

        // Refuse before any phase is entered or anything is touched.
        if let Err(e) = self.config.validate() {
            error!("{}", e.format_detailed());
            info!("REPROJECTION FAILED in configuration - 0 count mismatches");
            return Err(e);
        }

        fs::create_dir_all(&self.workdir)?;
        let mut state = RunState::new(run_id.clone(), self.config.hash());
        let mut report = ReportBuilder::new();

        info!("Starting reprojection run: {}", run_id);
        info!(
            "Reprojecting {} to {} with spatial reference {}",
            self.source.root().display(),
            self.target.root().display(),
            srid
        );

        let outcome = self.execute(&mut state, &mut report);
        let mismatches = report.mismatch_count();

        let outputs = match outcome {
            Ok(outputs) => {
                state.mark_completed();
                self.save_state(&state)?;
                outputs
            }
            Err(e) => {
                let phase = state.phase;
                error!(phase = %phase, "{}", e.format_detailed());
                state.mark_failed(&e.to_string());
                if let Err(save_err) = self.save_state(&state) {
                    warn!("Failed to save run state: {}", save_err);
                }
                info!(
                    "REPROJECTION FAILED in {} - {} count mismatches",
                    phase, mismatches
                );
                return Err(e);
            }
        };

        let report = report.finish();
        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = MigrationResult {
            run_id,
            status: "completed".to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            source_store: self.source.root().to_path_buf(),
            target_store: self.target.root().to_path_buf(),
            spatial_reference_id: srid,
            relationships_rebuilt: outputs.relationships_rebuilt,
            entities_loaded: report.loaded().len(),
            rows_loaded: report.rows_loaded(),
            mismatch_count: report.mismatch_count(),
            report,
        };

        info!(
            "Reprojection {}: {} entities, {} rows in {:.1}s",
            result.status, result.entities_loaded, result.rows_loaded, result.duration_seconds
        );
        info!(
            "REPROJECTION COMPLETE - {} count mismatches",
            result.mismatch_count
        );

        Ok(result)
    }

    fn execute(&mut self, state: &mut RunState, report: &mut ReportBuilder) -> Result<RunOutputs> {
        let mut outputs = RunOutputs::default();

        self.enter(state, Phase::WalkSource, "Walking source store")?;
        let catalog = Catalog::walk(self.source.as_ref(), self.target.root())?;
        catalog.log_summary();
        report.record_catalog(&catalog);
        state.complete_phase();

        self.enter(state, Phase::GenerateTargetSchema, "Generating target schema")?;
        self.generate_target_schema()?;
        state.complete_phase();

        self.enter(state, Phase::CreateRelationships, "Rebuilding relationship classes")?;
        let rebuilt =
            RelationshipRebuilder::new(&catalog).rebuild_all(self.source.as_ref(), self.target.as_mut())?;
        outputs.relationships_rebuilt = rebuilt.len();
        info!("Rebuilt {} relationship classes", rebuilt.len());
        let join_tables: Vec<LoadItem> = rebuilt.into_iter().filter_map(|r| r.join_table).collect();
        state.complete_phase();

        self.enter(
            state,
            Phase::LoadTablesAndFeatureClasses,
            "Loading feature classes and tables",
        )?;
        let plan = CrossReference::build(
            &catalog,
            self.source.root(),
            self.target.root(),
            join_tables,
        )?;
        plan.save(&self.workdir.join(&self.config.migration.cross_reference))?;
        let rows = self.load(&plan, &[LoadKind::FeatureClass, LoadKind::Table], report)?;
        info!("Loaded {} rows into feature classes and tables", rows);
        state.complete_phase();

        self.enter(
            state,
            Phase::LoadAttributedJoinTables,
            "Loading attributed relationship tables",
        )?;
        let rows = self.load(&plan, &[LoadKind::AttributedTable], report)?;
        info!("Loaded {} rows into attributed relationship tables", rows);
        state.complete_phase();

        self.enter(state, Phase::VerifyCounts, "Verifying record counts")?;
        if self.config.migration.verify_counts {
            CountVerifier::verify_plan(self.source.as_ref(), self.target.as_ref(), &plan, report)?;
        } else {
            info!("Count verification disabled");
        }
        state.complete_phase();

        Ok(outputs)
    }

    /// Produce the corrected descriptor and regenerate the target from it.
    fn generate_target_schema(&mut self) -> Result<()> {
        let migration = &self.config.migration;

        let original = match migration.schema_descriptor {
            Some(ref path) => {
                info!("Using schema descriptor {}", path.display());
                SchemaDescriptor::open(path)?
            }
            None => {
                let path = self.workdir.join(&migration.original_descriptor);
                self.interchange
                    .generate_descriptor(self.source.as_ref(), &path)?;
                SchemaDescriptor::open(path)?
            }
        };

        let corrected_path = self.workdir.join(&migration.corrected_descriptor);
        let mut corrected = original.copy_to(&corrected_path)?;
        update_all_spatial_reference(&mut corrected, migration.spatial_reference_id)?;
        corrected.save()?;

        if self.target.exists() {
            info!("Deleting existing {}", self.target.root().display());
            self.target.clean()?;
        }
        self.interchange
            .generate_store(&corrected_path, self.target.as_mut())
    }

    fn load(
        &mut self,
        plan: &CrossReference,
        kinds: &[LoadKind],
        report: &mut ReportBuilder,
    ) -> Result<u64> {
        let mut total = 0;
        for item in plan.items.iter().filter(|i| kinds.contains(&i.kind)) {
            let stats = DataLoader::load_item(self.source.as_ref(), self.target.as_mut(), item)?;
            report.record_load(&item.name, item.kind, stats.rows);
            total += stats.rows;
        }
        Ok(total)
    }

    fn enter(&self, state: &mut RunState, phase: Phase, banner: &str) -> Result<()> {
        state.begin(phase);
        info!("Phase {}: {}", phase.number().unwrap_or_default(), banner);
        self.save_state(state)
    }

    fn save_state(&self, state: &RunState) -> Result<()> {
        state.save(self.state_file())
    }

    /// Compare row counts of an existing target against the source without
    /// changing either store.
    pub fn validate(&self) -> Result<MigrationReport> {
        CountVerifier::validate_stores(self.source.as_ref(), self.target.as_ref())
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
