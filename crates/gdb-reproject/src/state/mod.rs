//! File-based run record.
//!
//! Written after every phase transition so an operator can see how far a run
//! got. Runs are never resumed from it; a failed run restarts at
//! [`Phase::WalkSource`].

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name of the run record inside the work directory.
pub const STATE_FILE: &str = "run-state.json";

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WalkSource,
    GenerateTargetSchema,
    CreateRelationships,
    LoadTablesAndFeatureClasses,
    LoadAttributedJoinTables,
    VerifyCounts,
    Done,
    Failed,
}

impl Phase {
    /// The working phases, in order. Excludes the terminal states.
    pub const PIPELINE: [Phase; 6] = [
        Phase::WalkSource,
        Phase::GenerateTargetSchema,
        Phase::CreateRelationships,
        Phase::LoadTablesAndFeatureClasses,
        Phase::LoadAttributedJoinTables,
        Phase::VerifyCounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::WalkSource => "WalkSource",
            Phase::GenerateTargetSchema => "GenerateTargetSchema",
            Phase::CreateRelationships => "CreateRelationships",
            Phase::LoadTablesAndFeatureClasses => "LoadTablesAndFeatureClasses",
            Phase::LoadAttributedJoinTables => "LoadAttributedJoinTables",
            Phase::VerifyCounts => "VerifyCounts",
            Phase::Done => "Done",
            Phase::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    /// 1-based position in the pipeline, for log banners.
    pub fn number(&self) -> Option<usize> {
        Self::PIPELINE.iter().position(|p| p == self).map(|i| i + 1)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Record of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run identifier.
    pub run_id: String,

    /// SHA256 hash of the configuration.
    pub config_hash: String,

    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal phase.
    pub ended_at: Option<DateTime<Utc>>,

    /// Current phase.
    pub phase: Phase,

    /// Phases finished without a fatal error.
    pub completed_phases: Vec<Phase>,

    pub status: RunStatus,

    /// Phase that failed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,

    /// Error text of the fatal failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunState {
    pub fn new(run_id: String, config_hash: String) -> Self {
        Self {
            run_id,
            config_hash,
            started_at: Utc::now(),
            ended_at: None,
            phase: Phase::WalkSource,
            completed_phases: Vec::new(),
            status: RunStatus::Running,
            failed_phase: None,
            error: None,
        }
    }

    /// Enter `phase`.
    pub fn begin(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Mark the current phase as finished.
    pub fn complete_phase(&mut self) {
        if !self.phase.is_terminal() && !self.completed_phases.contains(&self.phase) {
            self.completed_phases.push(self.phase);
        }
    }

    /// Mark the run as completed.
    pub fn mark_completed(&mut self) {
        self.phase = Phase::Done;
        self.status = RunStatus::Completed;
        self.ended_at = Some(Utc::now());
    }

    /// Mark the run as failed in the current phase.
    pub fn mark_failed(&mut self, error: &str) {
        self.failed_phase = Some(self.phase);
        self.phase = Phase::Failed;
        self.status = RunStatus::Failed;
        self.error = Some(error.to_string());
        self.ended_at = Some(Utc::now());
    }

    /// Load a run record.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the run record (atomic write).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }
}
