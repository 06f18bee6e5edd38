//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::descriptor::LEGACY_SPATIAL_REFERENCE_ID;

/// Root configuration structure. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline behavior.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Log file placement.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Licensed extension used by the schema interchange.
    #[serde(default)]
    pub license: LicenseConfig,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Spatial reference of the target store (default: 2263).
    #[serde(default = "default_spatial_reference_id")]
    pub spatial_reference_id: u32,

    /// Externally supplied schema descriptor. Derived from the source when
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_descriptor: Option<PathBuf>,

    /// Descriptor generated from the source, inside the work directory.
    #[serde(default = "default_original_descriptor")]
    pub original_descriptor: String,

    /// Descriptor rewritten to the new spatial reference, inside the work
    /// directory.
    #[serde(default = "default_corrected_descriptor")]
    pub corrected_descriptor: String,

    /// Cross-reference file inside the work directory.
    #[serde(default = "default_cross_reference")]
    pub cross_reference: String,

    /// Compare source and target row counts after loading (default: true).
    #[serde(default = "default_true")]
    pub verify_counts: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            spatial_reference_id: default_spatial_reference_id(),
            schema_descriptor: None,
            original_descriptor: default_original_descriptor(),
            corrected_descriptor: default_corrected_descriptor(),
            cross_reference: default_cross_reference(),
            verify_counts: true,
        }
    }
}

/// Log file configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for run log files. Takes precedence over `log_dir_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Environment variable naming the log directory (default: TARGETLOGDIR).
    #[serde(default = "default_log_dir_env")]
    pub log_dir_env: String,

    /// Log file name prefix (default: reprojectgdb).
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_dir_env: default_log_dir_env(),
            file_prefix: default_file_prefix(),
        }
    }
}

/// License configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Extension the schema interchange needs (default: Foundation).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Extensions the local provider can grant.
    #[serde(default = "default_available")]
    pub available: Vec<String>,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            available: default_available(),
        }
    }
}

fn default_spatial_reference_id() -> u32 {
    LEGACY_SPATIAL_REFERENCE_ID
}

fn default_original_descriptor() -> String {
    "OriginalProjection.xlsx".to_string()
}

fn default_corrected_descriptor() -> String {
    "CorrectedProjection.xlsx".to_string()
}

fn default_cross_reference() -> String {
    "object_map.json".to_string()
}

fn default_log_dir_env() -> String {
    "TARGETLOGDIR".to_string()
}

fn default_file_prefix() -> String {
    "reprojectgdb".to_string()
}

fn default_extension() -> String {
    "Foundation".to_string()
}

fn default_available() -> Vec<String> {
    vec![default_extension()]
}

fn default_true() -> bool {
    true
}
