//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration for the run record.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl LoggingConfig {
    /// Directory for run log files: `log_dir`, else the `log_dir_env`
    /// variable, else `fallback`.
    pub fn resolve_dir(&self, fallback: &Path) -> std::path::PathBuf {
        if let Some(ref dir) = self.log_dir {
            return dir.clone();
        }
        match std::env::var_os(&self.log_dir_env) {
            Some(dir) if !dir.is_empty() => dir.into(),
            _ => fallback.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.migration.spatial_reference_id, 2263);
        assert_eq!(config.license.extension, "Foundation");
        assert_eq!(config.logging.log_dir_env, "TARGETLOGDIR");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
migration:
  spatial_reference_id: 6539
  schema_descriptor: /data/schema.xlsx
  verify_counts: false
logging:
  log_dir: /var/log/reproject
license:
  available: [Foundation, Spatial]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.migration.spatial_reference_id, 6539);
        assert_eq!(
            config.migration.schema_descriptor,
            Some(PathBuf::from("/data/schema.xlsx"))
        );
        assert!(!config.migration.verify_counts);
        assert_eq!(config.migration.cross_reference, "object_map.json");
        assert_eq!(config.license.available.len(), 2);
    }

    #[test]
    fn test_invalid_yaml_rejected_on_load() {
        assert!(Config::from_yaml("migration:\n  spatial_reference_id: 4326\n").is_err());
        assert!(Config::from_yaml("migration: [").is_err());
    }

    #[test]
    fn test_hash_tracks_changes() {
        let a = Config::default();
        let mut b = Config::default();
        assert_eq!(a.hash(), b.hash());
        b.migration.spatial_reference_id = 6539;
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_explicit_log_dir_wins() {
        let logging = LoggingConfig {
            log_dir: Some(PathBuf::from("/logs")),
            ..Default::default()
        };
        assert_eq!(logging.resolve_dir(Path::new("/work")), PathBuf::from("/logs"));
    }

    #[test]
    fn test_log_dir_falls_back() {
        let logging = LoggingConfig {
            log_dir_env: "GDB_REPROJECT_TEST_UNSET_LOG_DIR".into(),
            ..Default::default()
        };
        assert_eq!(logging.resolve_dir(Path::new("/work")), PathBuf::from("/work"));
    }
}
