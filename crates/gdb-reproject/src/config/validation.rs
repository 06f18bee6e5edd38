//! Configuration validation.

use super::Config;
use crate::descriptor::known_spatial_reference;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    known_spatial_reference(config.migration.spatial_reference_id)?;

    for (key, value) in [
        ("migration.original_descriptor", &config.migration.original_descriptor),
        ("migration.corrected_descriptor", &config.migration.corrected_descriptor),
        ("migration.cross_reference", &config.migration.cross_reference),
        ("logging.file_prefix", &config.logging.file_prefix),
        ("license.extension", &config.license.extension),
    ] {
        if value.trim().is_empty() {
            return Err(MigrateError::Config(format!("{} is required", key)));
        }
    }

    if config.migration.original_descriptor == config.migration.corrected_descriptor {
        return Err(MigrateError::Config(
            "migration.original_descriptor and migration.corrected_descriptor must differ".into(),
        ));
    }

    if let Some(ref path) = config.migration.schema_descriptor {
        if path.as_os_str().is_empty() {
            return Err(MigrateError::Config(
                "migration.schema_descriptor cannot be empty".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_unsupported_spatial_reference() {
        let mut config = Config::default();
        config.migration.spatial_reference_id = 4326;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedSpatialReference(4326)));
    }

    #[test]
    fn test_new_spatial_reference_accepted() {
        let mut config = Config::default();
        config.migration.spatial_reference_id = 6539;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_extension() {
        let mut config = Config::default();
        config.license.extension = " ".into();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("license.extension"));
    }

    #[test]
    fn test_descriptor_names_must_differ() {
        let mut config = Config::default();
        config.migration.corrected_descriptor = config.migration.original_descriptor.clone();
        assert!(validate(&config).is_err());
    }
}
