//! Error types for the reprojection library.

use thiserror::Error;

/// Structural validation failures for relationship class parameters.
///
/// Each rule gets its own variant so callers can match on the exact
/// violation instead of parsing a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// relationship_type is not SIMPLE or COMPOSITE
    #[error("Invalid relationship_type: {0}")]
    InvalidRelationshipType(String),

    /// cardinality is not ONE_TO_ONE, ONE_TO_MANY or MANY_TO_MANY
    #[error("Invalid cardinality: {0}")]
    InvalidCardinality(String),

    /// attributed is not NONE or ATTRIBUTED
    #[error("Invalid attributed: {0}")]
    InvalidAttributed(String),

    /// message_direction or notification is not NONE, FORWARD, BACKWARD or BOTH
    #[error("Invalid message direction: {0}")]
    InvalidMessageDirection(String),

    /// Attributed relationships link through the origin foreign key
    #[error("origin_foreign_key required for attributed relationships")]
    MissingOriginForeignKey,
}

/// Main error type for reprojection operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, unsupported values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Relationship class parameters failed structural validation
    #[error("Structural validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A store or catalog entity that must exist is missing
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// A relationship resolves to more than one origin or destination class
    #[error("Relationship {relationship} has multiple {role} classes ({}) - only one is supported", .classes.join(", "))]
    Ambiguity {
        relationship: String,
        role: String,
        classes: Vec<String>,
    },

    /// A value read from the source store has no known translation
    #[error("Unexpected {field} encountered: {value}")]
    Translation { field: String, value: String },

    /// The schema-checked append found different columns
    #[error("Schema mismatch for {entity}: {detail}")]
    SchemaMismatch { entity: String, detail: String },

    /// The licensed capability could not be acquired
    #[error("Extension {0} is not available")]
    LicenseUnavailable(String),

    /// The spatial reference id has no known definition
    #[error("Unsupported spatial reference id: {0}")]
    UnsupportedSpatialReference(u32),

    /// Store primitive failed
    #[error("Store error: {0}")]
    Store(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema descriptor workbook could not be read
    #[error("Workbook read error: {0}")]
    WorkbookRead(#[from] calamine::XlsxError),

    /// Schema descriptor workbook could not be written
    #[error("Workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
}

impl MigrateError {
    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        MigrateError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a Store error
    pub fn store(message: impl Into<String>) -> Self {
        MigrateError::Store(message.into())
    }

    /// Create a SchemaMismatch error
    pub fn schema_mismatch(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        MigrateError::SchemaMismatch {
            entity: entity.into(),
            detail: detail.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// IO failures keep their own code; every other failure, including an
    /// unavailable license, exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Io(_) => 7,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for reprojection operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
