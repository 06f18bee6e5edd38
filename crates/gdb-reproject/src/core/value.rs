//! Field types and row values carried between stores.
//!
//! Rows are moved as-is from source to target; geometry is kept in its
//! serialized form since coordinate transformation belongs to the store.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column type as declared by the store.
///
/// The serialized names match the schema descriptor's `Fields` sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "esriFieldTypeOID")]
    ObjectId,
    #[serde(rename = "esriFieldTypeSmallInteger")]
    SmallInteger,
    #[serde(rename = "esriFieldTypeInteger")]
    Integer,
    #[serde(rename = "esriFieldTypeDouble")]
    Double,
    #[serde(rename = "esriFieldTypeString")]
    String,
    #[serde(rename = "esriFieldTypeDate")]
    Date,
    #[serde(rename = "esriFieldTypeGUID")]
    Guid,
    #[serde(rename = "esriFieldTypeGlobalID")]
    GlobalId,
    #[serde(rename = "esriFieldTypeGeometry")]
    Geometry,
    #[serde(rename = "esriFieldTypeBlob")]
    Blob,
}

impl FieldType {
    /// Descriptor name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ObjectId => "esriFieldTypeOID",
            FieldType::SmallInteger => "esriFieldTypeSmallInteger",
            FieldType::Integer => "esriFieldTypeInteger",
            FieldType::Double => "esriFieldTypeDouble",
            FieldType::String => "esriFieldTypeString",
            FieldType::Date => "esriFieldTypeDate",
            FieldType::Guid => "esriFieldTypeGUID",
            FieldType::GlobalId => "esriFieldTypeGlobalID",
            FieldType::Geometry => "esriFieldTypeGeometry",
            FieldType::Blob => "esriFieldTypeBlob",
        }
    }

    /// Parse a descriptor type name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            FieldType::ObjectId,
            FieldType::SmallInteger,
            FieldType::Integer,
            FieldType::Double,
            FieldType::String,
            FieldType::Date,
            FieldType::Guid,
            FieldType::GlobalId,
            FieldType::Geometry,
            FieldType::Blob,
        ];
        all.into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
    Date(NaiveDateTime),
    Guid(Uuid),
    /// Serialized geometry, passed through untouched.
    Geometry(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Guid(v)
    }
}

/// One row, aligned with the owning entity's field list.
pub type Row = Vec<FieldValue>;
