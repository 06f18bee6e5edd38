//! Store schema metadata: spatial references, containers, object classes
//! and the store's own view of a relationship class.

use serde::{Deserialize, Serialize};

use super::value::FieldDef;

/// Spatial reference sentinel meaning "no spatial reference".
pub const NO_SPATIAL_REFERENCE: i64 = -1;

/// A spatial reference as carried by the schema descriptor.
///
/// Scale values are kept as strings so their decimal representation
/// survives a descriptor round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    /// Descriptor-local id referenced by containers and classes.
    pub id: i64,
    pub name: String,
    pub wkid: u32,
    pub wkt: String,
    pub z_tolerance: f64,
    pub xy_scale: String,
    pub z_scale: String,
    pub m_scale: String,
}

/// A feature dataset (sub-grouping) inside a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSchema {
    pub name: String,
    pub spatial_reference_id: i64,
}

/// Geometry type of a feature class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    Multipoint,
    Polyline,
    Polygon,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::Multipoint => "Multipoint",
            GeometryType::Polyline => "Polyline",
            GeometryType::Polygon => "Polygon",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Some(GeometryType::Point),
            "multipoint" => Some(GeometryType::Multipoint),
            "polyline" => Some(GeometryType::Polyline),
            "polygon" => Some(GeometryType::Polygon),
            _ => None,
        }
    }
}

/// Object class flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    FeatureClass(GeometryType),
    Table,
}

impl ClassKind {
    /// Dataset type name as reported by the store catalog.
    pub fn dataset_type(&self) -> &'static str {
        match self {
            ClassKind::FeatureClass(_) => "FeatureClass",
            ClassKind::Table => "Table",
        }
    }
}

/// Schema of one feature class or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSchema {
    pub name: String,
    /// Feature dataset holding the class; `None` for the store root.
    pub container: Option<String>,
    pub kind: ClassKind,
    pub spatial_reference_id: i64,
    pub fields: Vec<FieldDef>,
}

/// Everything needed to generate an empty store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSchema {
    pub spatial_references: Vec<SpatialReference>,
    pub containers: Vec<ContainerSchema>,
    pub classes: Vec<ClassSchema>,
}

impl StoreSchema {
    /// Find a spatial reference by descriptor id.
    pub fn spatial_reference(&self, id: i64) -> Option<&SpatialReference> {
        self.spatial_references.iter().find(|sr| sr.id == id)
    }
}

/// A key column of a relationship class together with its declared role
/// string (`OriginPrimary`, `OriginForeign`, `DestinationPrimary`,
/// `DestinationForeign`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassKey {
    pub field: String,
    pub role: String,
}

impl ClassKey {
    pub fn new(field: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            role: role.into(),
        }
    }
}

/// The store's own description of a relationship class.
///
/// Uses the store vocabulary: cardinality as `OneToMany`, attribution and
/// composition as booleans, notification as `None`/`Forward`/`Backward`/`Both`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDescription {
    pub name: String,
    pub data_type: String,
    pub origin_class_names: Vec<String>,
    pub destination_class_names: Vec<String>,
    pub cardinality: String,
    pub is_composite: bool,
    pub is_attributed: bool,
    pub forward_path_label: String,
    pub backward_path_label: String,
    pub notification: String,
    pub origin_class_keys: Vec<ClassKey>,
    pub destination_class_keys: Vec<ClassKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributed_table: Option<String>,
}
