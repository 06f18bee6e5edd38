//! Workbook-backed schema interchange.
//!
//! Sheet layout (row 1 is the header, data from row 2):
//!
//! | Sheet               | Columns                                                   |
//! |---------------------|-----------------------------------------------------------|
//! | `SpatialReferences` | A id, B name, C wkid, D WKT, F z tolerance, K/N/Q scales   |
//! | `DatasetContainers` | A name, B dataset type, E spatial reference id             |
//! | `ObjectClasses`     | A name, B dataset type, C feature dataset, D geometry, J sr |
//! | `Fields`            | A object class, B field name, C field type                 |

use std::path::Path;

use tracing::info;

use crate::core::schema::{
    ClassKind, ClassSchema, ContainerSchema, GeometryType, SpatialReference, StoreSchema,
    NO_SPATIAL_REFERENCE,
};
use crate::core::traits::{GeoStore, SchemaInterchange, FEATURE_DATASET};
use crate::core::value::{FieldDef, FieldType};
use crate::error::{MigrateError, Result};
use crate::license::LicenseManager;

use super::spatial_reference::{DATASET_CONTAINERS_SR_COLUMN, OBJECT_CLASSES_SR_COLUMN};
use super::{
    CellValue, SchemaDescriptor, Sheet, DATASET_CONTAINERS_SHEET, FIELDS_SHEET,
    OBJECT_CLASSES_SHEET, SPATIAL_REFERENCES_SHEET,
};

/// Column letter and header of every column the interchange writes.
const SR_HEADERS: [(&str, &str); 8] = [
    ("A1", "ID"),
    ("B1", "Name"),
    ("C1", "FactoryCode"),
    ("D1", "WKT"),
    ("F1", "ZTolerance"),
    ("K1", "XYScale"),
    ("N1", "ZScale"),
    ("Q1", "MScale"),
];
const CONTAINER_HEADERS: [(&str, &str); 3] = [
    ("A1", "Name"),
    ("B1", "DatasetType"),
    ("E1", "SpatialReferenceID"),
];
const CLASS_HEADERS: [(&str, &str); 5] = [
    ("A1", "Name"),
    ("B1", "DatasetType"),
    ("C1", "FeatureDataset"),
    ("D1", "GeometryType"),
    ("J1", "SpatialReferenceID"),
];
const FIELD_HEADERS: [(&str, &str); 3] = [
    ("A1", "ObjectClass"),
    ("B1", "FieldName"),
    ("C1", "FieldType"),
];

/// [`SchemaInterchange`] over [`SchemaDescriptor`] workbooks.
///
/// Each call holds a token from the license manager for its duration.
#[derive(Debug, Clone)]
pub struct WorkbookInterchange {
    licenses: LicenseManager,
}

impl WorkbookInterchange {
    pub fn new(licenses: LicenseManager) -> Self {
        Self { licenses }
    }

    /// Lay `schema` out as a descriptor bound to `path` (not yet saved).
    pub fn to_descriptor(schema: &StoreSchema, path: &Path) -> Result<SchemaDescriptor> {
        let mut descriptor = SchemaDescriptor::new(path);

        let sheet = descriptor.add_sheet(SPATIAL_REFERENCES_SHEET);
        write_headers(sheet, &SR_HEADERS)?;
        for (i, sr) in schema.spatial_references.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.set_at(row, 0, sr.id);
            sheet.set_at(row, 1, sr.name.as_str());
            sheet.set_at(row, 2, sr.wkid as i64);
            sheet.set_at(row, 3, sr.wkt.as_str());
            sheet.set_at(row, 5, sr.z_tolerance);
            sheet.set_at(row, 10, sr.xy_scale.as_str());
            sheet.set_at(row, 13, sr.z_scale.as_str());
            sheet.set_at(row, 16, sr.m_scale.as_str());
        }

        let sheet = descriptor.add_sheet(DATASET_CONTAINERS_SHEET);
        write_headers(sheet, &CONTAINER_HEADERS)?;
        for (i, container) in schema.containers.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.set_at(row, 0, container.name.as_str());
            sheet.set_at(row, 1, FEATURE_DATASET);
            sheet.set_at(row, DATASET_CONTAINERS_SR_COLUMN, container.spatial_reference_id);
        }

        let sheet = descriptor.add_sheet(OBJECT_CLASSES_SHEET);
        write_headers(sheet, &CLASS_HEADERS)?;
        for (i, class) in schema.classes.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.set_at(row, 0, class.name.as_str());
            sheet.set_at(row, 1, class.kind.dataset_type());
            if let Some(ref container) = class.container {
                sheet.set_at(row, 2, container.as_str());
            }
            if let ClassKind::FeatureClass(geometry) = class.kind {
                sheet.set_at(row, 3, geometry.as_str());
            }
            sheet.set_at(row, OBJECT_CLASSES_SR_COLUMN, class.spatial_reference_id);
        }

        let sheet = descriptor.add_sheet(FIELDS_SHEET);
        write_headers(sheet, &FIELD_HEADERS)?;
        let mut row = 1;
        for class in &schema.classes {
            for field in &class.fields {
                sheet.set_at(row, 0, class.name.as_str());
                sheet.set_at(row, 1, field.name.as_str());
                sheet.set_at(row, 2, field.field_type.as_str());
                row += 1;
            }
        }

        Ok(descriptor)
    }

    /// Parse a descriptor back into a store schema.
    pub fn to_schema(descriptor: &SchemaDescriptor) -> Result<StoreSchema> {
        let mut schema = StoreSchema::default();

        let sheet = descriptor.sheet(SPATIAL_REFERENCES_SHEET)?;
        for row in data_rows(sheet) {
            if !sheet.get_at(row, 0).is_truthy() {
                continue;
            }
            let at = CellAt { sheet, row };
            schema.spatial_references.push(SpatialReference {
                id: at.integer(0)?,
                name: at.text(1)?,
                wkid: u32::try_from(at.integer(2)?).map_err(|_| at.invalid(2, "not a wkid"))?,
                wkt: at.text(3)?,
                z_tolerance: at.number(5)?,
                xy_scale: at.text(10)?,
                z_scale: at.text(13)?,
                m_scale: at.text(16)?,
            });
        }

        let sheet = descriptor.sheet(DATASET_CONTAINERS_SHEET)?;
        for row in data_rows(sheet) {
            if !sheet.get_at(row, 0).is_truthy() {
                continue;
            }
            let at = CellAt { sheet, row };
            schema.containers.push(ContainerSchema {
                name: at.text(0)?,
                spatial_reference_id: at.sr_id(DATASET_CONTAINERS_SR_COLUMN)?,
            });
        }

        let sheet = descriptor.sheet(OBJECT_CLASSES_SHEET)?;
        for row in data_rows(sheet) {
            if !sheet.get_at(row, 0).is_truthy() {
                continue;
            }
            let at = CellAt { sheet, row };
            let kind = match at.text(1)?.as_str() {
                "FeatureClass" => {
                    let geometry = at.text(3)?;
                    ClassKind::FeatureClass(
                        GeometryType::parse(&geometry)
                            .ok_or_else(|| at.invalid(3, "unknown geometry type"))?,
                    )
                }
                "Table" => ClassKind::Table,
                _ => return Err(at.invalid(1, "unknown dataset type")),
            };
            schema.classes.push(ClassSchema {
                name: at.text(0)?,
                container: at.optional_text(2),
                kind,
                spatial_reference_id: at.sr_id(OBJECT_CLASSES_SR_COLUMN)?,
                fields: Vec::new(),
            });
        }

        let sheet = descriptor.sheet(FIELDS_SHEET)?;
        for row in data_rows(sheet) {
            if !sheet.get_at(row, 0).is_truthy() {
                continue;
            }
            let at = CellAt { sheet, row };
            let class_name = at.text(0)?;
            let field_type = FieldType::parse(&at.text(2)?)
                .ok_or_else(|| at.invalid(2, "unknown field type"))?;
            let field = FieldDef::new(at.text(1)?, field_type);
            schema
                .classes
                .iter_mut()
                .find(|c| c.name == class_name)
                .ok_or_else(|| at.invalid(0, "unknown object class"))?
                .fields
                .push(field);
        }

        check_spatial_references(&schema)?;
        Ok(schema)
    }
}

impl SchemaInterchange for WorkbookInterchange {
    fn generate_descriptor(&self, store: &dyn GeoStore, descriptor: &Path) -> Result<()> {
        let _token = self.licenses.acquire()?;
        info!(
            "Generating schema descriptor {} from {}",
            descriptor.display(),
            store.root().display()
        );

        let workbook = Self::to_descriptor(&store.schema()?, descriptor)?;
        workbook.delete()?;
        workbook.save()
    }

    fn generate_store(&self, descriptor: &Path, target: &mut dyn GeoStore) -> Result<()> {
        let _token = self.licenses.acquire()?;
        info!(
            "Generating {} from schema descriptor {}",
            target.root().display(),
            descriptor.display()
        );

        let schema = Self::to_schema(&SchemaDescriptor::open(descriptor)?)?;
        if target.exists() {
            return Err(MigrateError::store(format!(
                "Target store already exists: {}",
                target.root().display()
            )));
        }
        target.create()?;
        target.apply_schema(&schema)
    }
}

fn write_headers(sheet: &mut Sheet, headers: &[(&str, &str)]) -> Result<()> {
    for (reference, header) in headers {
        sheet.set(reference, *header)?;
    }
    Ok(())
}

fn data_rows(sheet: &Sheet) -> impl Iterator<Item = u32> {
    1..=sheet.last_row().unwrap_or(0)
}

/// Every id referenced by a container or class must be defined.
fn check_spatial_references(schema: &StoreSchema) -> Result<()> {
    let referenced = schema
        .containers
        .iter()
        .map(|c| (c.name.as_str(), c.spatial_reference_id))
        .chain(
            schema
                .classes
                .iter()
                .map(|c| (c.name.as_str(), c.spatial_reference_id)),
        );
    for (name, id) in referenced {
        if id > 0 && schema.spatial_reference(id).is_none() {
            return Err(MigrateError::store(format!(
                "Invalid schema descriptor: {} references undefined spatial reference {}",
                name, id
            )));
        }
    }
    Ok(())
}

/// One descriptor row, for typed cell access with located errors.
struct CellAt<'a> {
    sheet: &'a Sheet,
    row: u32,
}

impl CellAt<'_> {
    fn invalid(&self, col: u16, detail: &str) -> MigrateError {
        MigrateError::store(format!(
            "Invalid schema descriptor: {} row {} column {}: {}",
            self.sheet.name(),
            self.row + 1,
            col + 1,
            detail
        ))
    }

    fn cell(&self, col: u16) -> &CellValue {
        self.sheet.get_at(self.row, col)
    }

    fn text(&self, col: u16) -> Result<String> {
        self.cell(col)
            .as_text()
            .ok_or_else(|| self.invalid(col, "missing value"))
    }

    fn optional_text(&self, col: u16) -> Option<String> {
        self.cell(col).as_text().filter(|s| !s.is_empty())
    }

    fn integer(&self, col: u16) -> Result<i64> {
        self.cell(col)
            .as_i64()
            .ok_or_else(|| self.invalid(col, "expected an integer"))
    }

    fn number(&self, col: u16) -> Result<f64> {
        match self.cell(col) {
            CellValue::Number(n) => Ok(*n),
            CellValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| self.invalid(col, "expected a number")),
            _ => Err(self.invalid(col, "expected a number")),
        }
    }

    /// Spatial reference id; an empty cell means none.
    fn sr_id(&self, col: u16) -> Result<i64> {
        match self.cell(col) {
            CellValue::Empty => Ok(NO_SPATIAL_REFERENCE),
            _ => self.integer(col),
        }
    }
}
