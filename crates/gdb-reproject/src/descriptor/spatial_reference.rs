//! Rewriting a schema descriptor to carry a single spatial reference.
//!
//! The `SpatialReferences` sheet is replaced with one row (descriptor id 1)
//! and every feature dataset and object class that had a spatial reference
//! is pointed at it. Cell addresses and literal values are fixed by the
//! store-generation tooling that consumes the descriptor.

use tracing::info;

use crate::error::{MigrateError, Result};

use super::{
    CellValue, SchemaDescriptor, DATASET_CONTAINERS_SHEET, OBJECT_CLASSES_SHEET,
    SPATIAL_REFERENCES_SHEET,
};

/// Spatial reference id used when none is given.
pub const LEGACY_SPATIAL_REFERENCE_ID: u32 = 2263;

/// Inverse of the XY resolution (1 / 0.000328083333333333), kept as text.
pub const INVERSE_XY_RESOLUTION: &str = "3048.006096012195121164435877261997627062";

/// Z and M scale cells.
pub const SCALE_PLACEHOLDER: &str = "10000.";

/// Descriptor-local id every container and class is pointed at.
const DESCRIPTOR_SR_ID: i64 = 1;

/// Z tolerance sentinel.
const Z_TOLERANCE: i64 = -1;

/// Zero-based column of the spatial reference id in `DatasetContainers` (E).
pub const DATASET_CONTAINERS_SR_COLUMN: u16 = 4;

/// Zero-based column of the spatial reference id in `ObjectClasses` (J).
pub const OBJECT_CLASSES_SR_COLUMN: u16 = 9;

/// A spatial reference the rewrite knows how to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownSpatialReference {
    pub wkid: u32,
    pub name: &'static str,
    pub wkt: &'static str,
}

const NY_LONG_ISLAND_2263: KnownSpatialReference = KnownSpatialReference {
    wkid: 2263,
    name: "NAD_1983_StatePlane_New_York_Long_Island_FIPS_3104_Feet",
    wkt: concat!(
        "PROJCS[\"NAD_1983_StatePlane_New_York_Long_Island_FIPS_3104_Feet\",",
        "GEOGCS[\"GCS_North_American_1983\",",
        "DATUM[\"D_North_American_1983\",SPHEROID[\"GRS_1980\",6378137.0,298.257222101]],",
        "PRIMEM[\"Greenwich\",0.0],",
        "UNIT[\"Degree\",0.0174532925199433]],",
        "PROJECTION[\"Lambert_Conformal_Conic\"],",
        "PARAMETER[\"False_Easting\",984250.0],",
        "PARAMETER[\"False_Northing\",0.0],",
        "PARAMETER[\"Central_Meridian\",-74.0],",
        "PARAMETER[\"Standard_Parallel_1\",40.66666666666666],",
        "PARAMETER[\"Standard_Parallel_2\",41.03333333333333],",
        "PARAMETER[\"Latitude_Of_Origin\",40.16666666666666],",
        "UNIT[\"Foot_US\",0.3048006096012192]]"
    ),
};

const NY_LONG_ISLAND_6539: KnownSpatialReference = KnownSpatialReference {
    wkid: 6539,
    name: "NAD_1983_2011_StatePlane_New_York_Long_Isl_FIPS_3104_Ft_US",
    wkt: concat!(
        "PROJCS[\"NAD_1983_2011_StatePlane_New_York_Long_Isl_FIPS_3104_Ft_US\",",
        "GEOGCS[\"GCS_NAD_1983_2011\",",
        "DATUM[\"D_NAD_1983_2011\",SPHEROID[\"GRS_1980\",6378137.0,298.257222101]],",
        "PRIMEM[\"Greenwich\",0.0],",
        "UNIT[\"Degree\",0.0174532925199433]],",
        "PROJECTION[\"Lambert_Conformal_Conic\"],",
        "PARAMETER[\"False_Easting\",984250.0],",
        "PARAMETER[\"False_Northing\",0.0],",
        "PARAMETER[\"Central_Meridian\",-74.0],",
        "PARAMETER[\"Standard_Parallel_1\",40.66666666666666],",
        "PARAMETER[\"Standard_Parallel_2\",41.03333333333333],",
        "PARAMETER[\"Latitude_Of_Origin\",40.16666666666666],",
        "UNIT[\"Foot_US\",0.3048006096012192],",
        "AUTHORITY[\"EPSG\",6539]]"
    ),
};

/// Look up a spatial reference by id.
pub fn known_spatial_reference(id: u32) -> Result<KnownSpatialReference> {
    match id {
        2263 => Ok(NY_LONG_ISLAND_2263),
        6539 => Ok(NY_LONG_ISLAND_6539),
        other => Err(MigrateError::UnsupportedSpatialReference(other)),
    }
}

/// Cell values written to the `SpatialReferences` sheet for `id`.
pub fn spatial_reference_cells(id: u32) -> Result<Vec<(&'static str, CellValue)>> {
    let sr = known_spatial_reference(id)?;
    Ok(vec![
        ("A2", CellValue::from(DESCRIPTOR_SR_ID)),
        ("B2", CellValue::from(sr.name)),
        ("C2", CellValue::from(sr.wkid as i64)),
        ("D2", CellValue::from(sr.wkt)),
        ("F2", CellValue::from(Z_TOLERANCE)),
        ("K2", CellValue::from(INVERSE_XY_RESOLUTION)),
        ("N2", CellValue::from(SCALE_PLACEHOLDER)),
        ("Q2", CellValue::from(SCALE_PLACEHOLDER)),
    ])
}

/// Point every set, non-sentinel id in a column (rows 2 and down) at id 1.
fn repoint_column(descriptor: &mut SchemaDescriptor, sheet: &str, col: u16) -> Result<usize> {
    let mut changed = 0;
    for (_, cell) in descriptor.sheet_mut(sheet)?.column_mut(col, 1) {
        if cell.is_truthy() && *cell != CellValue::Number(Z_TOLERANCE as f64) {
            *cell = CellValue::from(DESCRIPTOR_SR_ID);
            changed += 1;
        }
    }
    Ok(changed)
}

/// Rewrite `descriptor` in memory so everything uses spatial reference `id`.
///
/// Fails with [`MigrateError::UnsupportedSpatialReference`] before touching
/// the descriptor when `id` is unknown.
pub fn update_all_spatial_reference(descriptor: &mut SchemaDescriptor, id: u32) -> Result<()> {
    let cells = spatial_reference_cells(id)?;
    info!("Updating spatial reference in {} to {}", descriptor.path().display(), id);

    let sheet = descriptor.sheet_mut(SPATIAL_REFERENCES_SHEET)?;
    sheet.clear_from_row(1);
    for (reference, value) in cells {
        sheet.set(reference, value)?;
    }

    let containers = repoint_column(descriptor, DATASET_CONTAINERS_SHEET, DATASET_CONTAINERS_SR_COLUMN)?;
    let classes = repoint_column(descriptor, OBJECT_CLASSES_SHEET, OBJECT_CLASSES_SR_COLUMN)?;
    info!(
        "Pointed {} feature datasets and {} object classes at spatial reference {}",
        containers, classes, id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FIELDS_SHEET;
    use tempfile::TempDir;

    fn legacy_descriptor(path: &std::path::Path) -> SchemaDescriptor {
        let mut d = SchemaDescriptor::new(path);
        let sr = d.add_sheet(SPATIAL_REFERENCES_SHEET);
        sr.set("A1", "ID").unwrap();
        sr.set("A2", 1i64).unwrap();
        sr.set("B2", "legacy").unwrap();
        sr.set("K2", "3048.006096").unwrap();
        sr.set("A3", 2i64).unwrap();
        sr.set("R3", "stale").unwrap();

        let dc = d.add_sheet(DATASET_CONTAINERS_SHEET);
        dc.set("E1", "SpatialReferenceID").unwrap();
        dc.set("E2", 2i64).unwrap();
        dc.set("E3", -1i64).unwrap();

        let oc = d.add_sheet(OBJECT_CLASSES_SHEET);
        oc.set("J1", "SpatialReferenceID").unwrap();
        oc.set("J2", 2i64).unwrap();
        oc.set("J3", -1i64).unwrap();
        oc.set("J4", 0i64).unwrap();
        oc.set("I2", 2i64).unwrap();

        d.add_sheet(FIELDS_SHEET);
        d
    }

    #[test]
    fn test_unknown_id_leaves_descriptor_untouched() {
        let dir = TempDir::new().unwrap();
        let mut d = legacy_descriptor(&dir.path().join("x.xlsx"));
        let before = d.clone();
        let err = update_all_spatial_reference(&mut d, 4326).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedSpatialReference(4326)));
        assert_eq!(d, before);
    }

    #[test]
    fn test_rewrite_spatial_reference_sheet() {
        let dir = TempDir::new().unwrap();
        let mut d = legacy_descriptor(&dir.path().join("x.xlsx"));
        update_all_spatial_reference(&mut d, 2263).unwrap();

        let sr = d.sheet(SPATIAL_REFERENCES_SHEET).unwrap();
        assert_eq!(sr.get("A1").unwrap(), &CellValue::Text("ID".into()));
        assert_eq!(sr.get("A2").unwrap(), &CellValue::Number(1.0));
        assert_eq!(sr.get("C2").unwrap(), &CellValue::Number(2263.0));
        assert_eq!(sr.get("F2").unwrap(), &CellValue::Number(-1.0));
        assert_eq!(sr.get("N2").unwrap(), &CellValue::Text("10000.".into()));
        assert_eq!(sr.get("Q2").unwrap(), &CellValue::Text("10000.".into()));
        assert_eq!(sr.get("A3").unwrap(), &CellValue::Empty);
        assert_eq!(sr.get("R3").unwrap(), &CellValue::Empty);
        assert!(sr
            .get("D2")
            .unwrap()
            .as_text()
            .unwrap()
            .ends_with("UNIT[\"Foot_US\",0.3048006096012192]]"));
    }

    #[test]
    fn test_rewrite_repoints_columns_keeping_sentinels() {
        let dir = TempDir::new().unwrap();
        let mut d = legacy_descriptor(&dir.path().join("x.xlsx"));
        update_all_spatial_reference(&mut d, 2263).unwrap();

        let dc = d.sheet(DATASET_CONTAINERS_SHEET).unwrap();
        assert_eq!(dc.get("E1").unwrap(), &CellValue::Text("SpatialReferenceID".into()));
        assert_eq!(dc.get("E2").unwrap(), &CellValue::Number(1.0));
        assert_eq!(dc.get("E3").unwrap(), &CellValue::Number(-1.0));

        let oc = d.sheet(OBJECT_CLASSES_SHEET).unwrap();
        assert_eq!(oc.get("J2").unwrap(), &CellValue::Number(1.0));
        assert_eq!(oc.get("J3").unwrap(), &CellValue::Number(-1.0));
        assert_eq!(oc.get("J4").unwrap(), &CellValue::Number(0.0));
        // Other columns are not touched
        assert_eq!(oc.get("I2").unwrap(), &CellValue::Number(2.0));
    }

    #[test]
    fn test_rewrite_6539_survives_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CorrectedProjection.xlsx");
        let mut d = legacy_descriptor(&path);
        update_all_spatial_reference(&mut d, 6539).unwrap();
        d.save().unwrap();

        let read = SchemaDescriptor::open(&path).unwrap();
        let sr = read.sheet(SPATIAL_REFERENCES_SHEET).unwrap();
        assert_eq!(sr.get("C2").unwrap().as_i64(), Some(6539));
        assert_eq!(
            sr.get("K2").unwrap(),
            &CellValue::Text("3048.006096012195121164435877261997627062".into())
        );
        assert_eq!(
            sr.get("B2").unwrap().as_text().as_deref(),
            Some("NAD_1983_2011_StatePlane_New_York_Long_Isl_FIPS_3104_Ft_US")
        );
        assert!(sr
            .get("D2")
            .unwrap()
            .as_text()
            .unwrap()
            .ends_with("AUTHORITY[\"EPSG\",6539]]"));
    }

    #[test]
    fn test_missing_sheet_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut d = SchemaDescriptor::new(dir.path().join("x.xlsx"));
        d.add_sheet(SPATIAL_REFERENCES_SHEET);
        let err = update_all_spatial_reference(&mut d, 2263).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { .. }));
    }
}
