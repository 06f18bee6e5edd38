//! Schema descriptor workbooks.
//!
//! A schema descriptor is a multi-sheet spreadsheet describing a store's
//! spatial references, feature datasets, object classes and fields. It is
//! read with calamine and written with rust_xlsxwriter; in between it is
//! held as a sparse [`SchemaDescriptor`] addressed with A1-style cell
//! references.

pub mod interchange;
pub mod spatial_reference;

pub use interchange::WorkbookInterchange;
pub use spatial_reference::{
    known_spatial_reference, update_all_spatial_reference, KnownSpatialReference,
    INVERSE_XY_RESOLUTION, LEGACY_SPATIAL_REFERENCE_ID, SCALE_PLACEHOLDER,
};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::error::{MigrateError, Result};

pub const SPATIAL_REFERENCES_SHEET: &str = "SpatialReferences";
pub const DATASET_CONTAINERS_SHEET: &str = "DatasetContainers";
pub const OBJECT_CLASSES_SHEET: &str = "ObjectClasses";
pub const FIELDS_SHEET: &str = "Fields";

/// A cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Python-style truthiness: zero, empty text, false and empty are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Number(n) => *n != 0.0,
            CellValue::Text(s) => !s.is_empty(),
            CellValue::Bool(b) => *b,
        }
    }

    /// Integer value of a whole number, or of text holding one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text content, or the display form of a number.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string().to_uppercase()),
            CellValue::Empty => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Number(v as f64)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(format!("{:?}", e)),
        }
    }
}

/// Parse an A1-style reference into zero-based (row, column).
pub fn parse_cell_ref(reference: &str) -> Result<(u32, u16)> {
    let invalid = || MigrateError::Config(format!("Invalid cell reference: {}", reference));

    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|&n| n <= u16::MAX as u32)
            .ok_or_else(invalid)?;
    }
    let row: u32 = digits.parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }

    Ok((row - 1, (col - 1) as u16))
}

/// One worksheet, stored sparsely.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at zero-based (row, col); [`CellValue::Empty`] if unset.
    pub fn get_at(&self, row: u32, col: u16) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&CellValue::Empty)
    }

    pub fn set_at(&mut self, row: u32, col: u16, value: impl Into<CellValue>) {
        match value.into() {
            CellValue::Empty => {
                self.cells.remove(&(row, col));
            }
            value => {
                self.cells.insert((row, col), value);
            }
        }
    }

    /// Value at an A1-style reference.
    pub fn get(&self, reference: &str) -> Result<&CellValue> {
        let (row, col) = parse_cell_ref(reference)?;
        Ok(self.get_at(row, col))
    }

    /// Set the cell at an A1-style reference.
    pub fn set(&mut self, reference: &str, value: impl Into<CellValue>) -> Result<()> {
        let (row, col) = parse_cell_ref(reference)?;
        self.set_at(row, col, value);
        Ok(())
    }

    /// Clear every cell at or below zero-based `row`.
    pub fn clear_from_row(&mut self, row: u32) {
        self.cells.retain(|&(r, _), _| r < row);
    }

    /// Zero-based index of the last row holding a value.
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|&(r, _)| r).max()
    }

    /// Set-cell rows of one column, from zero-based `first_row` down.
    pub fn column_mut(
        &mut self,
        col: u16,
        first_row: u32,
    ) -> impl Iterator<Item = (u32, &mut CellValue)> {
        self.cells
            .iter_mut()
            .filter(move |((r, c), _)| *c == col && *r >= first_row)
            .map(|((r, _), v)| (*r, v))
    }
}

/// An in-memory schema descriptor workbook bound to a file path.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    path: PathBuf,
    sheets: Vec<Sheet>,
}

impl SchemaDescriptor {
    /// An empty descriptor that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheets: Vec::new(),
        }
    }

    /// Read every sheet of the workbook at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(MigrateError::not_found(
                "Schema descriptor",
                path.display().to_string(),
            ));
        }

        let mut workbook: Xlsx<_> = open_workbook(&path)?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
            let mut sheet = Sheet::new(name.as_str());
            for (r, c, data) in range.cells() {
                sheet.set_at(
                    row_offset + r as u32,
                    (col_offset + c as u32) as u16,
                    CellValue::from(data),
                );
            }
            sheets.push(sheet);
        }
        debug!("Read {} sheets from {}", sheets.len(), path.display());

        Ok(Self { path, sheets })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the descriptor file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the descriptor file. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MigrateError::not_found("Worksheet", name))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| MigrateError::not_found("Worksheet", name))
    }

    /// Append a sheet, or return the existing one with that name.
    pub fn add_sheet(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }

    /// Write the workbook to its own path.
    pub fn save(&self) -> Result<()> {
        self.write(&self.path)
    }

    /// Write the workbook to `out` and return a descriptor bound there.
    pub fn copy_to(&self, out: impl Into<PathBuf>) -> Result<SchemaDescriptor> {
        let copy = Self {
            path: out.into(),
            sheets: self.sheets.clone(),
        };
        copy.save()?;
        Ok(copy)
    }

    fn write(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            for (&(row, col), value) in &sheet.cells {
                match value {
                    CellValue::Empty => {}
                    CellValue::Number(n) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                    CellValue::Text(s) => {
                        worksheet.write_string(row, col, s)?;
                    }
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                }
            }
        }
        workbook.save(path)?;
        debug!("Wrote {} sheets to {}", self.sheets.len(), path.display());
        Ok(())
    }
}
