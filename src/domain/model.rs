use serde::{Deserialize, Serialize};
use shapefile::dbase;
use shapefile::{Shape, ShapeType};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// One output row. Cells stay text so identifiers keep their leading zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, column: &str) -> &str {
        self.data.get(column).map(String::as_str).unwrap_or("")
    }
}

/// First worksheet of one raw spreadsheet.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub file_name: String,
    pub year: u16,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}

#[derive(Debug, Clone)]
pub struct DistrictTable {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

pub struct BoundaryFeature {
    pub shape: Shape,
    pub record: dbase::Record,
}

// `Shape` only implements `Display` in shapefile 0.6, so `Debug` can't be derived.
impl fmt::Debug for BoundaryFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryFeature")
            .field("shape", &format_args!("{}", self.shape))
            .field("record", &self.record)
            .finish()
    }
}

/// Definition of one `.dbf` attribute column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: dbase::FieldType,
    pub length: u8,
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}({})", self.name, self.field_type, self.length)
    }
}

/// One discovered boundary shapefile with all of its features loaded.
#[derive(Debug)]
pub struct BoundarySource {
    pub shp_path: PathBuf,
    pub shape_type: ShapeType,
    pub fields: Vec<FieldSpec>,
    /// Contents of the sibling `.prj` file, when there is one.
    pub projection: Option<String>,
    /// Contents of the sibling `.cpg` file naming the `.dbf` text encoding.
    pub encoding: Option<String>,
    pub features: Vec<BoundaryFeature>,
}

impl BoundarySource {
    pub fn dbf_path(&self) -> PathBuf {
        self.shp_path.with_extension("dbf")
    }
}

#[derive(Debug)]
pub struct MergedLayer {
    pub shape_type: ShapeType,
    pub template_dbf: PathBuf,
    pub projection: Option<String>,
    pub encoding: Option<String>,
    pub features: Vec<BoundaryFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["csv", "tsv", "json"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "tsv" => Some(OutputFormat::Tsv),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

/// Lets the engine report how much data each phase produced.
pub trait RecordCount {
    fn record_count(&self) -> usize;
}

impl RecordCount for Vec<RawSheet> {
    fn record_count(&self) -> usize {
        self.iter().map(|sheet| sheet.rows.len()).sum()
    }
}

impl RecordCount for DistrictTable {
    fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl RecordCount for Vec<BoundarySource> {
    fn record_count(&self) -> usize {
        self.iter().map(|source| source.features.len()).sum()
    }
}

impl RecordCount for MergedLayer {
    fn record_count(&self) -> usize {
        self.features.len()
    }
}
