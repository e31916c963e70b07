use crate::core::school_districts::{normalize_header, year_from_filename};
use crate::domain::model::RawSheet;
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xls", "xlsx", "xlsm", "xlsb", "ods"];

pub fn is_spreadsheet(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Spreadsheets a conversion run picks up. Hidden files such as editor lock files are left out.
pub fn is_raw_spreadsheet(file_name: &str) -> bool {
    !file_name.starts_with('.') && is_spreadsheet(file_name)
}

/// Reads the first worksheet of a workbook held in memory. Every cell is rendered as text.
pub fn read_first_sheet(file_name: &str, bytes: Vec<u8>) -> Result<RawSheet> {
    let year = year_from_filename(file_name)?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EtlError::SchemaMismatchError {
            source_name: file_name.to_string(),
            reason: "workbook has no worksheets".to_string(),
        })??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| EtlError::SchemaMismatchError {
            source_name: file_name.to_string(),
            reason: "first worksheet is empty".to_string(),
        })?
        .iter()
        .map(|cell| normalize_header(&cell_to_string(cell)))
        .collect();

    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    tracing::debug!(
        "{}: {} columns, {} data rows",
        file_name,
        headers.len(),
        rows.len()
    );

    Ok(RawSheet {
        file_name: file_name.to_string(),
        year,
        headers,
        rows,
    })
}

/// Text form of a cell. Whole numbers lose the trailing `.0` that Excel stores them with.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
