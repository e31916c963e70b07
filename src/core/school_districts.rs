//! Cleaning rules for the annual school district finance spreadsheets.
//!
//! Each raw sheet covers one survey year. The year only appears in the file name
//! (`elsec00t.xls`, `elsec92.xls`, ...) and the column carrying the district
//! identifier was renamed twice over the years, so both have to be resolved per
//! file before the sheets can be stacked.

use crate::core::states;
use crate::domain::model::{RawSheet, Record};
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use std::sync::LazyLock;

pub const STATE_COLUMN: &str = "STATE";
pub const YEAR_COLUMN: &str = "YRDATA";

/// Output columns, in order. STATE and YRDATA are derived, the rest are copied.
pub const DEFAULT_COLUMNS: [&str; 24] = [
    STATE_COLUMN,
    "ENROLL",
    "NAME",
    YEAR_COLUMN,
    "TOTALREV",
    "TFEDREV",
    "TSTREV",
    "TLOCREV",
    "LOCRTAX",
    "LOCRPROP",
    "LOCREVPAR",
    "PCTTOTAL",
    "PCTFTOT",
    "PCTSTOT",
    "PCTLTOT",
    "TOTALEXP",
    "TCURSPND",
    "TSALWAGE",
    "TEMPBENE",
    "TCURINST",
    "TCURSSVC",
    "PPCSTOT",
    "PPITOTAL",
    "PPSTOTAL",
];

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

pub fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Resolves the survey year from the first run of digits in a file name.
///
/// Two digit tails above 90 belong to the 1900s, everything else to the 2000s.
/// A four digit run is taken as the year itself.
pub fn year_from_filename(file_name: &str) -> Result<u16> {
    let filename_error = |reason: &str| EtlError::FilenameError {
        file_name: file_name.to_string(),
        reason: reason.to_string(),
    };

    let digits = DIGITS
        .find(file_name)
        .ok_or_else(|| filename_error("no digits in file name"))?
        .as_str();

    let tail: u32 = digits
        .parse()
        .map_err(|_| filename_error("digit run is too long"))?;

    match (digits.len(), tail) {
        (4, year) if year >= 1000 => Ok(year as u16),
        (_, t) if t < 10 => Ok(2000 + t as u16),
        (_, t) if t <= 90 => Ok(2000 + t as u16),
        (_, t) if t < 100 => Ok(1900 + t as u16),
        _ => Err(filename_error(&format!(
            "'{}' is neither a two digit nor a four digit year",
            digits
        ))),
    }
}

/// Name of the column holding the district identifier in a given survey year.
pub fn state_id_column(year: u16) -> &'static str {
    if year >= 2002 {
        "IDCENSUS"
    } else if year == 1992 {
        "ID"
    } else {
        "GOVSID"
    }
}

pub fn normalize_header(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Maps a district identifier to its state name using the leading two digit code.
pub fn state_name_from_id(file_name: &str, id: &str) -> Result<&'static str> {
    let code: String = id.trim().chars().take(2).collect();
    let unknown = || EtlError::UnknownStateCode {
        file_name: file_name.to_string(),
        code: code.clone(),
    };

    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unknown());
    }

    code.parse::<u8>()
        .ok()
        .and_then(states::state_name)
        .ok_or_else(unknown)
}

/// Turns one raw sheet into output records.
///
/// Columns missing from the sheet come out empty. Rows without a district
/// identifier (footnotes, blank trailing lines) are skipped.
pub fn sheet_to_records(sheet: &RawSheet, columns: &[String]) -> Result<Vec<Record>> {
    let id_column = state_id_column(sheet.year);
    let id_index = sheet
        .column_index(id_column)
        .ok_or_else(|| EtlError::SchemaMismatchError {
            source_name: sheet.file_name.clone(),
            reason: format!(
                "expected district identifier column '{}' for {}",
                id_column, sheet.year
            ),
        })?;

    let copied: Vec<(&str, Option<usize>)> = columns
        .iter()
        .filter(|c| c.as_str() != STATE_COLUMN && c.as_str() != YEAR_COLUMN)
        .map(|c| (c.as_str(), sheet.column_index(c)))
        .collect();

    for (column, index) in &copied {
        if index.is_none() {
            tracing::debug!("{}: column {} not present, leaving it empty", sheet.file_name, column);
        }
    }

    let year = sheet.year.to_string();
    let mut records = Vec::with_capacity(sheet.rows.len());
    let mut skipped = 0usize;

    for row in &sheet.rows {
        let id = row.get(id_index).map(String::as_str).unwrap_or("");
        if id.trim().is_empty() {
            skipped += 1;
            continue;
        }

        let mut record = Record::default();
        record.data.insert(
            STATE_COLUMN.to_string(),
            state_name_from_id(&sheet.file_name, id)?.to_string(),
        );
        record.data.insert(YEAR_COLUMN.to_string(), year.clone());

        for (column, index) in &copied {
            let value = index
                .and_then(|i| row.get(i))
                .cloned()
                .unwrap_or_default();
            record.data.insert(column.to_string(), value);
        }

        records.push(record);
    }

    if skipped > 0 {
        tracing::warn!(
            "{}: skipped {} rows without a value in {}",
            sheet.file_name,
            skipped,
            id_column
        );
    }

    Ok(records)
}

/// Stable sort by state name, then year.
pub fn sort_by_state_year(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.get(STATE_COLUMN)
            .cmp(b.get(STATE_COLUMN))
            .then_with(|| a.get(YEAR_COLUMN).cmp(b.get(YEAR_COLUMN)))
    });
}
