//! CSV spreadsheet export.
//!
//! `write_records` writes full fiscal records: the key columns followed by
//! every numeric column in backend order, empty cells for unreported
//! values. `read_records` loads such a file back. `write_rows` writes any
//! serializable row type (rankings, metrics, totals) with a header taken
//! from its field names. `write_workbook` writes several named tables,
//! one CSV file per sheet, into a directory.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use serde::Serialize;

use crate::export::report::Table;
use crate::logging::{self, Component};
use crate::model::{FiscalError, FiscalField, MunicipalFiscalRecord};

const KEY_HEADERS: [&str; 5] = ["id", "code", "name", "department", "year"];

fn export_error(path: &Path, e: impl std::fmt::Display) -> FiscalError {
    FiscalError::Export(format!("{}: {}", path.display(), e))
}

/// Header row for a record spreadsheet.
pub fn record_headers() -> Vec<&'static str> {
    KEY_HEADERS
        .iter()
        .copied()
        .chain(FiscalField::ALL.iter().map(|f| f.column()))
        .collect()
}

fn record_row(record: &MunicipalFiscalRecord) -> Vec<String> {
    let mut row = vec![
        record.id.clone(),
        record.code.map(|c| c.to_string()).unwrap_or_default(),
        record.name.clone().unwrap_or_default(),
        record.department.clone().unwrap_or_default(),
        record.year.to_string(),
    ];
    row.extend(
        FiscalField::ALL
            .iter()
            .map(|f| f.raw(record).map(|v| v.to_string()).unwrap_or_default()),
    );
    row
}

/// Writes one row per record. Returns the number of rows written.
pub fn write_records(path: &Path, records: &[MunicipalFiscalRecord]) -> Result<usize, FiscalError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;
    writer.write_record(record_headers()).map_err(|e| export_error(path, e))?;
    for record in records {
        writer.write_record(record_row(record)).map_err(|e| export_error(path, e))?;
    }
    writer.flush().map_err(|e| export_error(path, e))?;

    logging::info(
        Component::Export,
        path.to_str(),
        &format!("Wrote {} records", records.len()),
    );
    Ok(records.len())
}

/// Writes arbitrary rows; the header comes from the first row's field
/// names. Returns the number of rows written.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize, FiscalError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| export_error(path, e))?;
    }
    writer.flush().map_err(|e| export_error(path, e))?;

    logging::info(Component::Export, path.to_str(), &format!("Wrote {} rows", rows.len()));
    Ok(rows.len())
}

/// File stem for a sheet: lowercase ASCII letters and digits, every other
/// run of characters collapsed to `_`.
pub fn sheet_file_stem(sheet: &str) -> String {
    let mut stem = String::with_capacity(sheet.len());
    for c in sheet.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let trimmed = stem.trim_end_matches('_').len();
    stem.truncate(trimmed);
    if stem.is_empty() { "sheet".to_string() } else { stem }
}

/// Writes each `(sheet name, table)` pair to `<dir>/<stem>.csv`, creating
/// `dir` if needed. Missing cells are left empty. Two sheets mapping to
/// the same file are rejected before anything is written.
pub fn write_workbook(dir: &Path, sheets: &[(&str, &Table)]) -> Result<Vec<PathBuf>, FiscalError> {
    let mut seen = HashSet::new();
    let mut paths = Vec::with_capacity(sheets.len());
    for (name, _) in sheets {
        let path = dir.join(format!("{}.csv", sheet_file_stem(name)));
        if !seen.insert(path.clone()) {
            return Err(export_error(&path, format!("sheet '{}' collides with another sheet", name)));
        }
        paths.push(path);
    }

    std::fs::create_dir_all(dir).map_err(|e| export_error(dir, e))?;
    for ((_, table), path) in sheets.iter().zip(&paths) {
        let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;
        writer.write_record(&table.columns).map_err(|e| export_error(path, e))?;
        for row in &table.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(|e| export_error(path, e))?;
        }
        writer.flush().map_err(|e| export_error(path, e))?;
    }

    logging::info(
        Component::Export,
        dir.to_str(),
        &format!("Wrote {} sheets", sheets.len()),
    );
    Ok(paths)
}

/// Reads a spreadsheet written by `write_records`.
///
/// Columns are matched by header name, so column order and extra columns
/// do not matter. Empty cells read back as `None`.
pub fn read_records(path: &Path) -> Result<Vec<MunicipalFiscalRecord>, FiscalError> {
    let file = File::open(path).map_err(|e| export_error(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| export_error(path, e))?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    if !index.contains_key("year") {
        return Err(export_error(path, "missing 'year' column"));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: one for the header row, one for 1-based line numbers.
        let line = idx + 2;
        let row = result.map_err(|e| export_error(path, e))?;
        let record = parse_row(&row, &index)
            .map_err(|msg| export_error(path, format!("line {}: {}", line, msg)))?;
        records.push(record);
    }
    Ok(records)
}

fn parse_row(row: &StringRecord, index: &HashMap<&str, usize>) -> Result<MunicipalFiscalRecord, String> {
    let cell = |name: &str| {
        index
            .get(name)
            .and_then(|&i| row.get(i))
            .filter(|v| !v.is_empty())
    };
    let number = |name: &str| -> Result<Option<f64>, String> {
        cell(name)
            .map(|v| v.parse::<f64>().map_err(|_| format!("invalid number '{}' in {}", v, name)))
            .transpose()
    };

    let year = cell("year")
        .ok_or("empty year")?
        .parse::<i32>()
        .map_err(|e| format!("invalid year: {}", e))?;
    let code = cell("code")
        .map(|v| v.parse::<i64>().map_err(|e| format!("invalid code: {}", e)))
        .transpose()?;

    let mut record = MunicipalFiscalRecord {
        id: cell("id").unwrap_or_default().to_string(),
        code,
        name: cell("name").map(String::from),
        department: cell("department").map(String::from),
        year,
        ..Default::default()
    };
    for field in FiscalField::ALL {
        *field.slot(&mut record) = number(field.column())?;
    }
    Ok(record)
}
