/// Local JSON snapshot of fiscal records.
///
/// A snapshot is the JSON array the REST backend returns, saved to disk.
/// It lets every command run offline and gives the tests a fixed dataset.

use std::fs;
use std::path::Path;

use crate::ingest::FiscalSource;
use crate::logging::{self, Component};
use crate::model::{FiscalError, MunicipalFiscalRecord};

pub struct SnapshotSource {
    records: Vec<MunicipalFiscalRecord>,
}

impl SnapshotSource {
    pub fn new(records: Vec<MunicipalFiscalRecord>) -> Self {
        Self { records }
    }

    /// Reads a snapshot file.
    pub fn from_path(path: &Path) -> Result<Self, FiscalError> {
        let text = fs::read_to_string(path)
            .map_err(|e| FiscalError::Config(format!("cannot read snapshot {}: {}", path.display(), e)))?;
        let records: Vec<MunicipalFiscalRecord> =
            serde_json::from_str(&text).map_err(|e| FiscalError::ParseError(e.to_string()))?;
        logging::debug(
            Component::Snapshot,
            path.to_str(),
            &format!("Loaded {} rows", records.len()),
        );
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[MunicipalFiscalRecord] {
        &self.records
    }
}

/// Writes `records` as a pretty-printed JSON snapshot.
pub fn write_snapshot(path: &Path, records: &[MunicipalFiscalRecord]) -> Result<(), FiscalError> {
    let json = serde_json::to_string_pretty(records).map_err(|e| FiscalError::Export(e.to_string()))?;
    fs::write(path, json)
        .map_err(|e| FiscalError::Export(format!("cannot write {}: {}", path.display(), e)))?;
    logging::info(
        Component::Snapshot,
        path.to_str(),
        &format!("Saved {} rows", records.len()),
    );
    Ok(())
}

impl FiscalSource for SnapshotSource {
    fn fetch_years(&mut self, years: &[i32]) -> Result<Vec<MunicipalFiscalRecord>, FiscalError> {
        Ok(self
            .records
            .iter()
            .filter(|r| years.is_empty() || years.contains(&r.year))
            .cloned()
            .collect())
    }

    fn fetch_one(
        &mut self,
        name: &str,
        year: i32,
        department: Option<&str>,
    ) -> Result<MunicipalFiscalRecord, FiscalError> {
        self.records
            .iter()
            .find(|r| {
                r.name.as_deref() == Some(name)
                    && r.year == year
                    && department.is_none_or(|d| r.department.as_deref() == Some(d))
            })
            .cloned()
            .ok_or_else(|| FiscalError::NotFound { name: name.to_string(), year })
    }

    fn component(&self) -> Component {
        Component::Snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, department: &str, year: i32) -> MunicipalFiscalRecord {
        MunicipalFiscalRecord {
            id: format!("{}-{}", name, year),
            name: Some(name.to_string()),
            department: Some(department.to_string()),
            year,
            presupuesto_municipal: Some(1_000_000.0),
            ..Default::default()
        }
    }

    fn sample() -> SnapshotSource {
        SnapshotSource::new(vec![
            record("Santa Cruz", "Copán", 2023),
            record("Santa Cruz", "Lempira", 2023),
            record("Santa Cruz", "Copán", 2024),
        ])
    }

    #[test]
    fn test_year_filter() {
        let mut source = sample();
        assert_eq!(source.fetch_years(&[2023]).expect("fetch").len(), 2);
        assert_eq!(source.fetch_years(&[]).expect("fetch").len(), 3);
        assert!(source.fetch_years(&[2010]).expect("fetch").is_empty());
    }

    #[test]
    fn test_same_name_in_two_departments() {
        let mut source = sample();
        let found = source
            .fetch_one("Santa Cruz", 2023, Some("Lempira"))
            .expect("should find Lempira row");
        assert_eq!(found.department.as_deref(), Some("Lempira"));
    }

    #[test]
    fn test_missing_row_is_not_found() {
        let mut source = sample();
        let err = source.fetch_one("Santa Cruz", 2022, None).expect_err("no 2022 row");
        assert_eq!(err, FiscalError::NotFound { name: "Santa Cruz".to_string(), year: 2022 });
    }

    #[test]
    fn test_write_then_read_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        let source = sample();
        write_snapshot(&path, source.records()).expect("write");

        let reloaded = SnapshotSource::from_path(&path).expect("read");
        assert_eq!(reloaded.records(), source.records());
    }

    #[test]
    fn test_malformed_snapshot_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(SnapshotSource::from_path(&path), Err(FiscalError::ParseError(_))));
    }
}
