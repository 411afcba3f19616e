/// Fiscal record sources.
///
/// Every backend answers the same two queries: all rows for a set of years,
/// and the single row for one municipality in one year. Callers hold a
/// `Box<dyn FiscalSource>` chosen from configuration.
///
/// Submodules:
/// - `rest`     — hosted PostgREST endpoint over HTTP.
/// - `postgres` — direct SQL against the same table.
/// - `snapshot` — a local JSON dump of records.

pub mod postgres;
pub mod rest;
pub mod snapshot;

use crate::config::{AppConfig, BackendKind};
use crate::logging::{self, Component};
use crate::model::{FiscalError, MunicipalFiscalRecord};

pub trait FiscalSource {
    /// All rows whose year is in `years`. An empty slice means every year.
    fn fetch_years(&mut self, years: &[i32]) -> Result<Vec<MunicipalFiscalRecord>, FiscalError>;

    /// The row for `name` in `year`, optionally restricted to `department`.
    /// Returns `FiscalError::NotFound` when there is none.
    fn fetch_one(
        &mut self,
        name: &str,
        year: i32,
        department: Option<&str>,
    ) -> Result<MunicipalFiscalRecord, FiscalError>;

    /// Tag used when logging this source.
    fn component(&self) -> Component;
}

/// Opens the source selected by `config.backend`.
pub fn open_source(config: &AppConfig) -> Result<Box<dyn FiscalSource>, FiscalError> {
    match config.backend {
        BackendKind::Rest => Ok(Box::new(rest::RestSource::from_config(config)?)),
        BackendKind::Postgres => Ok(Box::new(postgres::PgSource::from_config(config)?)),
        BackendKind::Snapshot => {
            let path = config
                .snapshot_path
                .as_deref()
                .ok_or_else(|| FiscalError::Config("snapshot_path is not set".to_string()))?;
            Ok(Box::new(snapshot::SnapshotSource::from_path(path)?))
        }
    }
}

/// Sorted, de-duplicated copy of a year selection.
pub fn normalize_years(years: &[i32]) -> Vec<i32> {
    let mut sorted = years.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Multi-year loader that skips the fetch when the year selection has not
/// changed since the last successful load.
///
/// Only the most recent selection is remembered. A failed fetch clears the
/// held records: no partial data survives an error.
pub struct MultiYearLoader<S: FiscalSource + ?Sized> {
    source: Box<S>,
    last_years: Option<Vec<i32>>,
    records: Vec<MunicipalFiscalRecord>,
    fetches: usize,
}

impl<S: FiscalSource + ?Sized> MultiYearLoader<S> {
    pub fn new(source: Box<S>) -> Self {
        Self {
            source,
            last_years: None,
            records: Vec::new(),
            fetches: 0,
        }
    }

    /// Records for `years`, fetched or reused.
    pub fn load(&mut self, years: &[i32]) -> Result<&[MunicipalFiscalRecord], FiscalError> {
        let selection = normalize_years(years);
        if self.last_years.as_ref() == Some(&selection) && !self.records.is_empty() {
            logging::debug(self.source.component(), None, "Year selection unchanged, reusing rows");
            return Ok(&self.records);
        }

        self.last_years = Some(selection.clone());
        self.fetches += 1;

        let subject = selection
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(",");

        match self.source.fetch_years(&selection) {
            Ok(records) => {
                let counts: Vec<(i32, usize)> = selection
                    .iter()
                    .map(|y| (*y, records.iter().filter(|r| r.year == *y).count()))
                    .collect();
                logging::log_fetch_summary(self.source.component(), &selection, &counts);
                self.records = records;
                Ok(&self.records)
            }
            Err(e) => {
                logging::log_fetch_failure(self.source.component(), &subject, "fetch_years", &e);
                self.records.clear();
                Err(e)
            }
        }
    }

    /// Single-record lookup, passed straight to the source.
    pub fn load_one(
        &mut self,
        name: &str,
        year: i32,
        department: Option<&str>,
    ) -> Result<MunicipalFiscalRecord, FiscalError> {
        self.source.fetch_one(name, year, department).map_err(|e| {
            let subject = format!("{} {}", name, year);
            logging::log_fetch_failure(self.source.component(), &subject, "fetch_one", &e);
            e
        })
    }

    /// Number of times the source has been queried for a year set.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}
