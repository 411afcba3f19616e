//! Municipal finance analytics for Honduras.
//!
//! Fetches one fiscal record per (municipality, year) from the hosted
//! backend and derives the dashboard views from them: headline KPIs,
//! rankings, department summaries, autonomy health metrics, multi-year
//! comparisons and per-municipality detail. Results can be exported as CSV
//! spreadsheets or text reports.
//!
//! Module map:
//! - `model`       — record type, addressable columns, error type.
//! - `ingest`      — backends (REST, Postgres, snapshot) and the multi-year loader.
//! - `analysis`    — pure aggregation routines.
//! - `alert`       — fiscal health thresholds and status classification.
//! - `detail`      — single-record drill-down.
//! - `departments` — registry of the 18 departments.
//! - `verify`      — dataset coverage checks against the registry.
//! - `export`      — CSV and text report output.
//! - `config`, `logging`, `format` — ambient support.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod departments;
pub mod detail;
pub mod export;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod verify;
