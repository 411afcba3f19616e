/// Aggregation routines for the municipal finance service.
///
/// Every function here is a pure, single-pass transformation over records
/// that are already in memory. Nothing is cached: callers recompute a view
/// whenever their input slice changes.
///
/// Submodules:
/// - `groupings` — per-department partitioning, sums, averages.
/// - `metrics`   — autonomy, trend and per-municipality health metrics.
/// - `ranking`   — sorting, top-N, distributions, scatter projections.
/// - `compare`   — multi-year comparisons for a selection of municipalities.
/// - `budget`    — one municipality's budget history over several years.
/// - `kpis`      — headline figures for a year's dataset.

pub mod budget;
pub mod compare;
pub mod groupings;
pub mod kpis;
pub mod metrics;
pub mod ranking;

use crate::model::MunicipalFiscalRecord;

/// Rounds to one decimal place, halves rounding up (towards +∞), which is
/// how the dashboard rounds percentages.
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Rounds to the nearest integer, halves rounding up (towards +∞).
pub fn round0(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Records belonging to a single fiscal year.
pub fn records_for_year(records: &[MunicipalFiscalRecord], year: i32) -> Vec<&MunicipalFiscalRecord> {
    records.iter().filter(|r| r.year == year).collect()
}

/// The most recent year present in `records`, if any.
pub fn latest_year(records: &[MunicipalFiscalRecord]) -> Option<i32> {
    records.iter().map(|r| r.year).max()
}
