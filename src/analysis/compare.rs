//! Multi-year comparison of a selection of municipalities on one metric.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::{round0, round1};
use crate::format::{format_millions, format_number, format_percent};
use crate::model::{FiscalError, MunicipalFiscalRecord};

/// Metrics offered for side-by-side comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMetric {
    Population,
    /// Municipal budget, in whole millions.
    Budget,
    /// Own income, in whole millions.
    Income,
    /// Own income over budget, percent with one decimal.
    Autonomy,
}

impl ComparisonMetric {
    /// Chart value of the metric for one record.
    pub fn value(self, record: &MunicipalFiscalRecord) -> f64 {
        match self {
            ComparisonMetric::Population => record.population.unwrap_or(0.0),
            ComparisonMetric::Budget => millions(record.presupuesto_municipal),
            ComparisonMetric::Income => millions(record.ingresos_propios),
            ComparisonMetric::Autonomy => {
                let budget = record.budget();
                if budget != 0.0 {
                    round1(record.own_income() / budget * 100.0)
                } else {
                    0.0
                }
            }
        }
    }

    /// Table cell text for one record.
    pub fn cell(self, record: &MunicipalFiscalRecord) -> String {
        match self {
            ComparisonMetric::Population => format_number(record.population.unwrap_or(0.0), 0),
            ComparisonMetric::Budget => format_millions(record.budget()),
            ComparisonMetric::Income => format_millions(record.own_income()),
            ComparisonMetric::Autonomy => format_percent(self.value(record)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ComparisonMetric::Population => "Population",
            ComparisonMetric::Budget => "Budget (L millions)",
            ComparisonMetric::Income => "Own income (L millions)",
            ComparisonMetric::Autonomy => "Autonomy (%)",
        }
    }
}

fn millions(amount: Option<f64>) -> f64 {
    match amount {
        Some(a) if a != 0.0 => round0(a / 1_000_000.0),
        _ => 0.0,
    }
}

impl std::str::FromStr for ComparisonMetric {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "population" => Ok(ComparisonMetric::Population),
            "budget" => Ok(ComparisonMetric::Budget),
            "income" => Ok(ComparisonMetric::Income),
            "autonomy" => Ok(ComparisonMetric::Autonomy),
            other => Err(FiscalError::ParseError(format!("unknown comparison metric '{}'", other))),
        }
    }
}

/// A municipality picked for comparison. Names repeat across departments,
/// so a selection can carry the department to pin the row down; written
/// `name@department` on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MunicipalitySelection {
    pub name: String,
    pub department: Option<String>,
}

impl MunicipalitySelection {
    pub fn new(name: &str, department: Option<&str>) -> Self {
        MunicipalitySelection {
            name: name.to_string(),
            department: department.map(str::to_string),
        }
    }

    /// Series key and table label: the name, qualified with the
    /// department when one was given.
    pub fn label(&self) -> String {
        match &self.department {
            Some(d) => format!("{} ({})", self.name, d),
            None => self.name.clone(),
        }
    }

    fn matches(&self, record: &MunicipalFiscalRecord) -> bool {
        record.name.as_deref() == Some(self.name.as_str())
            && self
                .department
                .as_deref()
                .is_none_or(|d| record.department.as_deref() == Some(d))
    }

    /// The first record for this selection in `year`. Chart and table both
    /// resolve through here.
    pub fn resolve<'a>(
        &self,
        records: &'a [MunicipalFiscalRecord],
        year: i32,
    ) -> Option<&'a MunicipalFiscalRecord> {
        records.iter().find(|r| r.year == year && self.matches(r))
    }
}

impl std::str::FromStr for MunicipalitySelection {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, department) = match s.split_once('@') {
            Some((n, d)) => (n.trim(), Some(d.trim())),
            None => (s.trim(), None),
        };
        if name.is_empty() || department == Some("") {
            return Err(FiscalError::ParseError(format!("invalid municipality selection '{}'", s)));
        }
        Ok(MunicipalitySelection::new(name, department))
    }
}

/// One chart point: a year and each selected municipality's value, keyed
/// by `MunicipalitySelection::label`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearComparison {
    pub year: i32,
    pub values: BTreeMap<String, f64>,
}

/// One table row: a municipality and its cell for each selected year.
/// `None` marks a year with no record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub municipality: String,
    pub cells: Vec<(i32, Option<String>)>,
}

/// Per-year values of `metric` for the selected municipalities, oldest
/// year first. Years with no matching record are omitted.
pub fn comparison_series(
    records: &[MunicipalFiscalRecord],
    selection: &[MunicipalitySelection],
    years: &[i32],
    metric: ComparisonMetric,
) -> Vec<YearComparison> {
    if selection.is_empty() || years.is_empty() {
        return Vec::new();
    }

    let mut sorted_years = years.to_vec();
    sorted_years.sort_unstable();
    sorted_years.dedup();

    sorted_years
        .into_iter()
        .filter_map(|year| {
            let values: BTreeMap<String, f64> = selection
                .iter()
                .filter_map(|m| m.resolve(records, year).map(|r| (m.label(), metric.value(r))))
                .collect();
            (!values.is_empty()).then_some(YearComparison { year, values })
        })
        .collect()
}

/// Formatted cells of `metric` per municipality and year, in selection
/// order.
pub fn comparison_table(
    records: &[MunicipalFiscalRecord],
    selection: &[MunicipalitySelection],
    years: &[i32],
    metric: ComparisonMetric,
) -> Vec<ComparisonRow> {
    if selection.is_empty() || years.is_empty() {
        return Vec::new();
    }

    selection
        .iter()
        .map(|m| ComparisonRow {
            municipality: m.label(),
            cells: years
                .iter()
                .map(|&year| (year, m.resolve(records, year).map(|r| metric.cell(r))))
                .collect(),
        })
        .collect()
}
