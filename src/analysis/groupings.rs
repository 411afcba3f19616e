//! Per-department grouping, sums and averages.
//!
//! Records without a department (missing or empty string) are dropped from
//! every per-department view. They still count in whole-dataset views.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::round0;
use crate::model::{FiscalField, MunicipalFiscalRecord};

/// Sum of one field for one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentTotal {
    pub department: String,
    pub value: f64,
    pub municipalities: usize,
}

/// Headline figures for one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentDetail {
    pub population: f64,
    pub budget: f64,
    pub income: f64,
    /// Mean of the stored `autonomia_financiera` column.
    pub autonomy: f64,
    pub municipalities: usize,
    pub avg_population: f64,
    pub avg_budget: f64,
}

/// A municipality as it appears in selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MunicipalityRef {
    pub id: String,
    pub name: String,
    pub department: Option<String>,
}

/// Partitions records by exact department name.
pub fn group_by_department(
    records: &[MunicipalFiscalRecord],
) -> BTreeMap<String, Vec<&MunicipalFiscalRecord>> {
    let mut groups: BTreeMap<String, Vec<&MunicipalFiscalRecord>> = BTreeMap::new();
    for record in records {
        if let Some(department) = record.department_name() {
            groups.entry(department.to_string()).or_default().push(record);
        }
    }
    groups
}

/// Sum of `field` over `records`; missing values count as zero.
pub fn sum_field<'a, I>(records: I, field: FiscalField) -> f64
where
    I: IntoIterator<Item = &'a MunicipalFiscalRecord>,
{
    records.into_iter().map(|r| field.value(r)).sum()
}

/// Mean of `field` over `records`. An empty group averages to 0.
pub fn average_field<'a, I>(records: I, field: FiscalField) -> f64
where
    I: IntoIterator<Item = &'a MunicipalFiscalRecord>,
{
    let (sum, count) = records
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), r| (sum + field.value(r), count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Per-department sums of `field`, largest first.
pub fn department_totals(records: &[MunicipalFiscalRecord], field: FiscalField) -> Vec<DepartmentTotal> {
    let mut totals: Vec<DepartmentTotal> = group_by_department(records)
        .into_iter()
        .map(|(department, group)| DepartmentTotal {
            value: sum_field(group.iter().copied(), field),
            municipalities: group.len(),
            department,
        })
        .collect();
    totals.sort_by(|a, b| b.value.total_cmp(&a.value));
    totals
}

/// Population, budget, income and stored-autonomy figures per department.
pub fn department_details(records: &[MunicipalFiscalRecord]) -> BTreeMap<String, DepartmentDetail> {
    group_by_department(records)
        .into_iter()
        .map(|(department, group)| {
            let count = group.len();
            let population = sum_field(group.iter().copied(), FiscalField::Population);
            let budget = sum_field(group.iter().copied(), FiscalField::Budget);
            let detail = DepartmentDetail {
                population,
                budget,
                income: sum_field(group.iter().copied(), FiscalField::OwnIncome),
                autonomy: average_field(group.iter().copied(), FiscalField::FinancialAutonomy),
                municipalities: count,
                avg_population: round0(population / count as f64),
                avg_budget: round0(budget / count as f64),
            };
            (department, detail)
        })
        .collect()
}

/// Distinct non-empty department names, sorted.
pub fn departments_in(records: &[MunicipalFiscalRecord]) -> Vec<String> {
    group_by_department(records).into_keys().collect()
}

/// Distinct municipalities by name, sorted by name, optionally restricted
/// to one department. The department filter applies first; among the rows
/// left, the last one for a name wins, as in the dashboard's selection lists.
pub fn municipalities_in(
    records: &[MunicipalFiscalRecord],
    department: Option<&str>,
) -> Vec<MunicipalityRef> {
    let mut by_name: BTreeMap<&str, MunicipalityRef> = BTreeMap::new();
    for record in records {
        let Some(name) = record.name.as_deref() else { continue };
        if department.is_some_and(|d| record.department.as_deref() != Some(d)) {
            continue;
        }
        by_name.insert(
            name,
            MunicipalityRef {
                id: record.id.clone(),
                name: name.to_string(),
                department: record.department.clone(),
            },
        );
    }
    by_name.into_values().collect()
}
