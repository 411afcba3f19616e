//! Derived fiscal metrics: financial autonomy, year-over-year trend, and
//! the per-municipality health summary built from them.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::alert::thresholds::{
    CRITICAL_AUTONOMY_PCT, FiscalStatus, classify_status, compute_deficit_flag,
};
use crate::analysis::round1;
use crate::model::MunicipalFiscalRecord;

/// Financial autonomy as a percentage: own income over budget, times 100.
///
/// Returns 0 when the budget is missing or zero, whatever the income.
pub fn compute_autonomy(record: &MunicipalFiscalRecord) -> f64 {
    let budget = record.budget();
    if budget > 0.0 {
        record.own_income() / budget * 100.0
    } else {
        0.0
    }
}

/// Year-over-year change in autonomy.
///
/// `None` when there is no previous year, meaning "insufficient history";
/// a zero change is `Some(0.0)`.
pub fn compute_trend(current: f64, previous: Option<f64>) -> Option<f64> {
    previous.map(|p| current - p)
}

/// Health summary of one municipality at its most recent year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityMetrics {
    pub id: String,
    pub name: String,
    pub department: Option<String>,
    pub latest_year: i32,
    /// Autonomy at `latest_year`, rounded to one decimal.
    pub autonomy: f64,
    /// Change against the next most recent year, rounded to one decimal.
    pub autonomy_trend: Option<f64>,
    pub status: FiscalStatus,
    pub deficit: bool,
}

/// Builds one `MunicipalityMetrics` per municipality.
///
/// Rows are grouped by (department, name). Within a group the latest year
/// drives autonomy, deficit and status; the trend compares it to the
/// second latest year. Rows without a name are skipped. The result is
/// ordered by autonomy, highest first; ties keep first-seen order.
pub fn municipality_metrics(records: &[MunicipalFiscalRecord]) -> Vec<MunicipalityMetrics> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut by_municipality: HashMap<(&str, &str), BTreeMap<i32, &MunicipalFiscalRecord>> =
        HashMap::new();

    for record in records {
        let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let key = (record.department.as_deref().unwrap_or(""), name);
        by_municipality
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                BTreeMap::new()
            })
            .insert(record.year, record);
    }

    let mut metrics: Vec<MunicipalityMetrics> = order
        .into_iter()
        .filter_map(|key| {
            let years = by_municipality.get(&key)?;
            let mut newest_first = years.values().rev();
            let latest = newest_first.next()?;
            let previous = newest_first.next();

            let autonomy = compute_autonomy(latest);
            let trend = compute_trend(autonomy, previous.map(|p| compute_autonomy(p)));
            let deficit = compute_deficit_flag(latest);

            Some(MunicipalityMetrics {
                id: latest.id.clone(),
                name: key.1.to_string(),
                department: latest.department.clone(),
                latest_year: latest.year,
                autonomy: round1(autonomy),
                autonomy_trend: trend.map(round1),
                status: classify_status(autonomy, deficit),
                deficit,
            })
        })
        .collect();

    metrics.sort_by(|a, b| b.autonomy.total_cmp(&a.autonomy));
    metrics
}

/// Counts of each status plus the average autonomy of a metrics set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub average_autonomy: f64,
    pub critical: usize,
    pub warning: usize,
    pub healthy: usize,
}

pub fn status_counts(metrics: &[MunicipalityMetrics]) -> StatusSummary {
    let total = metrics.len();
    let average_autonomy = if total > 0 {
        round1(metrics.iter().map(|m| m.autonomy).sum::<f64>() / total as f64)
    } else {
        0.0
    };
    let critical = metrics.iter().filter(|m| m.status == FiscalStatus::Critical).count();
    let warning = metrics.iter().filter(|m| m.status == FiscalStatus::Warning).count();

    StatusSummary {
        total,
        average_autonomy,
        critical,
        warning,
        healthy: total - critical - warning,
    }
}

/// Restricts metrics to one department; `None` keeps everything.
pub fn filter_by_department<'a>(
    metrics: &'a [MunicipalityMetrics],
    department: Option<&str>,
) -> Vec<&'a MunicipalityMetrics> {
    metrics
        .iter()
        .filter(|m| department.is_none() || m.department.as_deref() == department)
        .collect()
}

/// Average autonomy of a department's municipalities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentAutonomy {
    pub department: String,
    pub average_autonomy: f64,
    /// Municipalities whose autonomy is under the critical bound.
    pub below_critical: usize,
    pub municipalities: usize,
}

/// Per-department average autonomy, highest first.
pub fn department_autonomy<'a, I>(metrics: I) -> Vec<DepartmentAutonomy>
where
    I: IntoIterator<Item = &'a MunicipalityMetrics>,
{
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for m in metrics {
        if let Some(department) = m.department.as_deref().filter(|d| !d.is_empty()) {
            groups.entry(department).or_default().push(m.autonomy);
        }
    }

    let mut result: Vec<DepartmentAutonomy> = groups
        .into_iter()
        .map(|(department, autonomies)| DepartmentAutonomy {
            department: department.to_string(),
            average_autonomy: round1(autonomies.iter().sum::<f64>() / autonomies.len() as f64),
            below_critical: autonomies.iter().filter(|a| **a < CRITICAL_AUTONOMY_PCT).count(),
            municipalities: autonomies.len(),
        })
        .collect();
    result.sort_by(|a, b| b.average_autonomy.total_cmp(&a.average_autonomy));
    result
}

/// The `n` lowest-autonomy municipalities with the given status.
pub fn lowest_by_status<'a, I>(metrics: I, status: FiscalStatus, n: usize) -> Vec<&'a MunicipalityMetrics>
where
    I: IntoIterator<Item = &'a MunicipalityMetrics>,
{
    let mut selected: Vec<&MunicipalityMetrics> =
        metrics.into_iter().filter(|m| m.status == status).collect();
    selected.sort_by(|a, b| a.autonomy.total_cmp(&b.autonomy));
    selected.truncate(n);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, year: i32, budget: f64, own_income: f64) -> MunicipalFiscalRecord {
        MunicipalFiscalRecord {
            id: format!("{}-{}", name, year),
            name: Some(name.to_string()),
            department: Some("Copán".to_string()),
            year,
            presupuesto_municipal: Some(budget),
            ingresos_propios: Some(own_income),
            ..Default::default()
        }
    }

    // --- compute_autonomy ---------------------------------------------------

    #[test]
    fn test_autonomy_is_a_percentage() {
        assert_eq!(compute_autonomy(&record("A", 2024, 200.0, 50.0)), 25.0);
    }

    #[test]
    fn test_autonomy_with_zero_budget_is_zero() {
        assert_eq!(compute_autonomy(&record("A", 2024, 0.0, 1_000_000.0)), 0.0);
    }

    #[test]
    fn test_autonomy_with_missing_budget_is_zero() {
        let r = MunicipalFiscalRecord { ingresos_propios: Some(10.0), ..Default::default() };
        assert_eq!(compute_autonomy(&r), 0.0);
    }

    // --- compute_trend ------------------------------------------------------

    #[test]
    fn test_trend_without_history_is_none() {
        assert_eq!(compute_trend(25.0, None), None);
    }

    #[test]
    fn test_trend_is_simple_difference() {
        assert_eq!(compute_trend(25.0, Some(20.0)), Some(5.0));
    }

    #[test]
    fn test_zero_trend_is_not_missing() {
        assert_eq!(compute_trend(20.0, Some(20.0)), Some(0.0));
    }

    // --- municipality_metrics -----------------------------------------------

    #[test]
    fn test_single_year_municipality_has_no_trend() {
        let records = vec![record("Copán Ruinas", 2024, 100.0, 25.0)];
        let metrics = municipality_metrics(&records);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].autonomy_trend, None);
    }

    #[test]
    fn test_two_year_fixture_reports_positive_trend() {
        // Previous autonomy 20%, current 25% → trend +5.
        let records = vec![
            record("Copán Ruinas", 2023, 100.0, 20.0),
            record("Copán Ruinas", 2024, 100.0, 25.0),
        ];
        let metrics = municipality_metrics(&records);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].latest_year, 2024);
        assert_eq!(metrics[0].autonomy, 25.0);
        assert_eq!(metrics[0].autonomy_trend, Some(5.0));
        assert_eq!(metrics[0].status, FiscalStatus::Healthy);
    }

    #[test]
    fn test_latest_year_wins_regardless_of_input_order() {
        let records = vec![
            record("Santa Rosa", 2024, 100.0, 5.0),
            record("Santa Rosa", 2021, 100.0, 50.0),
            record("Santa Rosa", 2023, 100.0, 8.0),
        ];
        let metrics = municipality_metrics(&records);
        assert_eq!(metrics[0].latest_year, 2024);
        assert_eq!(metrics[0].autonomy_trend, Some(-3.0), "compares 2024 with 2023, not 2021");
        assert_eq!(metrics[0].status, FiscalStatus::Critical);
        assert!(metrics[0].deficit);
    }

    #[test]
    fn test_metrics_skip_unnamed_records_and_sort_descending() {
        let mut unnamed = record("x", 2024, 100.0, 90.0);
        unnamed.name = None;
        let records = vec![
            record("Low", 2024, 100.0, 5.0),
            unnamed,
            record("High", 2024, 100.0, 60.0),
        ];
        let metrics = municipality_metrics(&records);
        let names: Vec<_> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Low"]);
    }

    #[test]
    fn test_same_name_in_two_departments_is_two_municipalities() {
        let mut other = record("San Francisco", 2024, 100.0, 30.0);
        other.department = Some("Atlántida".to_string());
        let records = vec![record("San Francisco", 2024, 100.0, 10.0), other];
        assert_eq!(municipality_metrics(&records).len(), 2);
    }

    // --- summaries ----------------------------------------------------------

    #[test]
    fn test_status_counts_partition_the_total() {
        let records = vec![
            record("A", 2024, 100.0, 5.0),  // critical
            record("B", 2024, 100.0, 15.0), // warning
            record("C", 2024, 100.0, 40.0), // healthy
            record("D", 2024, 100.0, 50.0), // healthy
        ];
        let summary = status_counts(&municipality_metrics(&records));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.healthy, 2);
        assert_eq!(summary.average_autonomy, 27.5);
    }

    #[test]
    fn test_status_counts_of_empty_set() {
        let summary = status_counts(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_autonomy, 0.0);
    }

    #[test]
    fn test_department_autonomy_counts_below_critical() {
        let records = vec![record("A", 2024, 100.0, 5.0), record("B", 2024, 100.0, 15.0)];
        let metrics = municipality_metrics(&records);
        let by_dept = department_autonomy(&metrics);
        assert_eq!(by_dept.len(), 1);
        assert_eq!(by_dept[0].department, "Copán");
        assert_eq!(by_dept[0].average_autonomy, 10.0);
        assert_eq!(by_dept[0].below_critical, 1);
    }

    #[test]
    fn test_lowest_by_status_orders_ascending_and_truncates() {
        let records = vec![
            record("A", 2024, 100.0, 20.0),
            record("B", 2024, 100.0, 12.0),
            record("C", 2024, 100.0, 18.0),
        ];
        let metrics = municipality_metrics(&records);
        let lowest = lowest_by_status(&metrics, FiscalStatus::Warning, 2);
        let names: Vec<_> = lowest.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_filter_by_department() {
        let mut other = record("B", 2024, 100.0, 30.0);
        other.department = Some("Valle".to_string());
        let records = vec![record("A", 2024, 100.0, 10.0), other];
        let metrics = municipality_metrics(&records);
        assert_eq!(filter_by_department(&metrics, Some("Valle")).len(), 1);
        assert_eq!(filter_by_department(&metrics, None).len(), 2);
    }
}
