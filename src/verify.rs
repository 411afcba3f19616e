//! Data Coverage Verification Module
//!
//! Checks a year's fetched records against the department registry to show
//! how complete the dataset is before its aggregates are trusted: which
//! departments are missing municipalities, which rows carry an unknown
//! department or duplicate a (name, department) key, and how many numeric
//! cells were left unreported and will be zero-filled by aggregation.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::departments::{DEPARTMENT_REGISTRY, find_department};
use crate::model::{FiscalField, MunicipalFiscalRecord};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub timestamp: String,
    pub year: i32,
    pub departments: Vec<DepartmentCoverage>,
    /// Departments present in the data but absent from the registry.
    pub unknown_departments: Vec<String>,
    /// Rows with no department at all.
    pub rows_without_department: usize,
    /// "name / department" keys that occur more than once.
    pub duplicates: Vec<String>,
    pub summary: CoverageSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub expected_municipalities: usize,
    pub reported_municipalities: usize,
    pub departments_complete: usize,
    pub departments_partial: usize,
    pub departments_missing: usize,
    /// Share of reported-value cells (see `null_ratio`) that are null, 0.0–1.0.
    pub null_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentCoverage {
    pub code: String,
    pub name: String,
    pub status: VerificationStatus,
    pub expected: usize,
    pub reported: usize,
    pub null_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Coverage
// ============================================================================

/// Verifies one year's records against the department registry.
///
/// Rows from other years are ignored.
pub fn verify_coverage(records: &[MunicipalFiscalRecord], year: i32) -> CoverageReport {
    let rows: Vec<&MunicipalFiscalRecord> = records.iter().filter(|r| r.year == year).collect();

    let mut per_department: BTreeMap<&str, Vec<&MunicipalFiscalRecord>> = BTreeMap::new();
    let mut rows_without_department = 0;
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for &record in &rows {
        match record.department_name() {
            Some(department) => per_department.entry(department).or_default().push(record),
            None => rows_without_department += 1,
        }
        let key = format!(
            "{} / {}",
            record.name_or_empty(),
            record.department.as_deref().unwrap_or("")
        );
        if !seen.insert(key.clone()) && !duplicates.contains(&key) {
            duplicates.push(key);
        }
    }

    let departments: Vec<DepartmentCoverage> = DEPARTMENT_REGISTRY
        .iter()
        .map(|dept| {
            let group = per_department.get(dept.name).map(Vec::as_slice).unwrap_or(&[]);
            let distinct: HashSet<&str> = group.iter().map(|r| r.name_or_empty()).collect();
            let reported = distinct.len();
            let status = if reported >= dept.municipalities {
                VerificationStatus::Success
            } else if reported > 0 {
                VerificationStatus::PartialSuccess
            } else {
                VerificationStatus::Failed
            };
            DepartmentCoverage {
                code: dept.code.to_string(),
                name: dept.name.to_string(),
                status,
                expected: dept.municipalities,
                reported,
                null_ratio: null_ratio(group.iter().copied()),
            }
        })
        .collect();

    let unknown_departments: Vec<String> = per_department
        .keys()
        .filter(|name| find_department(name).is_none())
        .map(|name| name.to_string())
        .collect();

    let count = |status: VerificationStatus| departments.iter().filter(|d| d.status == status).count();
    let summary = CoverageSummary {
        expected_municipalities: departments.iter().map(|d| d.expected).sum(),
        reported_municipalities: departments.iter().map(|d| d.reported).sum(),
        departments_complete: count(VerificationStatus::Success),
        departments_partial: count(VerificationStatus::PartialSuccess),
        departments_missing: count(VerificationStatus::Failed),
        null_ratio: null_ratio(rows.iter().copied()),
    };

    CoverageReport {
        timestamp: Utc::now().to_rfc3339(),
        year,
        departments,
        unknown_departments,
        rows_without_department,
        duplicates,
        summary,
    }
}

/// Numeric columns whose nulls `null_ratio` counts: every column except
/// the stored autonomy percentage, which the dashboard recomputes.
/// Population and the lempira amounts, surplus/deficit included, count.
pub fn reported_value_columns() -> Vec<FiscalField> {
    FiscalField::ALL
        .into_iter()
        .filter(|f| *f != FiscalField::FinancialAutonomy)
        .collect()
}

/// Share of null cells over `reported_value_columns` of `records`.
pub fn null_ratio<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a MunicipalFiscalRecord>,
{
    let columns = reported_value_columns();

    let (nulls, cells) = records.into_iter().fold((0usize, 0usize), |(nulls, cells), r| {
        let missing = columns.iter().filter(|f| f.raw(r).is_none()).count();
        (nulls + missing, cells + columns.len())
    });

    if cells == 0 { 0.0 } else { nulls as f64 / cells as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, department: Option<&str>, year: i32) -> MunicipalFiscalRecord {
        MunicipalFiscalRecord {
            id: format!("{}-{}", name, year),
            name: Some(name.to_string()),
            department: department.map(String::from),
            year,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_year_marks_every_department_failed() {
        let report = verify_coverage(&[], 2024);
        assert_eq!(report.departments.len(), 18);
        assert_eq!(report.summary.departments_missing, 18);
        assert_eq!(report.summary.expected_municipalities, 298);
        assert_eq!(report.summary.null_ratio, 0.0);
    }

    #[test]
    fn test_partial_department() {
        let records = vec![record("Nacaome", Some("Valle"), 2024), record("Amapala", Some("Valle"), 2024)];
        let report = verify_coverage(&records, 2024);
        let valle = report.departments.iter().find(|d| d.name == "Valle").expect("Valle in report");
        assert_eq!(valle.reported, 2);
        assert_eq!(valle.expected, 9);
        assert_eq!(valle.status, VerificationStatus::PartialSuccess);
    }

    #[test]
    fn test_complete_department() {
        let records: Vec<_> = ["Roatán", "Guanaja", "José Santos Guardiola", "Utila"]
            .iter()
            .map(|n| record(n, Some("Islas de la Bahía"), 2024))
            .collect();
        let report = verify_coverage(&records, 2024);
        assert_eq!(report.summary.departments_complete, 1);
    }

    #[test]
    fn test_other_years_are_ignored() {
        let records = vec![record("Nacaome", Some("Valle"), 2023)];
        let report = verify_coverage(&records, 2024);
        assert_eq!(report.summary.reported_municipalities, 0);
    }

    #[test]
    fn test_duplicates_and_unknown_departments_are_reported() {
        let records = vec![
            record("Yoro", Some("Yoro"), 2024),
            record("Yoro", Some("Yoro"), 2024),
            record("Yoro", Some("Yoro"), 2024),
            record("Atlantis", Some("Atlántico"), 2024),
            record("Nowhere", None, 2024),
        ];
        let report = verify_coverage(&records, 2024);
        assert_eq!(report.duplicates, vec!["Yoro / Yoro".to_string()]);
        assert_eq!(report.unknown_departments, vec!["Atlántico".to_string()]);
        assert_eq!(report.rows_without_department, 1);
    }

    #[test]
    fn test_null_ratio_of_fully_unreported_record_is_one() {
        let records = vec![record("Yoro", Some("Yoro"), 2024)];
        assert_eq!(null_ratio(&records), 1.0);
    }

    #[test]
    fn test_null_ratio_counts_reported_cells() {
        let mut r = record("Yoro", Some("Yoro"), 2024);
        for field in FiscalField::ALL {
            *field.slot(&mut r) = Some(1.0);
        }
        assert_eq!(null_ratio(&[r]), 0.0);
    }

    #[test]
    fn test_null_ratio_ignores_only_stored_autonomy() {
        let columns = reported_value_columns();
        assert_eq!(columns.len(), FiscalField::ALL.len() - 1);
        assert!(!columns.contains(&FiscalField::FinancialAutonomy));
        assert!(columns.contains(&FiscalField::SurplusDeficit));
        assert!(columns.contains(&FiscalField::Population));

        let mut r = record("Yoro", Some("Yoro"), 2024);
        r.autonomia_financiera = Some(12.0);
        assert_eq!(null_ratio(&[r.clone()]), 1.0, "a reported autonomy does not count");

        r.superavit_deficit = Some(-5.0);
        let expected = (columns.len() - 1) as f64 / columns.len() as f64;
        assert_eq!(null_ratio(&[r]), expected);
    }
}
