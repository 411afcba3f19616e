//! Financial autonomy threshold checking.
//!
//! Classifies a municipality's fiscal health from its autonomy percentage
//! and its self-financing deficit flag. The thresholds are fixed business
//! constants; they are collected in `FiscalThresholds::STANDARD` so every
//! caller uses the same values.

use serde::Serialize;

use crate::analysis::metrics::compute_autonomy;
use crate::model::MunicipalFiscalRecord;

/// Autonomy (percent) under which a municipality with a deficit is critical.
pub const CRITICAL_AUTONOMY_PCT: f64 = 10.0;

/// Autonomy (percent) under which a municipality is at least a warning.
pub const WARNING_AUTONOMY_PCT: f64 = 25.0;

/// Share of the budget that own income must reach to avoid the deficit flag.
pub const DEFICIT_SELF_FUNDING_RATIO: f64 = 0.10;

/// Threshold set used to classify fiscal health.
///
/// Levels in ascending order:
///   critical_autonomy_pct < warning_autonomy_pct
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiscalThresholds {
    pub critical_autonomy_pct: f64,
    pub warning_autonomy_pct: f64,
    pub deficit_ratio: f64,
}

impl FiscalThresholds {
    pub const STANDARD: FiscalThresholds = FiscalThresholds {
        critical_autonomy_pct: CRITICAL_AUTONOMY_PCT,
        warning_autonomy_pct: WARNING_AUTONOMY_PCT,
        deficit_ratio: DEFICIT_SELF_FUNDING_RATIO,
    };
}

/// Fiscal health levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for FiscalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiscalStatus::Healthy => write!(f, "healthy"),
            FiscalStatus::Warning => write!(f, "warning"),
            FiscalStatus::Critical => write!(f, "critical"),
        }
    }
}

/// An alert raised for a municipality that is not healthy.
#[derive(Debug, Clone, PartialEq)]
pub struct FiscalAlert {
    pub status: FiscalStatus,
    pub message: String,
}

/// Returns `true` when own income is below 10% of the budget.
///
/// With no budget the comparison is `own_income < 0`, which never holds for
/// non-negative amounts, so a zero-budget record is not flagged.
pub fn compute_deficit_flag(record: &MunicipalFiscalRecord) -> bool {
    compute_deficit_flag_with(record, &FiscalThresholds::STANDARD)
}

/// `compute_deficit_flag` against an explicit threshold set.
pub fn compute_deficit_flag_with(record: &MunicipalFiscalRecord, thresholds: &FiscalThresholds) -> bool {
    record.own_income() < record.budget() * thresholds.deficit_ratio
}

/// Classifies fiscal health.
///
/// Conditions are evaluated in order and are mutually exclusive:
///   autonomy < 10 and deficit  →  critical
///   autonomy < 25              →  warning
///   otherwise                  →  healthy
///
/// Both bounds are exclusive: exactly 10 is not critical, exactly 25 is
/// healthy.
pub fn classify_status(autonomy: f64, deficit: bool) -> FiscalStatus {
    classify_status_with(autonomy, deficit, &FiscalThresholds::STANDARD)
}

/// `classify_status` against an explicit threshold set.
pub fn classify_status_with(
    autonomy: f64,
    deficit: bool,
    thresholds: &FiscalThresholds,
) -> FiscalStatus {
    if autonomy < thresholds.critical_autonomy_pct && deficit {
        FiscalStatus::Critical
    } else if autonomy < thresholds.warning_autonomy_pct {
        FiscalStatus::Warning
    } else {
        FiscalStatus::Healthy
    }
}

/// Checks a record's fiscal health and returns an alert if it is not
/// healthy.
///
/// Returns `None` for healthy municipalities.
pub fn check_fiscal_health(record: &MunicipalFiscalRecord) -> Option<FiscalAlert> {
    check_fiscal_health_with(record, &FiscalThresholds::STANDARD)
}

/// `check_fiscal_health` against an explicit threshold set.
pub fn check_fiscal_health_with(
    record: &MunicipalFiscalRecord,
    thresholds: &FiscalThresholds,
) -> Option<FiscalAlert> {
    let autonomy = compute_autonomy(record);
    let deficit = compute_deficit_flag_with(record, thresholds);
    let status = classify_status_with(autonomy, deficit, thresholds);

    let name = record.name_or_empty();
    let message = match status {
        FiscalStatus::Healthy => return None,
        FiscalStatus::Critical => format!(
            "{} ({}): autonomy {:.1}% with own income below {:.0}% of budget",
            name,
            record.year,
            autonomy,
            thresholds.deficit_ratio * 100.0
        ),
        FiscalStatus::Warning => format!(
            "{} ({}): autonomy {:.1}% below {:.0}%",
            name, record.year, autonomy, thresholds.warning_autonomy_pct
        ),
    };

    Some(FiscalAlert { status, message })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(budget: Option<f64>, own_income: Option<f64>) -> MunicipalFiscalRecord {
        MunicipalFiscalRecord {
            id: "1".to_string(),
            name: Some("Gracias".to_string()),
            department: Some("Lempira".to_string()),
            year: 2024,
            presupuesto_municipal: budget,
            ingresos_propios: own_income,
            ..Default::default()
        }
    }

    // --- classify_status ----------------------------------------------------

    #[test]
    fn test_low_autonomy_with_deficit_is_critical() {
        assert_eq!(classify_status(5.0, true), FiscalStatus::Critical);
    }

    #[test]
    fn test_low_autonomy_without_deficit_is_warning() {
        assert_eq!(classify_status(5.0, false), FiscalStatus::Warning);
    }

    #[test]
    fn test_high_autonomy_is_healthy() {
        assert_eq!(classify_status(30.0, false), FiscalStatus::Healthy);
    }

    #[test]
    fn test_autonomy_exactly_10_is_not_critical() {
        assert_eq!(
            classify_status(10.0, true),
            FiscalStatus::Warning,
            "the critical bound is strictly less than 10"
        );
    }

    #[test]
    fn test_autonomy_exactly_25_is_healthy() {
        assert_eq!(
            classify_status(25.0, false),
            FiscalStatus::Healthy,
            "the warning bound is strictly less than 25"
        );
    }

    #[test]
    fn test_deficit_alone_does_not_make_high_autonomy_critical() {
        assert_eq!(classify_status(40.0, true), FiscalStatus::Healthy);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(FiscalStatus::Healthy < FiscalStatus::Warning);
        assert!(FiscalStatus::Warning < FiscalStatus::Critical);
    }

    #[test]
    fn test_standard_thresholds_are_ordered() {
        let t = FiscalThresholds::STANDARD;
        assert!(t.critical_autonomy_pct < t.warning_autonomy_pct);
        assert!(t.deficit_ratio > 0.0 && t.deficit_ratio < 1.0);
    }

    // --- compute_deficit_flag -----------------------------------------------

    #[test]
    fn test_deficit_flag_below_ten_percent() {
        assert!(compute_deficit_flag(&record(Some(1_000.0), Some(99.0))));
    }

    #[test]
    fn test_deficit_flag_at_exactly_ten_percent_is_false() {
        assert!(!compute_deficit_flag(&record(Some(1_000.0), Some(100.0))));
    }

    #[test]
    fn test_deficit_flag_with_missing_budget_is_false() {
        assert!(!compute_deficit_flag(&record(None, None)));
    }

    // --- check_fiscal_health ------------------------------------------------

    #[test]
    fn test_healthy_record_raises_no_alert() {
        assert!(check_fiscal_health(&record(Some(100.0), Some(60.0))).is_none());
    }

    #[test]
    fn test_critical_record_raises_critical_alert() {
        let alert = check_fiscal_health(&record(Some(1_000.0), Some(50.0)))
            .expect("5% autonomy with deficit should alert");
        assert_eq!(alert.status, FiscalStatus::Critical);
        assert!(alert.message.contains("Gracias"), "message: {}", alert.message);
    }

    #[test]
    fn test_zero_budget_record_is_warning() {
        // Autonomy is 0 without a budget, but the deficit flag is false.
        let alert = check_fiscal_health(&record(Some(0.0), Some(500.0)))
            .expect("zero autonomy should alert");
        assert_eq!(alert.status, FiscalStatus::Warning);
    }

    #[test]
    fn test_custom_deficit_ratio_changes_the_flag_and_the_alert() {
        let strict = FiscalThresholds { deficit_ratio: 0.20, ..FiscalThresholds::STANDARD };
        let r = record(Some(1_000.0), Some(50.0));
        assert!(compute_deficit_flag_with(&r, &strict));

        let lenient = FiscalThresholds { deficit_ratio: 0.01, ..FiscalThresholds::STANDARD };
        assert!(!compute_deficit_flag_with(&r, &lenient));
        let alert = check_fiscal_health_with(&r, &lenient).expect("5% autonomy still warns");
        assert_eq!(alert.status, FiscalStatus::Warning, "no deficit under the lenient ratio");

        let alert = check_fiscal_health_with(&r, &strict).expect("critical under the strict ratio");
        assert!(alert.message.contains("below 20% of budget"), "message: {}", alert.message);
    }
}
