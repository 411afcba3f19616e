//! Sorting and projection of records for rankings and charts.

use serde::Serialize;

use crate::model::{FiscalField, MunicipalFiscalRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A labelled value, the unit of every bar chart and ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub department: Option<String>,
    pub value: f64,
}

/// One point of the population-versus-budget scatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPoint {
    pub x: f64,
    pub y: f64,
    pub name: String,
}

/// Sorts records by the zero-filled `field`.
///
/// The sort is stable: records with equal values keep their input order.
pub fn rank_by(
    records: &[MunicipalFiscalRecord],
    field: FiscalField,
    direction: SortDirection,
) -> Vec<&MunicipalFiscalRecord> {
    let mut ranked: Vec<&MunicipalFiscalRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        let (va, vb) = (field.value(a), field.value(b));
        match direction {
            SortDirection::Ascending => va.total_cmp(&vb),
            SortDirection::Descending => vb.total_cmp(&va),
        }
    });
    ranked
}

/// The `n` records with the highest `field`, in ranked order.
pub fn top_n(records: &[MunicipalFiscalRecord], field: FiscalField, n: usize) -> Vec<&MunicipalFiscalRecord> {
    let mut ranked = rank_by(records, field, SortDirection::Descending);
    ranked.truncate(n);
    ranked
}

/// First `n` records of the ranking, projected to named values.
///
/// Unnamed records are left out of labelled output; with `positive_only`
/// so are records whose `field` is not above zero. Both filters run before
/// the cut, so up to `n` rows come back either way.
pub fn ranked_values(
    records: &[MunicipalFiscalRecord],
    field: FiscalField,
    direction: SortDirection,
    positive_only: bool,
    n: usize,
) -> Vec<NamedValue> {
    rank_by(records, field, direction)
        .into_iter()
        .filter(|r| !positive_only || field.value(r) > 0.0)
        .filter_map(|r| to_named(r, field))
        .take(n)
        .collect()
}

/// Top `n` records among those with a positive `field`.
pub fn distribution(records: &[MunicipalFiscalRecord], field: FiscalField, n: usize) -> Vec<NamedValue> {
    ranked_values(records, field, SortDirection::Descending, true, n)
}

/// Population/budget pairs for named municipalities reporting both.
///
/// This is a filtered projection for a scatter plot; no correlation
/// statistic is computed. Points are labelled, so unnamed records are
/// skipped.
pub fn correlation_pairs(records: &[MunicipalFiscalRecord]) -> Vec<CorrelationPoint> {
    records
        .iter()
        .filter(|r| FiscalField::Population.value(r) > 0.0 && r.budget() > 0.0)
        .filter_map(|r| {
            let name = r.name.as_deref().filter(|n| !n.is_empty())?;
            Some(CorrelationPoint {
                x: FiscalField::Population.value(r),
                y: r.budget(),
                name: name.to_string(),
            })
        })
        .collect()
}

fn to_named(record: &MunicipalFiscalRecord, field: FiscalField) -> Option<NamedValue> {
    let name = record.name.as_deref().filter(|n| !n.is_empty())?;
    Some(NamedValue {
        name: name.to_string(),
        department: record.department.clone(),
        value: field.value(record),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_budget(name: &str, budget: Option<f64>) -> MunicipalFiscalRecord {
        MunicipalFiscalRecord {
            id: name.to_string(),
            name: Some(name.to_string()),
            presupuesto_municipal: budget,
            ..Default::default()
        }
    }

    fn budgets(ranked: &[&MunicipalFiscalRecord]) -> Vec<f64> {
        ranked.iter().map(|r| r.budget()).collect()
    }

    #[test]
    fn test_rank_by_budget_descending() {
        let records = vec![
            with_budget("a", Some(100.0)),
            with_budget("b", Some(300.0)),
            with_budget("c", Some(200.0)),
        ];
        let ranked = rank_by(&records, FiscalField::Budget, SortDirection::Descending);
        assert_eq!(budgets(&ranked), vec![300.0, 200.0, 100.0]);
    }

    #[test]
    fn test_rank_by_ascending() {
        let records = vec![with_budget("a", Some(100.0)), with_budget("b", None)];
        let ranked = rank_by(&records, FiscalField::Budget, SortDirection::Ascending);
        assert_eq!(ranked[0].name_or_empty(), "b", "missing budget ranks as zero");
    }

    #[test]
    fn test_rank_by_keeps_input_order_for_ties() {
        let records = vec![
            with_budget("first", Some(50.0)),
            with_budget("top", Some(90.0)),
            with_budget("second", Some(50.0)),
        ];
        let ranked = rank_by(&records, FiscalField::Budget, SortDirection::Descending);
        let names: Vec<_> = ranked.iter().map(|r| r.name_or_empty()).collect();
        assert_eq!(names, vec!["top", "first", "second"]);
    }

    #[test]
    fn test_top_n_returns_highest_in_ranked_order() {
        let records = vec![
            with_budget("a", Some(100.0)),
            with_budget("b", Some(300.0)),
            with_budget("c", Some(200.0)),
        ];
        let top = top_n(&records, FiscalField::Budget, 2);
        assert_eq!(budgets(&top), vec![300.0, 200.0]);
    }

    #[test]
    fn test_top_n_larger_than_input() {
        let records = vec![with_budget("a", Some(1.0))];
        assert_eq!(top_n(&records, FiscalField::Budget, 10).len(), 1);
    }

    #[test]
    fn test_distribution_skips_non_positive_values() {
        let records = vec![
            with_budget("a", Some(0.0)),
            with_budget("b", Some(5.0)),
            with_budget("c", None),
        ];
        let dist = distribution(&records, FiscalField::Budget, 20);
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].name, "b");
    }

    #[test]
    fn test_ranked_values_skip_unnamed_records_before_the_cut() {
        let mut unnamed = with_budget("x", Some(999.0));
        unnamed.name = None;
        let records = vec![unnamed, with_budget("a", Some(1.0))];
        let top = ranked_values(&records, FiscalField::Budget, SortDirection::Descending, false, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "a");
    }

    #[test]
    fn test_ranked_values_ascending_positive_only() {
        let records = vec![
            with_budget("zero", Some(0.0)),
            with_budget("big", Some(300.0)),
            with_budget("none", None),
            with_budget("small", Some(20.0)),
        ];
        let names = |rows: Vec<NamedValue>| rows.into_iter().map(|v| v.name).collect::<Vec<_>>();

        let lowest = ranked_values(&records, FiscalField::Budget, SortDirection::Ascending, true, 5);
        assert_eq!(names(lowest), vec!["small", "big"]);

        let lowest_any = ranked_values(&records, FiscalField::Budget, SortDirection::Ascending, false, 2);
        assert_eq!(names(lowest_any), vec!["zero", "none"], "ties keep input order");
    }

    #[test]
    fn test_correlation_pairs_require_population_and_budget() {
        let mut both = with_budget("both", Some(1_000.0));
        both.population = Some(50.0);
        let mut pop_only = with_budget("pop", None);
        pop_only.population = Some(10.0);
        let budget_only = with_budget("budget", Some(10.0));

        let pairs = correlation_pairs(&[both, pop_only, budget_only]);
        assert_eq!(
            pairs,
            vec![CorrelationPoint { x: 50.0, y: 1_000.0, name: "both".to_string() }]
        );
    }

    #[test]
    fn test_correlation_pairs_skip_unnamed_records() {
        let mut unnamed = with_budget("x", Some(5.0));
        unnamed.name = None;
        unnamed.population = Some(10.0);
        let mut blank = with_budget("", Some(5.0));
        blank.population = Some(10.0);
        assert!(correlation_pairs(&[unnamed, blank]).is_empty());
    }
}
