//! Headline figures for one year's dataset.

use serde::Serialize;

use crate::analysis::groupings::{average_field, sum_field};
use crate::model::{FiscalField, MunicipalFiscalRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardKpis {
    pub municipalities: usize,
    pub total_population: f64,
    pub average_population: f64,
    pub total_budget: f64,
    pub total_income: f64,
    /// Mean of the stored `autonomia_financiera` column; 0 for no records.
    pub average_autonomy: f64,
}

/// Totals and averages over `records`. Callers pass a single year's rows.
pub fn dashboard_kpis<'a, I>(records: I) -> DashboardKpis
where
    I: IntoIterator<Item = &'a MunicipalFiscalRecord>,
{
    let records: Vec<&MunicipalFiscalRecord> = records.into_iter().collect();
    let rows = || records.iter().copied();

    DashboardKpis {
        municipalities: records.len(),
        total_population: sum_field(rows(), FiscalField::Population),
        average_population: average_field(rows(), FiscalField::Population),
        total_budget: sum_field(rows(), FiscalField::Budget),
        total_income: sum_field(rows(), FiscalField::OwnIncome),
        average_autonomy: average_field(rows(), FiscalField::FinancialAutonomy),
    }
}
