//! Multi-year budget history of one municipality.
//!
//! Lines up the selected years of a single municipality, newest first:
//! budget against expenditure, the income series charted in millions,
//! operating spend, and the tax categories summed over the whole window.

use serde::Serialize;

use crate::analysis::compare::MunicipalitySelection;
use crate::analysis::round0;
use crate::model::{FiscalField, MunicipalFiscalRecord};

/// Tax categories of the breakdown, in display order.
const TAX_CATEGORIES: [(&str, FiscalField); 5] = [
    ("Property tax (BI)", FiscalField::PropertyTax),
    ("Personal", FiscalField::PersonalTax),
    ("Industry", FiscalField::IndustryTax),
    ("Commerce", FiscalField::CommerceTax),
    ("Services", FiscalField::ServicesTax),
];

/// One year of the history. Amounts are lempiras; `*_m` fields are whole
/// millions for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetYear {
    pub year: i32,
    pub budget: f64,
    pub expenditure: f64,
    pub surplus_deficit: f64,
    pub operating_expenditure: f64,
    pub capital_income: f64,
    pub capital_debt_expenditure: f64,
    pub own_income_m: f64,
    pub current_income_m: f64,
    pub collected_income_m: f64,
    pub personnel_m: f64,
    pub non_personnel_m: f64,
}

impl BudgetYear {
    fn from_record(r: &MunicipalFiscalRecord) -> Self {
        let millions = |field: FiscalField| round0(field.value(r) / 1_000_000.0);
        BudgetYear {
            year: r.year,
            budget: r.budget(),
            expenditure: FiscalField::TotalExpenditure.value(r),
            surplus_deficit: FiscalField::SurplusDeficit.value(r),
            operating_expenditure: FiscalField::OperatingExpenditure.value(r),
            capital_income: FiscalField::CapitalIncome.value(r),
            capital_debt_expenditure: FiscalField::CapitalDebtExpenditure.value(r),
            own_income_m: millions(FiscalField::OwnIncome),
            current_income_m: millions(FiscalField::CurrentIncome),
            collected_income_m: millions(FiscalField::CollectedIncome),
            personnel_m: millions(FiscalField::PersonnelServices),
            non_personnel_m: millions(FiscalField::NonPersonnelServices),
        }
    }

    pub fn is_surplus(&self) -> bool {
        self.surplus_deficit > 0.0
    }
}

/// Headline cards, taken from the newest year in the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetHeadline {
    pub year: i32,
    pub budget: f64,
    /// Stored autonomy column, 0 when unreported.
    pub autonomy: f64,
    pub surplus_deficit: f64,
    pub population: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxShare {
    pub category: &'static str,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetHistory {
    pub municipality: String,
    pub department: Option<String>,
    /// Newest year first.
    pub years: Vec<BudgetYear>,
    /// `None` when no year of the window has a record.
    pub headline: Option<BudgetHeadline>,
    /// Tax categories summed over the window; only positive totals.
    pub taxes: Vec<TaxShare>,
}

/// Builds the budget history of `selection` over `years`.
///
/// Each year resolves the same row the comparison views use. Years
/// without a record are skipped.
pub fn budget_history(
    records: &[MunicipalFiscalRecord],
    selection: &MunicipalitySelection,
    years: &[i32],
) -> BudgetHistory {
    let mut window: Vec<i32> = years.to_vec();
    window.sort_unstable_by(|a, b| b.cmp(a));
    window.dedup();

    let rows: Vec<&MunicipalFiscalRecord> = window
        .into_iter()
        .filter_map(|year| selection.resolve(records, year))
        .collect();

    let headline = rows.first().map(|r| BudgetHeadline {
        year: r.year,
        budget: r.budget(),
        autonomy: FiscalField::FinancialAutonomy.value(r),
        surplus_deficit: FiscalField::SurplusDeficit.value(r),
        population: FiscalField::Population.value(r),
    });

    let taxes = TAX_CATEGORIES
        .iter()
        .map(|&(category, field)| TaxShare {
            category,
            amount: rows.iter().map(|r| field.value(r)).sum(),
        })
        .filter(|t| t.amount > 0.0)
        .collect();

    BudgetHistory {
        municipality: selection.name.clone(),
        department: selection
            .department
            .clone()
            .or_else(|| rows.first().and_then(|r| r.department.clone())),
        years: rows.iter().map(|r| BudgetYear::from_record(r)).collect(),
        headline,
        taxes,
    }
}
