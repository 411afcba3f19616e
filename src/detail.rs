/// Per-municipality fiscal detail.
///
/// Reshapes one fiscal record into the seven labelled sections of the
/// drill-down view: general figures, tax income, non-tax income, capital
/// income, operating expenditure, capital and debt expenditure, and total
/// expenditure. Each line item carries its share of the section total.

use serde::Serialize;

use crate::model::MunicipalFiscalRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub label: &'static str,
    pub amount: f64,
    /// Share of the section total in percent; `None` when the total is 0.
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailSection {
    pub title: &'static str,
    pub total: f64,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiscalDetail {
    pub municipality: String,
    pub department: String,
    pub year: i32,
    pub general: DetailSection,
    pub tax_income: DetailSection,
    pub non_tax_income: DetailSection,
    pub capital_income: DetailSection,
    pub operating_expenditure: DetailSection,
    pub capital_expenditure: DetailSection,
    pub total_expenditure: DetailSection,
}

impl FiscalDetail {
    /// Sections in display order.
    pub fn sections(&self) -> [&DetailSection; 7] {
        [
            &self.general,
            &self.tax_income,
            &self.non_tax_income,
            &self.capital_income,
            &self.operating_expenditure,
            &self.capital_expenditure,
            &self.total_expenditure,
        ]
    }
}

fn section(title: &'static str, total: f64, items: &[(&'static str, Option<f64>)]) -> DetailSection {
    let items = items
        .iter()
        .map(|&(label, amount)| {
            let amount = amount.unwrap_or(0.0);
            LineItem {
                label,
                amount,
                percentage: (total != 0.0).then(|| amount / total * 100.0),
            }
        })
        .collect();
    DetailSection { title, total, items }
}

/// Builds the drill-down view of one record. Missing amounts are shown as 0.
pub fn build_fiscal_detail(r: &MunicipalFiscalRecord) -> FiscalDetail {
    let zero = |v: Option<f64>| v.unwrap_or(0.0);

    // General figures mix units (population, lempiras, percent), so no
    // item is expressed as a share of the budget.
    let general = DetailSection {
        title: "General",
        total: r.budget(),
        items: [
            ("Population", r.population),
            ("Municipal budget", r.presupuesto_municipal),
            ("Budgeted expenditure", r.gastos_presupuestados),
            ("Own income", r.ingresos_propios),
            ("Collected income", r.ingresos_recaudados),
            ("Financial autonomy", r.autonomia_financiera),
            ("Current income", r.ingresos_corrientes),
        ]
        .into_iter()
        .map(|(label, amount)| LineItem { label, amount: zero(amount), percentage: None })
        .collect(),
    };

    let non_tax_total = zero(r.tasas_servicios) + zero(r.derechos) + zero(r.ingresos_no_tributarios);

    FiscalDetail {
        municipality: r.name_or_empty().to_string(),
        department: r.department.clone().unwrap_or_default(),
        year: r.year,
        general,
        tax_income: section(
            "Tax income",
            zero(r.ingresos_tributarios),
            &[
                ("Property tax", r.impuesto_bi),
                ("Personal tax", r.impuesto_personal),
                ("Industry and commerce tax", r.impuesto_industria),
                ("Commerce tax", r.impuesto_comercio),
                ("Services tax", r.impuesto_servicios),
                ("Livestock tax", r.impuesto_pecuario),
                ("Extraction tax", r.impuesto_extraccion),
                ("Telecommunications tax", r.impuesto_telecomunicaciones),
            ],
        ),
        non_tax_income: section(
            "Non-tax income",
            non_tax_total,
            &[
                ("Fees and services", r.tasas_servicios),
                ("Rights", r.derechos),
                ("Other non-tax income", r.ingresos_no_tributarios),
            ],
        ),
        capital_income: section(
            "Capital income",
            zero(r.ingresos_capital),
            &[
                ("Loans", r.prestamos),
                ("Asset sales", r.venta_activos),
                ("Contributions", r.contribuciones),
                ("Bond proceeds", r.colocacion_bonos),
                ("Art. 91 transfers", r.transferencias_art91),
                ("Other transfers", r.otras_transferencias),
                ("Subsidies", r.subsidios),
                ("Inheritances and legacies", r.herencias_legados),
                ("Other capital income", r.otros_ingresos_capital),
                ("Balance carry-forward", r.recursos_balance),
            ],
        ),
        operating_expenditure: section(
            "Operating expenditure",
            zero(r.gastos_funcionamiento),
            &[
                ("Personnel services", r.servicios_personales),
                ("Non-personnel services", r.servicios_no_personales),
                ("Materials and supplies", r.materiales_suministro),
                ("Current transfers", r.transferencias_corrientes),
                ("Other expenses", r.otros_gastos),
            ],
        ),
        capital_expenditure: section(
            "Capital and public debt expenditure",
            zero(r.gastos_capital_deuda),
            &[
                ("Capitalizable goods", r.bienes_capitalizables),
                ("Capital transfers", r.transferencias_capital),
                ("Financial assets", r.activos_financieros),
                ("Debt service", r.servicios_deuda),
                ("Other capital expenses", r.otros_gastos_capital),
                ("Global allocations", r.asignaciones_globales),
            ],
        ),
        total_expenditure: DetailSection {
            title: "Total expenditure",
            total: zero(r.total_egresos),
            items: vec![
                LineItem { label: "Total expenditure", amount: zero(r.total_egresos), percentage: None },
                LineItem { label: "Surplus/deficit", amount: zero(r.superavit_deficit), percentage: None },
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MunicipalFiscalRecord {
        MunicipalFiscalRecord {
            id: "0801-2024".to_string(),
            name: Some("Distrito Central".to_string()),
            department: Some("Francisco Morazán".to_string()),
            year: 2024,
            presupuesto_municipal: Some(1_000.0),
            ingresos_tributarios: Some(400.0),
            impuesto_bi: Some(100.0),
            impuesto_industria: Some(300.0),
            tasas_servicios: Some(30.0),
            derechos: Some(20.0),
            ingresos_no_tributarios: None,
            gastos_funcionamiento: Some(0.0),
            total_egresos: Some(900.0),
            superavit_deficit: Some(100.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_detail_has_seven_sections_in_order() {
        let detail = build_fiscal_detail(&sample());
        let titles: Vec<_> = detail.sections().iter().map(|s| s.title).collect();
        assert_eq!(titles.len(), 7);
        assert_eq!(titles[0], "General");
        assert_eq!(titles[6], "Total expenditure");
    }

    #[test]
    fn test_tax_percentages_sum_to_one_hundred() {
        let detail = build_fiscal_detail(&sample());
        let total: f64 = detail
            .tax_income
            .items
            .iter()
            .map(|i| i.percentage.expect("non-zero section total"))
            .sum();
        assert!((total - 100.0).abs() < 1e-9, "tax shares sum to {}", total);
    }

    #[test]
    fn test_non_tax_total_is_sum_of_its_items() {
        let detail = build_fiscal_detail(&sample());
        assert_eq!(detail.non_tax_income.total, 50.0);
        assert_eq!(detail.non_tax_income.items[2].amount, 0.0, "missing amount shows as 0");
    }

    #[test]
    fn test_zero_total_section_has_no_percentages() {
        let detail = build_fiscal_detail(&sample());
        assert!(detail.operating_expenditure.items.iter().all(|i| i.percentage.is_none()));
    }

    #[test]
    fn test_identity_fields() {
        let detail = build_fiscal_detail(&sample());
        assert_eq!(detail.municipality, "Distrito Central");
        assert_eq!(detail.department, "Francisco Morazán");
        assert_eq!(detail.total_expenditure.items[1].amount, 100.0);
    }
}
