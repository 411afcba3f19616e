/// Core data types for the municipal finance service.
///
/// This module defines the shared domain model imported by all other modules:
/// the fiscal record as stored in the backend table, the closed set of numeric
/// columns that aggregation routines can address, and the error type.
/// It contains no I/O.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Name of the backend table holding one row per (municipality, year).
pub const DEFAULT_TABLE: &str = "municipalities";

// ---------------------------------------------------------------------------
// Record type
// ---------------------------------------------------------------------------

/// One municipality's full income/expenditure breakdown for a single year.
///
/// Field names match the backend column names so the PostgREST JSON body
/// deserializes directly. Every monetary field is `None` when unreported;
/// aggregation treats `None` as zero (see `FiscalField::value`).
///
/// Records are never mutated after fetch. Aggregations borrow them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MunicipalFiscalRecord {
    pub id: String,
    pub code: Option<i64>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub year: i32,

    pub population: Option<f64>,
    pub presupuesto_municipal: Option<f64>,
    pub gastos_presupuestados: Option<f64>,

    // Income
    pub ingresos_propios: Option<f64>,
    pub ingresos_recaudados: Option<f64>,
    pub ingresos_tributarios: Option<f64>,
    pub ingresos_corrientes: Option<f64>,

    // Tax sub-categories
    pub impuesto_bi: Option<f64>,
    pub impuesto_personal: Option<f64>,
    pub impuesto_industria: Option<f64>,
    pub impuesto_comercio: Option<f64>,
    pub impuesto_servicios: Option<f64>,
    pub impuesto_pecuario: Option<f64>,
    pub impuesto_extraccion: Option<f64>,
    pub impuesto_telecomunicaciones: Option<f64>,

    // Non-tax income
    pub tasas_servicios: Option<f64>,
    pub derechos: Option<f64>,
    pub ingresos_no_tributarios: Option<f64>,

    // Capital income
    pub ingresos_capital: Option<f64>,
    pub prestamos: Option<f64>,
    pub venta_activos: Option<f64>,
    pub contribuciones: Option<f64>,
    pub colocacion_bonos: Option<f64>,
    pub transferencias_art91: Option<f64>,
    pub otras_transferencias: Option<f64>,
    pub subsidios: Option<f64>,
    pub herencias_legados: Option<f64>,
    pub otros_ingresos_capital: Option<f64>,
    pub recursos_balance: Option<f64>,

    // Operating expenditure
    pub gastos_funcionamiento: Option<f64>,
    pub servicios_personales: Option<f64>,
    pub servicios_no_personales: Option<f64>,
    pub materiales_suministro: Option<f64>,
    pub transferencias_corrientes: Option<f64>,
    pub otros_gastos: Option<f64>,

    // Capital and public debt expenditure
    pub gastos_capital_deuda: Option<f64>,
    pub bienes_capitalizables: Option<f64>,
    pub transferencias_capital: Option<f64>,
    pub activos_financieros: Option<f64>,
    pub servicios_deuda: Option<f64>,
    pub otros_gastos_capital: Option<f64>,
    pub asignaciones_globales: Option<f64>,

    // Totals and stored ratios
    pub total_egresos: Option<f64>,
    pub autonomia_financiera: Option<f64>,
    pub superavit_deficit: Option<f64>,
    pub gasto_corriente: Option<f64>,
    pub ingreso_corriente_ajustado: Option<f64>,
}

impl MunicipalFiscalRecord {
    /// Municipality name, or `""` when the backend has none.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Department name if present and non-empty.
    pub fn department_name(&self) -> Option<&str> {
        self.department.as_deref().filter(|d| !d.is_empty())
    }

    /// Municipal budget, zero-filled.
    pub fn budget(&self) -> f64 {
        self.presupuesto_municipal.unwrap_or(0.0)
    }

    /// Own-source income, zero-filled.
    pub fn own_income(&self) -> f64 {
        self.ingresos_propios.unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Addressable numeric columns
// ---------------------------------------------------------------------------

/// Every numeric column of `MunicipalFiscalRecord` that aggregation,
/// ranking and export can address by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiscalField {
    Population,
    Budget,
    BudgetedExpenditure,
    OwnIncome,
    CollectedIncome,
    TaxIncome,
    CurrentIncome,
    PropertyTax,
    PersonalTax,
    IndustryTax,
    CommerceTax,
    ServicesTax,
    LivestockTax,
    ExtractionTax,
    TelecomTax,
    ServiceFees,
    Rights,
    OtherNonTaxIncome,
    CapitalIncome,
    Loans,
    AssetSales,
    Contributions,
    BondProceeds,
    Art91Transfers,
    OtherTransfers,
    Subsidies,
    Legacies,
    OtherCapitalIncome,
    BalanceCarryForward,
    OperatingExpenditure,
    PersonnelServices,
    NonPersonnelServices,
    Materials,
    CurrentTransfers,
    OtherExpenses,
    CapitalDebtExpenditure,
    CapitalizableGoods,
    CapitalTransfers,
    FinancialAssets,
    DebtService,
    OtherCapitalExpenses,
    GlobalAllocations,
    TotalExpenditure,
    FinancialAutonomy,
    SurplusDeficit,
    CurrentExpenditure,
    AdjustedCurrentIncome,
}

impl FiscalField {
    /// All addressable columns, in backend column order.
    pub const ALL: [FiscalField; 47] = [
        FiscalField::Population,
        FiscalField::Budget,
        FiscalField::BudgetedExpenditure,
        FiscalField::OwnIncome,
        FiscalField::CollectedIncome,
        FiscalField::TaxIncome,
        FiscalField::CurrentIncome,
        FiscalField::PropertyTax,
        FiscalField::PersonalTax,
        FiscalField::IndustryTax,
        FiscalField::CommerceTax,
        FiscalField::ServicesTax,
        FiscalField::LivestockTax,
        FiscalField::ExtractionTax,
        FiscalField::TelecomTax,
        FiscalField::ServiceFees,
        FiscalField::Rights,
        FiscalField::OtherNonTaxIncome,
        FiscalField::CapitalIncome,
        FiscalField::Loans,
        FiscalField::AssetSales,
        FiscalField::Contributions,
        FiscalField::BondProceeds,
        FiscalField::Art91Transfers,
        FiscalField::OtherTransfers,
        FiscalField::Subsidies,
        FiscalField::Legacies,
        FiscalField::OtherCapitalIncome,
        FiscalField::BalanceCarryForward,
        FiscalField::OperatingExpenditure,
        FiscalField::PersonnelServices,
        FiscalField::NonPersonnelServices,
        FiscalField::Materials,
        FiscalField::CurrentTransfers,
        FiscalField::OtherExpenses,
        FiscalField::CapitalDebtExpenditure,
        FiscalField::CapitalizableGoods,
        FiscalField::CapitalTransfers,
        FiscalField::FinancialAssets,
        FiscalField::DebtService,
        FiscalField::OtherCapitalExpenses,
        FiscalField::GlobalAllocations,
        FiscalField::TotalExpenditure,
        FiscalField::FinancialAutonomy,
        FiscalField::SurplusDeficit,
        FiscalField::CurrentExpenditure,
        FiscalField::AdjustedCurrentIncome,
    ];

    /// Backend column name.
    pub fn column(self) -> &'static str {
        match self {
            FiscalField::Population => "population",
            FiscalField::Budget => "presupuesto_municipal",
            FiscalField::BudgetedExpenditure => "gastos_presupuestados",
            FiscalField::OwnIncome => "ingresos_propios",
            FiscalField::CollectedIncome => "ingresos_recaudados",
            FiscalField::TaxIncome => "ingresos_tributarios",
            FiscalField::CurrentIncome => "ingresos_corrientes",
            FiscalField::PropertyTax => "impuesto_bi",
            FiscalField::PersonalTax => "impuesto_personal",
            FiscalField::IndustryTax => "impuesto_industria",
            FiscalField::CommerceTax => "impuesto_comercio",
            FiscalField::ServicesTax => "impuesto_servicios",
            FiscalField::LivestockTax => "impuesto_pecuario",
            FiscalField::ExtractionTax => "impuesto_extraccion",
            FiscalField::TelecomTax => "impuesto_telecomunicaciones",
            FiscalField::ServiceFees => "tasas_servicios",
            FiscalField::Rights => "derechos",
            FiscalField::OtherNonTaxIncome => "ingresos_no_tributarios",
            FiscalField::CapitalIncome => "ingresos_capital",
            FiscalField::Loans => "prestamos",
            FiscalField::AssetSales => "venta_activos",
            FiscalField::Contributions => "contribuciones",
            FiscalField::BondProceeds => "colocacion_bonos",
            FiscalField::Art91Transfers => "transferencias_art91",
            FiscalField::OtherTransfers => "otras_transferencias",
            FiscalField::Subsidies => "subsidios",
            FiscalField::Legacies => "herencias_legados",
            FiscalField::OtherCapitalIncome => "otros_ingresos_capital",
            FiscalField::BalanceCarryForward => "recursos_balance",
            FiscalField::OperatingExpenditure => "gastos_funcionamiento",
            FiscalField::PersonnelServices => "servicios_personales",
            FiscalField::NonPersonnelServices => "servicios_no_personales",
            FiscalField::Materials => "materiales_suministro",
            FiscalField::CurrentTransfers => "transferencias_corrientes",
            FiscalField::OtherExpenses => "otros_gastos",
            FiscalField::CapitalDebtExpenditure => "gastos_capital_deuda",
            FiscalField::CapitalizableGoods => "bienes_capitalizables",
            FiscalField::CapitalTransfers => "transferencias_capital",
            FiscalField::FinancialAssets => "activos_financieros",
            FiscalField::DebtService => "servicios_deuda",
            FiscalField::OtherCapitalExpenses => "otros_gastos_capital",
            FiscalField::GlobalAllocations => "asignaciones_globales",
            FiscalField::TotalExpenditure => "total_egresos",
            FiscalField::FinancialAutonomy => "autonomia_financiera",
            FiscalField::SurplusDeficit => "superavit_deficit",
            FiscalField::CurrentExpenditure => "gasto_corriente",
            FiscalField::AdjustedCurrentIncome => "ingreso_corriente_ajustado",
        }
    }

    /// The raw, possibly-missing value of this column.
    pub fn raw(self, r: &MunicipalFiscalRecord) -> Option<f64> {
        match self {
            FiscalField::Population => r.population,
            FiscalField::Budget => r.presupuesto_municipal,
            FiscalField::BudgetedExpenditure => r.gastos_presupuestados,
            FiscalField::OwnIncome => r.ingresos_propios,
            FiscalField::CollectedIncome => r.ingresos_recaudados,
            FiscalField::TaxIncome => r.ingresos_tributarios,
            FiscalField::CurrentIncome => r.ingresos_corrientes,
            FiscalField::PropertyTax => r.impuesto_bi,
            FiscalField::PersonalTax => r.impuesto_personal,
            FiscalField::IndustryTax => r.impuesto_industria,
            FiscalField::CommerceTax => r.impuesto_comercio,
            FiscalField::ServicesTax => r.impuesto_servicios,
            FiscalField::LivestockTax => r.impuesto_pecuario,
            FiscalField::ExtractionTax => r.impuesto_extraccion,
            FiscalField::TelecomTax => r.impuesto_telecomunicaciones,
            FiscalField::ServiceFees => r.tasas_servicios,
            FiscalField::Rights => r.derechos,
            FiscalField::OtherNonTaxIncome => r.ingresos_no_tributarios,
            FiscalField::CapitalIncome => r.ingresos_capital,
            FiscalField::Loans => r.prestamos,
            FiscalField::AssetSales => r.venta_activos,
            FiscalField::Contributions => r.contribuciones,
            FiscalField::BondProceeds => r.colocacion_bonos,
            FiscalField::Art91Transfers => r.transferencias_art91,
            FiscalField::OtherTransfers => r.otras_transferencias,
            FiscalField::Subsidies => r.subsidios,
            FiscalField::Legacies => r.herencias_legados,
            FiscalField::OtherCapitalIncome => r.otros_ingresos_capital,
            FiscalField::BalanceCarryForward => r.recursos_balance,
            FiscalField::OperatingExpenditure => r.gastos_funcionamiento,
            FiscalField::PersonnelServices => r.servicios_personales,
            FiscalField::NonPersonnelServices => r.servicios_no_personales,
            FiscalField::Materials => r.materiales_suministro,
            FiscalField::CurrentTransfers => r.transferencias_corrientes,
            FiscalField::OtherExpenses => r.otros_gastos,
            FiscalField::CapitalDebtExpenditure => r.gastos_capital_deuda,
            FiscalField::CapitalizableGoods => r.bienes_capitalizables,
            FiscalField::CapitalTransfers => r.transferencias_capital,
            FiscalField::FinancialAssets => r.activos_financieros,
            FiscalField::DebtService => r.servicios_deuda,
            FiscalField::OtherCapitalExpenses => r.otros_gastos_capital,
            FiscalField::GlobalAllocations => r.asignaciones_globales,
            FiscalField::TotalExpenditure => r.total_egresos,
            FiscalField::FinancialAutonomy => r.autonomia_financiera,
            FiscalField::SurplusDeficit => r.superavit_deficit,
            FiscalField::CurrentExpenditure => r.gasto_corriente,
            FiscalField::AdjustedCurrentIncome => r.ingreso_corriente_ajustado,
        }
    }

    /// Zero-filled value: unreported columns count as 0.
    pub fn value(self, r: &MunicipalFiscalRecord) -> f64 {
        self.raw(r).unwrap_or(0.0)
    }

    /// Mutable access to the column, used when rebuilding a record from a
    /// row-oriented source (SQL rows, spreadsheet rows).
    pub fn slot(self, r: &mut MunicipalFiscalRecord) -> &mut Option<f64> {
        match self {
            FiscalField::Population => &mut r.population,
            FiscalField::Budget => &mut r.presupuesto_municipal,
            FiscalField::BudgetedExpenditure => &mut r.gastos_presupuestados,
            FiscalField::OwnIncome => &mut r.ingresos_propios,
            FiscalField::CollectedIncome => &mut r.ingresos_recaudados,
            FiscalField::TaxIncome => &mut r.ingresos_tributarios,
            FiscalField::CurrentIncome => &mut r.ingresos_corrientes,
            FiscalField::PropertyTax => &mut r.impuesto_bi,
            FiscalField::PersonalTax => &mut r.impuesto_personal,
            FiscalField::IndustryTax => &mut r.impuesto_industria,
            FiscalField::CommerceTax => &mut r.impuesto_comercio,
            FiscalField::ServicesTax => &mut r.impuesto_servicios,
            FiscalField::LivestockTax => &mut r.impuesto_pecuario,
            FiscalField::ExtractionTax => &mut r.impuesto_extraccion,
            FiscalField::TelecomTax => &mut r.impuesto_telecomunicaciones,
            FiscalField::ServiceFees => &mut r.tasas_servicios,
            FiscalField::Rights => &mut r.derechos,
            FiscalField::OtherNonTaxIncome => &mut r.ingresos_no_tributarios,
            FiscalField::CapitalIncome => &mut r.ingresos_capital,
            FiscalField::Loans => &mut r.prestamos,
            FiscalField::AssetSales => &mut r.venta_activos,
            FiscalField::Contributions => &mut r.contribuciones,
            FiscalField::BondProceeds => &mut r.colocacion_bonos,
            FiscalField::Art91Transfers => &mut r.transferencias_art91,
            FiscalField::OtherTransfers => &mut r.otras_transferencias,
            FiscalField::Subsidies => &mut r.subsidios,
            FiscalField::Legacies => &mut r.herencias_legados,
            FiscalField::OtherCapitalIncome => &mut r.otros_ingresos_capital,
            FiscalField::BalanceCarryForward => &mut r.recursos_balance,
            FiscalField::OperatingExpenditure => &mut r.gastos_funcionamiento,
            FiscalField::PersonnelServices => &mut r.servicios_personales,
            FiscalField::NonPersonnelServices => &mut r.servicios_no_personales,
            FiscalField::Materials => &mut r.materiales_suministro,
            FiscalField::CurrentTransfers => &mut r.transferencias_corrientes,
            FiscalField::OtherExpenses => &mut r.otros_gastos,
            FiscalField::CapitalDebtExpenditure => &mut r.gastos_capital_deuda,
            FiscalField::CapitalizableGoods => &mut r.bienes_capitalizables,
            FiscalField::CapitalTransfers => &mut r.transferencias_capital,
            FiscalField::FinancialAssets => &mut r.activos_financieros,
            FiscalField::DebtService => &mut r.servicios_deuda,
            FiscalField::OtherCapitalExpenses => &mut r.otros_gastos_capital,
            FiscalField::GlobalAllocations => &mut r.asignaciones_globales,
            FiscalField::TotalExpenditure => &mut r.total_egresos,
            FiscalField::FinancialAutonomy => &mut r.autonomia_financiera,
            FiscalField::SurplusDeficit => &mut r.superavit_deficit,
            FiscalField::CurrentExpenditure => &mut r.gasto_corriente,
            FiscalField::AdjustedCurrentIncome => &mut r.ingreso_corriente_ajustado,
        }
    }

    /// Looks up a column by its backend name. A few short aliases used on
    /// the command line ("budget", "income", "autonomy") are accepted too.
    pub fn from_column(name: &str) -> Option<FiscalField> {
        match name {
            "budget" => return Some(FiscalField::Budget),
            "income" => return Some(FiscalField::OwnIncome),
            "autonomy" | "financial_autonomy" => return Some(FiscalField::FinancialAutonomy),
            _ => {}
        }
        FiscalField::ALL.iter().copied().find(|f| f.column() == name)
    }
}

impl std::fmt::Display for FiscalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl std::str::FromStr for FiscalField {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FiscalField::from_column(s)
            .ok_or_else(|| FiscalError::ParseError(format!("unknown fiscal field '{}'", s)))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching, exporting or configuring fiscal data.
#[derive(Debug, PartialEq)]
pub enum FiscalError {
    /// Backend endpoint, key or connection string missing or invalid.
    Config(String),
    /// Non-2xx HTTP response from the backend.
    HttpError(u16),
    /// The request could not be sent or the body could not be read.
    Request(String),
    /// The response body or an input value could not be deserialized.
    ParseError(String),
    /// The direct database query failed.
    Database(String),
    /// A single-record lookup returned nothing.
    NotFound { name: String, year: i32 },
    /// Writing or reading an export file failed.
    Export(String),
}

impl std::fmt::Display for FiscalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiscalError::Config(msg) => write!(f, "Configuration error: {}", msg),
            FiscalError::HttpError(code) => write!(f, "HTTP error: {}", code),
            FiscalError::Request(msg) => write!(f, "Request failed: {}", msg),
            FiscalError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            FiscalError::Database(msg) => write!(f, "Database error: {}", msg),
            FiscalError::NotFound { name, year } => {
                write!(f, "Municipality not found: {} ({})", name, year)
            }
            FiscalError::Export(msg) => write!(f, "Export failed: {}", msg),
        }
    }
}

impl std::error::Error for FiscalError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for field in FiscalField::ALL {
            assert!(
                seen.insert(field.column()),
                "duplicate column name '{}' in FiscalField::ALL",
                field.column()
            );
        }
    }

    #[test]
    fn test_from_column_round_trips_every_field() {
        for field in FiscalField::ALL {
            assert_eq!(FiscalField::from_column(field.column()), Some(field));
        }
    }

    #[test]
    fn test_cli_aliases_resolve() {
        assert_eq!("budget".parse::<FiscalField>(), Ok(FiscalField::Budget));
        assert_eq!("income".parse::<FiscalField>(), Ok(FiscalField::OwnIncome));
        assert!("not_a_column".parse::<FiscalField>().is_err());
    }

    #[test]
    fn test_missing_value_is_zero_filled() {
        let record = MunicipalFiscalRecord::default();
        assert_eq!(FiscalField::Budget.raw(&record), None);
        assert_eq!(FiscalField::Budget.value(&record), 0.0);
    }

    #[test]
    fn test_slot_writes_through_to_the_named_column() {
        let mut record = MunicipalFiscalRecord::default();
        *FiscalField::DebtService.slot(&mut record) = Some(12.5);
        assert_eq!(record.servicios_deuda, Some(12.5));
        assert_eq!(FiscalField::DebtService.value(&record), 12.5);
    }

    #[test]
    fn test_record_deserializes_with_nulls_and_missing_columns() {
        let json = r#"{
            "id": "abc",
            "code": 101,
            "name": "La Ceiba",
            "department": "Atlántida",
            "year": 2024,
            "population": 210000,
            "presupuesto_municipal": null
        }"#;
        let record: MunicipalFiscalRecord =
            serde_json::from_str(json).expect("partial record should deserialize");
        assert_eq!(record.name.as_deref(), Some("La Ceiba"));
        assert_eq!(record.population, Some(210_000.0));
        assert_eq!(record.presupuesto_municipal, None);
        assert_eq!(record.total_egresos, None);
    }

    #[test]
    fn test_empty_department_is_treated_as_missing() {
        let record = MunicipalFiscalRecord {
            department: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(record.department_name(), None);
    }

    #[test]
    fn test_not_found_display_names_municipality_and_year() {
        let err = FiscalError::NotFound { name: "Yoro".to_string(), year: 2023 };
        assert_eq!(err.to_string(), "Municipality not found: Yoro (2023)");
    }
}
