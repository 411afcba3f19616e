use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use munifisc_service::alert::thresholds::{FiscalStatus, check_fiscal_health};
use munifisc_service::analysis::budget::{BudgetHistory, budget_history};
use munifisc_service::analysis::compare::{
    ComparisonMetric, MunicipalitySelection, comparison_series, comparison_table,
};
use munifisc_service::analysis::groupings::{department_details, department_totals, municipalities_in};
use munifisc_service::analysis::kpis::{DashboardKpis, dashboard_kpis};
use munifisc_service::analysis::metrics::{
    department_autonomy, filter_by_department, lowest_by_status, municipality_metrics, status_counts,
};
use munifisc_service::analysis::ranking::{
    NamedValue, SortDirection, correlation_pairs, distribution, ranked_values,
};
use munifisc_service::analysis::{latest_year, records_for_year};
use munifisc_service::config::{AppConfig, BackendKind};
use munifisc_service::departments::{DEPARTMENT_REGISTRY, total_municipalities};
use munifisc_service::detail::build_fiscal_detail;
use munifisc_service::export::report::{Kpi, Report, ReportSection, Table};
use munifisc_service::export::spreadsheet;
use munifisc_service::format::{format_millions, format_number, format_percent};
use munifisc_service::ingest::{self, MultiYearLoader, snapshot};
use munifisc_service::logging::{self, Component};
use munifisc_service::model::{FiscalError, FiscalField, MunicipalFiscalRecord};
use munifisc_service::verify::{VerificationStatus, verify_coverage};

/// Rows shown in ranking tables unless `--top` says otherwise.
const DEFAULT_TOP: usize = 15;
/// Rows in the critical and warning tables.
const STATUS_TABLE_ROWS: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "munifisc", about = "Honduran municipal finance analytics")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured backend (rest, postgres, snapshot).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Snapshot file to read, implies `--backend snapshot`.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Fiscal years to load, comma separated. Defaults to the configured years.
    #[arg(long, global = true, value_delimiter = ',')]
    years: Vec<i32>,

    /// Emit JSON instead of tables where supported.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Headline figures for one year.
    Kpis {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Municipalities ranked by a numeric column.
    Rank {
        /// Column name, or one of: budget, income, autonomy.
        #[arg(long, default_value = "budget")]
        field: String,
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
        #[arg(long)]
        ascending: bool,
        /// Only municipalities with a positive value.
        #[arg(long)]
        positive: bool,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        department: Option<String>,
    },
    /// Per-department totals and averages.
    Departments {
        #[arg(long, default_value = "budget")]
        field: String,
        #[arg(long)]
        year: Option<i32>,
        /// Print the department registry instead.
        #[arg(long)]
        registry: bool,
    },
    /// Municipality names, optionally within one department.
    Municipalities {
        #[arg(long)]
        department: Option<String>,
    },
    /// Autonomy, trend and health status per municipality.
    Analytics {
        #[arg(long)]
        department: Option<String>,
    },
    /// Health alerts for every municipality that is not healthy.
    Alerts {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Population versus budget pairs.
    Correlation {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Full fiscal breakdown of one municipality.
    Detail {
        name: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        department: Option<String>,
    },
    /// Budget, expenditure and income of one municipality across years.
    Budget {
        /// Municipality name, or `name@department`.
        municipality: MunicipalitySelection,
    },
    /// One metric across years for several municipalities.
    Compare {
        /// Municipality names, comma separated. `name@department` picks one
        /// of several municipalities sharing a name.
        #[arg(long, value_delimiter = ',', required = true)]
        names: Vec<MunicipalitySelection>,
        #[arg(long, default_value = "budget")]
        metric: String,
    },
    /// Coverage of a year's data against the department registry.
    Verify {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Write records, a ranking, metrics, a report or a workbook.
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "budget")]
        field: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Save the loaded records as a JSON snapshot.
    Snapshot {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportKind {
    /// Every loaded record, every column (CSV).
    Records,
    /// Top municipalities by `--field` (CSV).
    Ranking,
    /// Per-municipality autonomy metrics (CSV).
    Metrics,
    /// Multi-section analytics report (text).
    Report,
    /// The analytics report's tables, one CSV per table in the `--out`
    /// directory.
    Workbook,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.snapshot {
        config.backend = BackendKind::Snapshot;
        config.snapshot_path = Some(path.clone());
    }
    if let Some(backend) = &cli.backend {
        config.backend = backend.parse()?;
    }

    let level = config.log_level()?;
    logging::init_logger(level, config.log_file.as_deref(), config.console_timestamps);
    config.report_missing();

    if let Command::Departments { registry: true, .. } = cli.command {
        print_registry();
        return Ok(());
    }

    let years = if cli.years.is_empty() { config.default_years.clone() } else { cli.years.clone() };
    let mut loader = MultiYearLoader::new(ingest::open_source(&config)?);

    match cli.command {
        Command::Kpis { year } => {
            let records = loader.load(&years)?;
            let year = pick_year(records, year)?;
            let kpis = dashboard_kpis(records_for_year(records, year));
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&kpis)?);
            } else {
                print_kpis(year, &kpis);
            }
        }
        Command::Rank { field, top, ascending, positive, year, department } => {
            let field: FiscalField = field.parse()?;
            let records = loader.load(&years)?;
            let year = pick_year(records, year)?;
            let rows: Vec<MunicipalFiscalRecord> = records_for_year(records, year)
                .into_iter()
                .filter(|r| department.is_none() || r.department_name() == department.as_deref())
                .cloned()
                .collect();
            let ranked = ranking_rows(&rows, field, top, ascending, positive);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                println!("Top {} by {} ({})", ranked.len(), field, year);
                for (i, row) in ranked.iter().enumerate() {
                    println!(
                        "{:>3}. {:<32} {:<20} {}",
                        i + 1,
                        row.name,
                        row.department.as_deref().unwrap_or("-"),
                        format_field(field, row.value)
                    );
                }
            }
        }
        Command::Departments { field, year, .. } => {
            let field: FiscalField = field.parse()?;
            let records = loader.load(&years)?;
            let year = pick_year(records, year)?;
            let rows: Vec<MunicipalFiscalRecord> =
                records_for_year(records, year).into_iter().cloned().collect();
            let totals = department_totals(&rows, field);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&department_details(&rows))?);
            } else {
                println!("{} by department ({})", field, year);
                for total in &totals {
                    println!(
                        "  {:<20} {:>4} municipalities  {}",
                        total.department,
                        total.municipalities,
                        format_field(field, total.value)
                    );
                }
            }
        }
        Command::Municipalities { department } => {
            let records = loader.load(&years)?;
            let list = municipalities_in(records, department.as_deref());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for m in &list {
                    println!("{:<32} {}", m.name, m.department.as_deref().unwrap_or("-"));
                }
            }
        }
        Command::Analytics { department } => {
            let records = loader.load(&years)?;
            let report = analytics_report(records, department.as_deref());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
        Command::Alerts { year } => {
            let records = loader.load(&years)?;
            let year = pick_year(records, year)?;
            let mut alerts: Vec<_> = records_for_year(records, year)
                .into_iter()
                .filter_map(check_fiscal_health)
                .collect();
            alerts.sort_by(|a, b| b.status.cmp(&a.status));
            for alert in &alerts {
                println!("[{}] {}", alert.status, alert.message);
            }
            logging::info(Component::Analysis, None, &format!("{} alerts for {}", alerts.len(), year));
        }
        Command::Correlation { year } => {
            let records = loader.load(&years)?;
            let year = pick_year(records, year)?;
            let rows: Vec<MunicipalFiscalRecord> =
                records_for_year(records, year).into_iter().cloned().collect();
            let pairs = correlation_pairs(&rows);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&pairs)?);
            } else {
                for p in &pairs {
                    println!("{:<32} {:>12} {}", p.name, format_number(p.x, 0), format_millions(p.y));
                }
            }
        }
        Command::Detail { name, year, department } => {
            let record = loader.load_one(&name, year, department.as_deref())?;
            let detail = build_fiscal_detail(&record);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                println!("{} ({}), {}", detail.municipality, detail.department, detail.year);
                for section in detail.sections() {
                    println!("\n{}  [{}]", section.title, format_number(section.total, 2));
                    for item in &section.items {
                        let share = item.percentage.map(format_percent).unwrap_or_default();
                        println!("  {:<32} {:>20} {:>8}", item.label, format_number(item.amount, 2), share);
                    }
                }
            }
        }
        Command::Budget { municipality } => {
            let records = loader.load(&years)?;
            let history = budget_history(records, &municipality, &years);
            if history.years.is_empty() {
                return Err(FiscalError::NotFound {
                    name: municipality.label(),
                    year: years.iter().copied().max().unwrap_or_default(),
                }
                .into());
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                print!("{}", budget_report(&history).render());
            }
        }
        Command::Compare { names, metric } => {
            let metric: ComparisonMetric = metric.parse()?;
            let records = loader.load(&years)?;
            if cli.json {
                let series = comparison_series(records, &names, &years, metric);
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                let table = comparison_table(records, &names, &years, metric);
                let mut columns = vec!["Municipality".to_string()];
                columns.extend(years.iter().map(|y| y.to_string()));
                let mut out = Table { columns, rows: Vec::new() };
                for row in table {
                    let mut cells = vec![Some(row.municipality)];
                    cells.extend(row.cells.into_iter().map(|(_, cell)| cell));
                    out.push_row(cells);
                }
                let mut report = Report::new(metric.label());
                report.push(ReportSection::new("Comparison").with_table(out));
                print!("{}", report.render());
            }
        }
        Command::Verify { year } => {
            let records = loader.load(&years)?;
            let year = pick_year(records, year)?;
            let report = verify_coverage(records, year);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Coverage {}: {}/{} municipalities, {:.1}% of value cells unreported",
                    year,
                    report.summary.reported_municipalities,
                    report.summary.expected_municipalities,
                    report.summary.null_ratio * 100.0
                );
                for dept in &report.departments {
                    let mark = match dept.status {
                        VerificationStatus::Success => "ok",
                        VerificationStatus::PartialSuccess => "partial",
                        VerificationStatus::Failed => "missing",
                    };
                    println!("  {:<20} {:>3}/{:<3} {}", dept.name, dept.reported, dept.expected, mark);
                }
                for name in &report.unknown_departments {
                    println!("  unknown department: {}", name);
                }
                for key in &report.duplicates {
                    println!("  duplicate: {}", key);
                }
            }
        }
        Command::Export { kind, out, field, year } => {
            let records = loader.load(&years)?;
            export(records, kind, &out, &field, year)?;
        }
        Command::Snapshot { out } => {
            let records = loader.load(&years)?;
            snapshot::write_snapshot(&out, records)?;
        }
    }
    Ok(())
}

/// `requested` if given, otherwise the latest year present.
fn pick_year(records: &[MunicipalFiscalRecord], requested: Option<i32>) -> Result<i32, FiscalError> {
    requested
        .or_else(|| latest_year(records))
        .ok_or_else(|| FiscalError::Config("no records loaded for the selected years".to_string()))
}

fn ranking_rows(
    rows: &[MunicipalFiscalRecord],
    field: FiscalField,
    top: usize,
    ascending: bool,
    positive: bool,
) -> Vec<NamedValue> {
    match (ascending, positive) {
        (false, true) => distribution(rows, field, top),
        (false, false) => ranked_values(rows, field, SortDirection::Descending, false, top),
        (true, _) => ranked_values(rows, field, SortDirection::Ascending, positive, top),
    }
}

fn format_field(field: FiscalField, value: f64) -> String {
    match field {
        FiscalField::Population => format_number(value, 0),
        FiscalField::FinancialAutonomy => format_percent(value),
        _ => format_millions(value),
    }
}

fn print_kpis(year: i32, kpis: &DashboardKpis) {
    println!("Fiscal year {}", year);
    println!("  Municipalities:      {}", kpis.municipalities);
    println!("  Total population:    {}", format_number(kpis.total_population, 0));
    println!("  Average population:  {}", format_number(kpis.average_population, 0));
    println!("  Total budget:        {}", format_millions(kpis.total_budget));
    println!("  Total own income:    {}", format_millions(kpis.total_income));
    println!("  Average autonomy:    {}", format_percent(kpis.average_autonomy));
}

fn print_registry() {
    for dept in DEPARTMENT_REGISTRY {
        println!("{}  {:<20} {:<22} {:>3}", dept.code, dept.name, dept.capital, dept.municipalities);
    }
    println!("{} departments, {} municipalities", DEPARTMENT_REGISTRY.len(), total_municipalities());
}

/// The analytics view as a report: summary KPIs, department averages, and
/// the lowest-autonomy critical and warning municipalities.
fn analytics_report(records: &[MunicipalFiscalRecord], department: Option<&str>) -> Report {
    let all = municipality_metrics(records);
    let metrics: Vec<_> = filter_by_department(&all, department).into_iter().cloned().collect();
    let summary = status_counts(&metrics);

    let title = match department {
        Some(d) => format!("Fiscal Analytics: {}", d),
        None => "Fiscal Analytics".to_string(),
    };
    let mut report = Report::new(&title);

    report.push(ReportSection::new("Summary").with_kpis(vec![
        Kpi::new("Municipalities", summary.total),
        Kpi::new("Average autonomy", format_percent(summary.average_autonomy)),
        Kpi::new("Critical", summary.critical),
        Kpi::new("Warning", summary.warning),
        Kpi::new("Healthy", summary.healthy),
    ]));

    let mut by_department = Table::new(&["Department", "Average autonomy", "Below 10%", "Municipalities"]);
    for d in department_autonomy(&metrics) {
        by_department.push_row(vec![
            Some(d.department),
            Some(format_percent(d.average_autonomy)),
            Some(d.below_critical.to_string()),
            Some(d.municipalities.to_string()),
        ]);
    }
    report.push(ReportSection::new("Autonomy by department").with_table(by_department));

    for (heading, status) in [
        ("Critical municipalities", FiscalStatus::Critical),
        ("Warning municipalities", FiscalStatus::Warning),
    ] {
        let mut table = Table::new(&["Municipality", "Department", "Year", "Autonomy", "Trend"]);
        for m in lowest_by_status(&metrics, status, STATUS_TABLE_ROWS) {
            table.push_row(vec![
                Some(m.name.clone()),
                m.department.clone(),
                Some(m.latest_year.to_string()),
                Some(format_percent(m.autonomy)),
                m.autonomy_trend.map(|t| format!("{:+.1}", t)),
            ]);
        }
        report.push(ReportSection::new(heading).with_table(table));
    }
    report
}

/// The budget history as a report: headline cards, per-year budget and
/// income tables, and the tax breakdown over the window.
fn budget_report(history: &BudgetHistory) -> Report {
    let title = match &history.department {
        Some(d) => format!("Budget: {} ({})", history.municipality, d),
        None => format!("Budget: {}", history.municipality),
    };
    let mut report = Report::new(&title);

    if let Some(h) = &history.headline {
        report.push(ReportSection::new(&format!("Fiscal year {}", h.year)).with_kpis(vec![
            Kpi::new("Budget", format_millions(h.budget)),
            Kpi::new("Autonomy", format!("{:.2}%", h.autonomy)),
            Kpi::new("Surplus/deficit", format_millions(h.surplus_deficit)),
            Kpi::new("Population", format_number(h.population, 0)),
        ]));
    }

    let mut general = Table::new(&["Year", "Budget", "Expenditure", "Surplus/deficit"]);
    let mut income = Table::new(&["Year", "Own (M)", "Current (M)", "Collected (M)"]);
    let mut spending = Table::new(&["Year", "Operating", "Personnel (M)", "Non-personnel (M)", "Capital income", "Capital/debt"]);
    for y in &history.years {
        general.push_row(vec![
            Some(y.year.to_string()),
            Some(format_millions(y.budget)),
            Some(format_millions(y.expenditure)),
            Some(format_millions(y.surplus_deficit)),
        ]);
        income.push_row(vec![
            Some(y.year.to_string()),
            Some(format_number(y.own_income_m, 0)),
            Some(format_number(y.current_income_m, 0)),
            Some(format_number(y.collected_income_m, 0)),
        ]);
        spending.push_row(vec![
            Some(y.year.to_string()),
            Some(format_millions(y.operating_expenditure)),
            Some(format_number(y.personnel_m, 0)),
            Some(format_number(y.non_personnel_m, 0)),
            Some(format_millions(y.capital_income)),
            Some(format_millions(y.capital_debt_expenditure)),
        ]);
    }
    report.push(ReportSection::new("General").with_table(general));
    report.push(ReportSection::new("Income").with_table(income));
    report.push(ReportSection::new("Expenditure").with_table(spending));

    let mut taxes = Table::new(&["Tax", "Amount"]);
    for t in &history.taxes {
        taxes.push_row(vec![Some(t.category.to_string()), Some(format_millions(t.amount))]);
    }
    report.push(ReportSection::new("Taxes over the selected years").with_table(taxes));
    report
}

fn export(
    records: &[MunicipalFiscalRecord],
    kind: ExportKind,
    out: &Path,
    field: &str,
    year: Option<i32>,
) -> Result<(), FiscalError> {
    match kind {
        ExportKind::Records => {
            spreadsheet::write_records(out, records)?;
        }
        ExportKind::Ranking => {
            let field: FiscalField = field.parse()?;
            let year = pick_year(records, year)?;
            let rows: Vec<MunicipalFiscalRecord> =
                records_for_year(records, year).into_iter().cloned().collect();
            spreadsheet::write_rows(out, &ranking_rows(&rows, field, DEFAULT_TOP, false, false))?;
        }
        ExportKind::Metrics => {
            spreadsheet::write_rows(out, &municipality_metrics(records))?;
        }
        ExportKind::Report => {
            analytics_report(records, None).write_to(out)?;
        }
        ExportKind::Workbook => {
            let report = analytics_report(records, None);
            let sheets: Vec<(&str, &Table)> = report
                .sections
                .iter()
                .filter_map(|s| s.table.as_ref().map(|t| (s.heading.as_str(), t)))
                .collect();
            spreadsheet::write_workbook(out, &sheets)?;
        }
    }
    Ok(())
}
