/// File exports.
///
/// - `spreadsheet` — CSV tables: full records, or any serializable rows.
/// - `report`      — multi-section text report with KPIs and tables.

pub mod report;
pub mod spreadsheet;

/// Placeholder printed for a missing table cell.
pub const MISSING_CELL: &str = "-";
