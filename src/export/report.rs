//! Multi-section text reports.
//!
//! A report is a title, a generation timestamp and a list of sections,
//! each with an optional row of KPIs and an optional table. It is rendered
//! as plain text: the title centred over a rule, the date line, then each
//! section in order. Missing table cells print as `-`.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::export::MISSING_CELL;
use crate::logging::{self, Component};
use crate::model::FiscalError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
}

impl Kpi {
    pub fn new(label: &str, value: impl ToString) -> Self {
        Self { label: label.to_string(), value: value.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Short rows are padded with missing cells.
    pub fn push_row(&mut self, mut cells: Vec<Option<String>>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    fn render(&self, out: &mut String) {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| cell_text(row.get(i)).chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: Vec<&str>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| pad(c, *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        out.push_str(&line(self.columns.iter().map(String::as_str).collect()));
        out.push('\n');
        out.push_str(
            &widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"),
        );
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<&str> = (0..self.columns.len()).map(|i| cell_text(row.get(i))).collect();
            out.push_str(&line(cells));
            out.push('\n');
        }
    }
}

fn cell_text(cell: Option<&Option<String>>) -> &str {
    match cell {
        Some(Some(text)) if !text.is_empty() => text.as_str(),
        _ => MISSING_CELL,
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub heading: String,
    pub kpis: Vec<Kpi>,
    pub table: Option<Table>,
}

impl ReportSection {
    pub fn new(heading: &str) -> Self {
        Self { heading: heading.to_string(), kpis: Vec::new(), table: None }
    }

    pub fn with_kpis(mut self, kpis: Vec<Kpi>) -> Self {
        self.kpis = kpis;
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str) -> Self {
        Self::generated(title, Utc::now())
    }

    pub fn generated(title: &str, generated_at: DateTime<Utc>) -> Self {
        Self { title: title.to_string(), generated_at, sections: Vec::new() }
    }

    pub fn push(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> String {
        let date_line = format!("Generated: {}", self.generated_at.format("%Y-%m-%d"));
        let width = self.title.chars().count().max(date_line.chars().count());

        let mut out = String::new();
        out.push_str(&center(&self.title, width));
        out.push('\n');
        out.push_str(&"=".repeat(width));
        out.push('\n');
        out.push_str(&center(&date_line, width));
        out.push('\n');

        for section in &self.sections {
            out.push('\n');
            out.push_str(&section.heading);
            out.push('\n');
            out.push_str(&"-".repeat(section.heading.chars().count()));
            out.push('\n');

            for kpi in &section.kpis {
                out.push_str(&format!("  {}: {}\n", kpi.label, kpi.value));
            }
            if let Some(table) = &section.table {
                if !section.kpis.is_empty() {
                    out.push('\n');
                }
                table.render(&mut out);
            }
        }
        out
    }

    /// Renders the report to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), FiscalError> {
        fs::write(path, self.render())
            .map_err(|e| FiscalError::Export(format!("{}: {}", path.display(), e)))?;
        logging::info(
            Component::Export,
            path.to_str(),
            &format!("Wrote report '{}' ({} sections)", self.title, self.sections.len()),
        );
        Ok(())
    }
}

fn center(text: &str, width: usize) -> String {
    let left = width.saturating_sub(text.chars().count()) / 2;
    format!("{}{}", " ".repeat(left), text).trim_end().to_string()
}
