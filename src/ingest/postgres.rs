/// Direct Postgres access to the fiscal table.
///
/// Same rows as the REST surface, read over a plain connection. Numeric
/// columns are cast to `float8` in the select list so every column maps to
/// `Option<f64>` whatever its declared SQL type.

use postgres::{Client, NoTls, Row};

use crate::config::AppConfig;
use crate::ingest::FiscalSource;
use crate::logging::{self, Component};
use crate::model::{FiscalError, FiscalField, MunicipalFiscalRecord};

/// Leading key columns, before the numeric ones.
const KEY_COLUMNS: &str = "id::text, code::bigint, name, department, year::int4";
const KEY_COUNT: usize = 5;

pub struct PgSource {
    client: Client,
    table: String,
}

impl PgSource {
    /// Connects using `DATABASE_URL`.
    pub fn from_config(config: &AppConfig) -> Result<Self, FiscalError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| FiscalError::Config("DATABASE_URL is not set".to_string()))?;
        validate_table_name(&config.table)?;

        let client = Client::connect(url, NoTls)
            .map_err(|e| FiscalError::Database(format!("connect failed: {}", e)))?;
        logging::debug(Component::Database, Some(&config.table), "Connected");

        Ok(Self {
            client,
            table: config.table.clone(),
        })
    }
}

/// The table name is interpolated into SQL, so only plain identifiers
/// (optionally schema-qualified) are accepted.
pub fn validate_table_name(table: &str) -> Result<(), FiscalError> {
    let valid = !table.is_empty()
        && table.split('.').all(|part| {
            !part.is_empty()
                && !part.starts_with(|c: char| c.is_ascii_digit())
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(FiscalError::Config(format!("invalid table name '{}'", table)))
    }
}

/// `SELECT` list covering the key columns and every numeric column.
pub fn select_list() -> String {
    let numeric: Vec<String> = FiscalField::ALL
        .iter()
        .map(|f| format!("{}::float8", f.column()))
        .collect();
    format!("{}, {}", KEY_COLUMNS, numeric.join(", "))
}

pub fn years_query(table: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE cardinality($1::int4[]) = 0 OR year::int4 = ANY($1) ORDER BY year, department, name",
        select_list(),
        table
    )
}

pub fn single_query(table: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE name = $1 AND year::int4 = $2 AND ($3::text IS NULL OR department = $3) LIMIT 1",
        select_list(),
        table
    )
}

fn db_error(e: postgres::Error) -> FiscalError {
    FiscalError::Database(e.to_string())
}

fn record_from_row(row: &Row) -> Result<MunicipalFiscalRecord, FiscalError> {
    let mut record = MunicipalFiscalRecord {
        id: row.try_get::<_, Option<String>>(0).map_err(db_error)?.unwrap_or_default(),
        code: row.try_get(1).map_err(db_error)?,
        name: row.try_get(2).map_err(db_error)?,
        department: row.try_get(3).map_err(db_error)?,
        year: row.try_get(4).map_err(db_error)?,
        ..Default::default()
    };
    for (offset, field) in FiscalField::ALL.iter().enumerate() {
        *field.slot(&mut record) = row.try_get(KEY_COUNT + offset).map_err(db_error)?;
    }
    Ok(record)
}

impl FiscalSource for PgSource {
    fn fetch_years(&mut self, years: &[i32]) -> Result<Vec<MunicipalFiscalRecord>, FiscalError> {
        let years = years.to_vec();
        let rows = self
            .client
            .query(years_query(&self.table).as_str(), &[&years])
            .map_err(db_error)?;
        rows.iter().map(record_from_row).collect()
    }

    fn fetch_one(
        &mut self,
        name: &str,
        year: i32,
        department: Option<&str>,
    ) -> Result<MunicipalFiscalRecord, FiscalError> {
        let row = self
            .client
            .query_opt(single_query(&self.table).as_str(), &[&name, &year, &department])
            .map_err(db_error)?
            .ok_or_else(|| FiscalError::NotFound { name: name.to_string(), year })?;
        record_from_row(&row)
    }

    fn component(&self) -> Component {
        Component::Database
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("municipalities").is_ok());
        assert!(validate_table_name("public.municipalities").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("municipalities; DROP TABLE x").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("public.").is_err());
    }

    #[test]
    fn test_select_list_covers_every_column_in_order() {
        let list = select_list();
        let parts: Vec<&str> = list.split(", ").collect();
        assert_eq!(parts.len(), KEY_COUNT + FiscalField::ALL.len());
        assert_eq!(parts[KEY_COUNT], "population::float8");
        assert_eq!(parts.last().copied(), Some("ingreso_corriente_ajustado::float8"));
    }

    #[test]
    fn test_queries_are_parameterized() {
        let q = years_query("municipalities");
        assert!(q.contains("FROM municipalities WHERE"));
        assert!(q.contains("ANY($1)"));
        let q = single_query("municipalities");
        assert!(q.contains("name = $1"));
        assert!(q.ends_with("LIMIT 1"));
    }

    #[test]
    fn test_from_config_requires_database_url() {
        let config = AppConfig::default();
        assert!(matches!(PgSource::from_config(&config), Err(FiscalError::Config(_))));
    }
}
