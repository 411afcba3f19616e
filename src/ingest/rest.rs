/// Hosted backend client (PostgREST).
///
/// Reads fiscal records from the hosted backend's REST surface. Both
/// queries are plain GETs against `/rest/v1/<table>` with PostgREST filter
/// syntax; the anon key is sent as `apikey` and as a bearer token.
///
/// API Documentation: https://postgrest.org/en/stable/references/api/tables_views.html

use std::time::Duration;

use reqwest::Url;

use crate::config::AppConfig;
use crate::ingest::FiscalSource;
use crate::logging::Component;
use crate::model::{FiscalError, MunicipalFiscalRecord};

const REST_PATH: &str = "rest/v1";

// ============================================================================
// URL construction
// ============================================================================

/// Builds the multi-year query URL:
/// `<base>/rest/v1/<table>?select=*&year=in.(2023,2024)`.
///
/// No year filter is added for an empty selection.
pub fn build_select_url(base_url: &str, table: &str, years: &[i32]) -> Result<Url, FiscalError> {
    let mut url = table_url(base_url, table)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("select", "*");
        if !years.is_empty() {
            let list = years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(",");
            query.append_pair("year", &format!("in.({})", list));
        }
    }
    Ok(url)
}

/// Builds the single-record query URL, filtering on name, year and,
/// when given, department, limited to one row.
pub fn build_single_url(
    base_url: &str,
    table: &str,
    name: &str,
    year: i32,
    department: Option<&str>,
) -> Result<Url, FiscalError> {
    let mut url = table_url(base_url, table)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("select", "*");
        query.append_pair("name", &format!("eq.{}", name));
        query.append_pair("year", &format!("eq.{}", year));
        if let Some(dept) = department {
            query.append_pair("department", &format!("eq.{}", dept));
        }
        query.append_pair("limit", "1");
    }
    Ok(url)
}

fn table_url(base_url: &str, table: &str) -> Result<Url, FiscalError> {
    let base = format!("{}/{}/{}", base_url.trim_end_matches('/'), REST_PATH, table);
    Url::parse(&base).map_err(|e| FiscalError::Config(format!("invalid backend URL '{}': {}", base_url, e)))
}

/// Parses a PostgREST JSON array body.
pub fn parse_records(body: &str) -> Result<Vec<MunicipalFiscalRecord>, FiscalError> {
    serde_json::from_str(body).map_err(|e| FiscalError::ParseError(e.to_string()))
}

// ============================================================================
// Client
// ============================================================================

pub struct RestSource {
    client: reqwest::blocking::Client,
    base_url: String,
    key: String,
    table: String,
}

impl RestSource {
    pub fn new(base_url: &str, key: &str, table: &str, timeout: Duration) -> Result<Self, FiscalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FiscalError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            key: key.to_string(),
            table: table.to_string(),
        })
    }

    /// Builds a client from configuration. Fails when the endpoint or key
    /// was not provided.
    pub fn from_config(config: &AppConfig) -> Result<Self, FiscalError> {
        let url = config
            .backend_url
            .as_deref()
            .ok_or_else(|| FiscalError::Config("backend URL is not set".to_string()))?;
        let key = config
            .backend_key
            .as_deref()
            .ok_or_else(|| FiscalError::Config("backend key is not set".to_string()))?;
        Self::new(url, key, &config.table, Duration::from_secs(config.timeout_secs))
    }

    fn get(&self, url: Url) -> Result<Vec<MunicipalFiscalRecord>, FiscalError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FiscalError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FiscalError::HttpError(response.status().as_u16()));
        }

        let body = response.text().map_err(|e| FiscalError::Request(e.to_string()))?;
        parse_records(&body)
    }
}

impl FiscalSource for RestSource {
    fn fetch_years(&mut self, years: &[i32]) -> Result<Vec<MunicipalFiscalRecord>, FiscalError> {
        let url = build_select_url(&self.base_url, &self.table, years)?;
        self.get(url)
    }

    fn fetch_one(
        &mut self,
        name: &str,
        year: i32,
        department: Option<&str>,
    ) -> Result<MunicipalFiscalRecord, FiscalError> {
        let url = build_single_url(&self.base_url, &self.table, name, year, department)?;
        self.get(url)?
            .into_iter()
            .next()
            .ok_or_else(|| FiscalError::NotFound { name: name.to_string(), year })
    }

    fn component(&self) -> Component {
        Component::Backend
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.supabase.co";

    #[test]
    fn test_select_url_filters_years() {
        let url = build_select_url(BASE, "municipalities", &[2023, 2024]).expect("valid url");
        assert_eq!(url.path(), "/rest/v1/municipalities");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("year".to_string(), "in.(2023,2024)".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_url_without_years_has_no_filter() {
        let url = build_select_url(BASE, "municipalities", &[]).expect("valid url");
        assert!(url.query_pairs().all(|(k, _)| k != "year"));
    }

    #[test]
    fn test_trailing_slash_in_base_is_ignored() {
        let url = build_select_url("https://example.supabase.co/", "municipalities", &[2024])
            .expect("valid url");
        assert_eq!(url.path(), "/rest/v1/municipalities");
    }

    #[test]
    fn test_single_url_encodes_name_and_department() {
        let url = build_single_url(BASE, "municipalities", "San Pedro Sula", 2024, Some("Cortés"))
            .expect("valid url");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("name".to_string(), "eq.San Pedro Sula".to_string())));
        assert!(pairs.contains(&("department".to_string(), "eq.Cortés".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "1".to_string())));
        assert!(!url.as_str().contains(' '), "spaces must be percent-encoded: {}", url);
    }

    #[test]
    fn test_single_url_without_department() {
        let url = build_single_url(BASE, "municipalities", "Yoro", 2023, None).expect("valid url");
        assert!(url.query_pairs().all(|(k, _)| k != "department"));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = build_select_url("not a url", "municipalities", &[]).expect_err("invalid");
        assert!(matches!(err, FiscalError::Config(_)));
    }

    #[test]
    fn test_parse_records() {
        let body = r#"[
            {"id": "a", "name": "Yoro", "department": "Yoro", "year": 2024, "presupuesto_municipal": 1000.5},
            {"id": "b", "name": "Olanchito", "department": "Yoro", "year": 2024, "presupuesto_municipal": null}
        ]"#;
        let records = parse_records(body).expect("valid body");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].presupuesto_municipal, Some(1000.5));
        assert_eq!(records[1].presupuesto_municipal, None);
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_records(r#"{"message": "permission denied"}"#).expect_err("object, not array");
        assert!(matches!(err, FiscalError::ParseError(_)));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = AppConfig::default();
        assert!(matches!(RestSource::from_config(&config), Err(FiscalError::Config(_))));
    }
}
