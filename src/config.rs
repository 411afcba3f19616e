/// Service configuration.
///
/// Settings come from an optional TOML file, then environment variables
/// (loaded from `.env` via `dotenv`) override the backend credentials.
///
/// Example `munifisc.toml`:
///
/// ```toml
/// backend = "rest"
/// table = "municipalities"
/// default_years = [2021, 2022, 2023, 2024]
/// timeout_secs = 30
/// log_level = "info"
/// ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::{self, Component, LogLevel};
use crate::model::{DEFAULT_TABLE, FiscalError};

/// Environment variables holding the hosted backend endpoint. The first
/// one set wins.
pub const URL_VARS: [&str; 2] = ["SUPABASE_URL", "REACT_APP_SUPABASE_URL"];

/// Environment variables holding the backend access key.
pub const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "REACT_APP_SUPABASE_ANON_KEY"];

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Which data source to read fiscal records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted PostgREST endpoint.
    #[default]
    Rest,
    /// Direct Postgres connection.
    Postgres,
    /// Local JSON snapshot file.
    Snapshot,
}

impl std::str::FromStr for BackendKind {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rest" => Ok(BackendKind::Rest),
            "postgres" => Ok(BackendKind::Postgres),
            "snapshot" => Ok(BackendKind::Snapshot),
            other => Err(FiscalError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub table: String,
    pub default_years: Vec<i32>,
    pub timeout_secs: u64,
    pub log_level: String,
    pub log_file: Option<String>,
    pub console_timestamps: bool,
    pub snapshot_path: Option<PathBuf>,

    /// Hosted backend endpoint, from the environment.
    #[serde(skip)]
    pub backend_url: Option<String>,
    /// Hosted backend access key, from the environment.
    #[serde(skip)]
    pub backend_key: Option<String>,
    /// Postgres connection string, from the environment.
    #[serde(skip)]
    pub database_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Rest,
            table: DEFAULT_TABLE.to_string(),
            default_years: vec![2021, 2022, 2023, 2024],
            timeout_secs: 30,
            log_level: "info".to_string(),
            log_file: None,
            console_timestamps: false,
            snapshot_path: None,
            backend_url: None,
            backend_key: None,
            database_url: None,
        }
    }
}

impl AppConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, FiscalError> {
        toml::from_str(text).map_err(|e| FiscalError::Config(format!("invalid config: {}", e)))
    }

    /// Loads `path` if given (defaults otherwise), then overlays the
    /// environment, reading `.env` first if one exists.
    pub fn load(path: Option<&Path>) -> Result<Self, FiscalError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    FiscalError::Config(format!("cannot read {}: {}", p.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fills credentials from `lookup`. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|n| lookup(n))
                .find(|v| !v.is_empty())
        };
        if let Some(url) = first(&URL_VARS) {
            self.backend_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(key) = first(&KEY_VARS) {
            self.backend_key = Some(key);
        }
        if let Some(db) = first(&[DATABASE_URL_VAR]) {
            self.database_url = Some(db);
        }
    }

    /// The configured log level. An unrecognised name is a configuration
    /// error rather than a silent fallback.
    pub fn log_level(&self) -> Result<LogLevel, FiscalError> {
        self.log_level
            .parse()
            .map_err(|e: String| FiscalError::Config(format!("log_level: {}", e)))
    }

    /// Names of the settings the selected backend needs but lacks.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match self.backend {
            BackendKind::Rest => {
                if self.backend_url.is_none() {
                    missing.push(URL_VARS[0]);
                }
                if self.backend_key.is_none() {
                    missing.push(KEY_VARS[0]);
                }
            }
            BackendKind::Postgres => {
                if self.database_url.is_none() {
                    missing.push(DATABASE_URL_VAR);
                }
            }
            BackendKind::Snapshot => {
                if self.snapshot_path.is_none() {
                    missing.push("snapshot_path");
                }
            }
        }
        missing
    }

    /// Logs missing backend settings as an error. Startup continues; the
    /// first fetch then fails with a configuration error.
    pub fn report_missing(&self) {
        let missing = self.missing_settings();
        if !missing.is_empty() {
            logging::error(
                Component::System,
                None,
                &format!("Missing {} in environment or config file", missing.join(" and ")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.backend, BackendKind::Rest);
        assert_eq!(config.table, "municipalities");
        assert_eq!(config.default_years, vec![2021, 2022, 2023, 2024]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str("backend = \"postgres\"\ntimeout_secs = 5\n")
            .expect("valid toml");
        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.table, "municipalities");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("backend = [").expect_err("malformed toml");
        assert!(matches!(err, FiscalError::Config(_)));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(AppConfig::from_toml_str("backend = \"mysql\"").is_err());
    }

    #[test]
    fn test_env_overlay_accepts_prefixed_names() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("REACT_APP_SUPABASE_URL", "https://example.supabase.co/"),
            ("REACT_APP_SUPABASE_ANON_KEY", "anon"),
        ]));
        assert_eq!(config.backend_url.as_deref(), Some("https://example.supabase.co"));
        assert_eq!(config.backend_key.as_deref(), Some("anon"));
        assert!(config.missing_settings().is_empty());
    }

    #[test]
    fn test_unprefixed_name_wins() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("SUPABASE_URL", "https://primary"),
            ("REACT_APP_SUPABASE_URL", "https://fallback"),
        ]));
        assert_eq!(config.backend_url.as_deref(), Some("https://primary"));
    }

    #[test]
    fn test_missing_credentials_are_listed_not_fatal() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("SUPABASE_URL", "")]));
        assert_eq!(config.missing_settings(), vec!["SUPABASE_URL", "SUPABASE_ANON_KEY"]);
        config.report_missing();
    }

    #[test]
    fn test_postgres_backend_needs_database_url() {
        let config = AppConfig { backend: BackendKind::Postgres, ..Default::default() };
        assert_eq!(config.missing_settings(), vec!["DATABASE_URL"]);
    }

    #[test]
    fn test_log_level_parses_from_toml() {
        let config = AppConfig::from_toml_str("log_level = \"warning\"").expect("valid toml");
        assert_eq!(config.log_level(), Ok(LogLevel::Warning));
        assert_eq!(AppConfig::default().log_level(), Ok(LogLevel::Info));
    }

    #[test]
    fn test_unknown_log_level_is_config_error() {
        let config = AppConfig::from_toml_str("log_level = \"verbose\"").expect("valid toml");
        match config.log_level() {
            Err(FiscalError::Config(msg)) => assert!(msg.contains("verbose"), "message was: {}", msg),
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
