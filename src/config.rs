//! Configuration types.
//!
//! Everything is read from `TASKHUB_*` environment variables with defaults
//! that match the rbsgo.com deployment. `from_lookup` takes the variable
//! source as a closure so tests never have to touch the process environment.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::tasks::parser::NameMatching;
use crate::tasks::service::MAX_ACTIVITY_WINDOW;

pub const DEFAULT_COMPANY_DOMAIN: &str = "@rbsgo.com";
pub const DEFAULT_ADMIN_EMAIL: &str = "msk@rbsgo.com";
pub const DEFAULT_TEAM: &[&str] = &[
    "msk@rbsgo.com",
    "praveen@rbsgo.com",
    "arjun@rbsgo.com",
    "prasanna@rbsgo.com",
    "chris@rbsgo.com",
    "sarah@rbsgo.com",
];
pub const DEFAULT_WORKSHEET: &str = "ROADMAP";

/// Where the task database lives.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    /// Local SQLite file (created on first open).
    Local(PathBuf),
    /// Hosted libSQL database.
    Remote { url: String, auth_token: SecretString },
}

/// Google Sheets source for the project list.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub api_key: SecretString,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    pub database: DatabaseConfig,
    /// Required suffix for every login identity, e.g. `@rbsgo.com`.
    pub company_domain: String,
    /// The single identity with elevated scope.
    pub admin_email: String,
    /// Team roster in parser scan order.
    pub team: Vec<String>,
    pub name_matching: NameMatching,
    /// How many activity entries the feed returns by default.
    pub activity_window: usize,
    /// Spreadsheet import, disabled when no spreadsheet id is set.
    pub sheets: Option<SheetsConfig>,
    /// Directory for daily-rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database: DatabaseConfig::Local(PathBuf::from("./data/taskhub.db")),
            company_domain: DEFAULT_COMPANY_DOMAIN.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            team: DEFAULT_TEAM.iter().map(|s| s.to_string()).collect(),
            name_matching: NameMatching::Substring,
            activity_window: 20,
            sheets: None,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("TASKHUB_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "TASKHUB_PORT".into(),
                message: format!("'{raw}' is not a port number"),
            })?,
            None => defaults.port,
        };

        let database = match get("TASKHUB_DB_URL") {
            Some(url) => {
                let token = get("TASKHUB_DB_TOKEN")
                    .ok_or_else(|| ConfigError::MissingEnvVar("TASKHUB_DB_TOKEN".into()))?;
                DatabaseConfig::Remote {
                    url,
                    auth_token: SecretString::from(token),
                }
            }
            None => get("TASKHUB_DB_PATH")
                .map(|p| DatabaseConfig::Local(PathBuf::from(p)))
                .unwrap_or(defaults.database),
        };

        let company_domain = get("TASKHUB_COMPANY_DOMAIN")
            .map(|d| normalize_domain(&d))
            .unwrap_or(defaults.company_domain);

        let admin_email = get("TASKHUB_ADMIN_EMAIL")
            .map(|e| e.to_lowercase())
            .unwrap_or(defaults.admin_email);
        if !admin_email.ends_with(&company_domain) {
            return Err(ConfigError::InvalidValue {
                key: "TASKHUB_ADMIN_EMAIL".into(),
                message: format!("{admin_email} is outside {company_domain}"),
            });
        }

        let team: Vec<String> = match get("TASKHUB_TEAM") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.team,
        };

        let name_matching = match get("TASKHUB_NAME_MATCHING") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "TASKHUB_NAME_MATCHING".into(),
                message,
            })?,
            None => defaults.name_matching,
        };

        let activity_window = match get("TASKHUB_ACTIVITY_WINDOW") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_ACTIVITY_WINDOW).contains(n))
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "TASKHUB_ACTIVITY_WINDOW".into(),
                    message: format!("'{raw}' is not between 1 and {MAX_ACTIVITY_WINDOW}"),
                })?,
            None => defaults.activity_window,
        };

        let sheets = match get("TASKHUB_SHEETS_ID") {
            Some(spreadsheet_id) => {
                let api_key = get("TASKHUB_SHEETS_API_KEY")
                    .ok_or_else(|| ConfigError::MissingEnvVar("TASKHUB_SHEETS_API_KEY".into()))?;
                Some(SheetsConfig {
                    spreadsheet_id,
                    worksheet: get("TASKHUB_SHEETS_WORKSHEET")
                        .unwrap_or_else(|| DEFAULT_WORKSHEET.to_string()),
                    api_key: SecretString::from(api_key),
                })
            }
            None => None,
        };

        Ok(Self {
            port,
            database,
            company_domain,
            admin_email,
            team,
            name_matching,
            activity_window,
            sheets,
            log_dir: get("TASKHUB_LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Accept `rbsgo.com` as well as `@rbsgo.com`.
fn normalize_domain(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.starts_with('@') {
        lower
    } else {
        format!("@{lower}")
    }
}
