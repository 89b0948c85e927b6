//! Spreadsheet sources for the project list.
//!
//! A source returns every project row of one worksheet; it is read in full on
//! each sync. The first row of the worksheet is the header and columns are
//! located by header text, so column order in the sheet does not matter.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use super::model::{
    COL_CLIENT, COL_DESCRIPTION, COL_NAME, COL_STAGE, COL_TARGET_DATE, Project,
};
use crate::config::SheetsConfig;
use crate::error::SyncError;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Anything that can produce project rows.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Read all project rows.
    async fn fetch_rows(&self) -> Result<Vec<Project>, SyncError>;
}

/// Fixed in-memory rows.
#[derive(Debug, Clone, Default)]
pub struct StaticSheet {
    rows: Vec<Project>,
}

impl StaticSheet {
    pub fn new(rows: Vec<Project>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl SheetSource for StaticSheet {
    async fn fetch_rows(&self) -> Result<Vec<Project>, SyncError> {
        Ok(self.rows.clone())
    }
}

/// Google Sheets v4 `values.get` reader authenticated by API key.
pub struct GoogleSheetsSource {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
    api_key: SecretString,
}

/// Response body of `values.get`.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl GoogleSheetsSource {
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Point at a different API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn values_url(&self) -> Result<Url, SyncError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Request(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Request(format!("base url {} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.worksheet.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn fetch_rows(&self) -> Result<Vec<Project>, SyncError> {
        let url = self.values_url()?;
        debug!(worksheet = %self.worksheet, "Fetching worksheet");

        let body: ValueRange = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SyncError::Request(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| SyncError::Request(format!("invalid response body: {e}")))?;

        let projects = rows_from_values(&self.worksheet, &body.values)?;
        info!(worksheet = %self.worksheet, rows = projects.len(), "Worksheet read");
        Ok(projects)
    }
}

/// Map a header row plus data rows to projects. Missing trailing cells read
/// as empty; rows without a name are skipped.
pub fn rows_from_values(
    worksheet: &str,
    values: &[Vec<serde_json::Value>],
) -> Result<Vec<Project>, SyncError> {
    let Some((header, data)) = values.split_first() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| SyncError::MissingColumn {
                worksheet: worksheet.to_string(),
                column: name.to_string(),
            })
    };
    let name_idx = column(COL_NAME)?;
    let stage_idx = column(COL_STAGE)?;
    let target_idx = column(COL_TARGET_DATE)?;
    let desc_idx = column(COL_DESCRIPTION)?;
    let client_idx = column(COL_CLIENT)?;

    let projects = data
        .iter()
        .filter_map(|row| {
            let cell = |idx: usize| row.get(idx).map(cell_text).unwrap_or_default();
            let name = cell(name_idx);
            if name.is_empty() {
                return None;
            }
            Some(Project {
                name,
                stage: cell(stage_idx),
                target_date: cell(target_idx),
                description: cell(desc_idx),
                client: cell(client_idx),
            })
        })
        .collect();
    Ok(projects)
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
