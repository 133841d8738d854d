//! Sheets v4 `spreadsheets.values` HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! All writes use `valueInputOption=RAW`: cells hold exactly the text written,
//! so a code like `0012` or a date like `02/02/2026` reads back unchanged on
//! the next pass instead of as a parsed number or locale-formatted date.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::credentials::SheetsCredentials;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

const VALUE_INPUT_OPTION: &str = "RAW";

/// Sheets values API client (blocking), bound to one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
    spreadsheet_id: String,
}

#[derive(Debug, Error)]
pub enum SheetsError {
    /// No token in the configured environment variable
    #[error("not authenticated: set {0} to a Sheets access token")]
    NotAuthenticated(String),
    #[error("network error: {0}")]
    Network(String),
    /// HTTP error with status code and the API's message
    #[error("HTTP {0}: {1}")]
    Http(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid API base URL: {0}")]
    Url(String),
}

/// One range and its rows, as sent to `values:batchUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: u64,
}

impl SheetsClient {
    pub fn new(creds: SheetsCredentials, spreadsheet_id: impl Into<String>) -> Result<Self, SheetsError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("sheetsync/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: creds.api_base.trim_end_matches('/').to_string(),
            token: creds.token,
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Read a range. Trailing empty rows and cells are omitted by the API;
    /// numbers and booleans come back as their text.
    pub fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(&[range])?;
        let resp = self.get(url)?;
        let body: ValuesResponse = resp.json().map_err(|e| SheetsError::Parse(e.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Overwrite one range in place.
    pub fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        let url = self.values_url(&[range])?;
        let body = serde_json::json!({ "range": range, "values": rows });
        self.put_json(url, &body)?;
        Ok(())
    }

    /// Overwrite many ranges in one call. Returns the updated cell count.
    pub fn batch_update(&self, data: &[ValueRange]) -> Result<u64, SheetsError> {
        let url = self.spreadsheet_url("values:batchUpdate")?;
        let body = serde_json::json!({
            "valueInputOption": VALUE_INPUT_OPTION,
            "data": data,
        });
        let resp = self.post_json(url, &body, &[])?;
        let body: BatchUpdateResponse = resp.json().map_err(|e| SheetsError::Parse(e.to_string()))?;
        Ok(body.total_updated_cells)
    }

    /// Insert `rows` after the table that `range` anchors, shifting nothing
    /// below it (`insertDataOption=INSERT_ROWS`).
    pub fn append(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        let tail = format!("{range}:append");
        let url = self.values_url(&[tail.as_str()])?;
        let body = serde_json::json!({ "values": rows });
        let query = [
            ("valueInputOption", VALUE_INPUT_OPTION),
            ("insertDataOption", "INSERT_ROWS"),
        ];
        self.post_json(url, &body, &query)?;
        Ok(())
    }

    // ── HTTP helpers ──────────────────────────────────────────────────

    fn spreadsheet_url(&self, tail: &str) -> Result<reqwest::Url, SheetsError> {
        let mut url = reqwest::Url::parse(&self.api_base).map_err(|e| SheetsError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), tail]);
        Ok(url)
    }

    fn values_url(&self, tail: &[&str]) -> Result<reqwest::Url, SheetsError> {
        let mut url = self.spreadsheet_url("values")?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(self.api_base.clone()))?
            .extend(tail);
        Ok(url)
    }

    fn get(&self, url: reqwest::Url) -> Result<reqwest::blocking::Response, SheetsError> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;
        check_status(response)
    }

    fn put_json(&self, url: reqwest::Url, body: &Value) -> Result<reqwest::blocking::Response, SheetsError> {
        tracing::debug!(%url, "PUT");
        let response = self.http.put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(body)
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;
        check_status(response)
    }

    fn post_json(
        &self,
        url: reqwest::Url,
        body: &Value,
        query: &[(&str, &str)],
    ) -> Result<reqwest::blocking::Response, SheetsError> {
        tracing::debug!(%url, "POST");
        let response = self.http.post(url)
            .bearer_auth(&self.token)
            .query(query)
            .json(body)
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;
        check_status(response)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(SheetsError::Http(status.as_u16(), extract_error_message(&body)))
}

/// Google errors look like `{"error": {"code": 403, "message": "..."}}`.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
