//! Bearer token lookup.
//!
//! The token is minted elsewhere (gcloud, a service-account helper, a CI
//! secret) and handed over through an environment variable.

use crate::client::{SheetsError, DEFAULT_API_BASE};

#[derive(Debug, Clone)]
pub struct SheetsCredentials {
    /// OAuth access token with the spreadsheets scope
    pub token: String,
    /// API base URL (e.g., "https://sheets.googleapis.com")
    pub api_base: String,
}

impl SheetsCredentials {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into(),
        }
    }

    /// Read the token from `var`; `api_base` falls back to the public endpoint.
    pub fn from_env(var: &str, api_base: Option<&str>) -> Result<Self, SheetsError> {
        let token = std::env::var(var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SheetsError::NotAuthenticated(var.to_string()))?;
        Ok(Self::new(token, api_base.unwrap_or(DEFAULT_API_BASE)))
    }
}
