use std::collections::HashSet;

use chrono::format::{Item, StrftimeItems};
use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything a reconciliation pass needs to know about the ledger's columns.
///
/// Column names refer to header cells of the persisted store; source records
/// are expected to use the same names.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    /// Fields joined, in this order, into the business key.
    pub identity: Vec<String>,
    /// Fields whose change alone justifies rewriting a stored record.
    #[serde(default)]
    pub volatile: Vec<String>,
    pub status_field: String,
    /// Status assigned when a stored key disappears from the snapshot.
    pub terminal_status: String,
    /// "Last updated" column, stamped on insert, update and terminal transition.
    #[serde(default)]
    pub timestamp_field: Option<String>,
    /// Extra column stamped only on the terminal transition.
    #[serde(default)]
    pub terminal_stamp_field: Option<String>,
    #[serde(default = "default_separator")]
    pub key_separator: String,
    #[serde(default)]
    pub strategy: WriteStrategy,
    /// 1-based row holding the column names. Data starts on the next row.
    #[serde(default = "default_header_row")]
    pub header_row: u32,
    /// How many columns to read when fetching the header.
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
    #[serde(default)]
    pub timestamp: TimestampConfig,
}

fn default_separator() -> String {
    "|".into()
}

fn default_header_row() -> u32 {
    1
}

fn default_max_columns() -> usize {
    52
}

// ---------------------------------------------------------------------------
// Write strategy
// ---------------------------------------------------------------------------

/// How an updated record is addressed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Rewrite the whole row with the incoming values.
    #[default]
    WholeRow,
    /// Write only the changed volatile cells plus the timestamp cell.
    Cell,
}

impl std::fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WholeRow => write!(f, "whole_row"),
            Self::Cell => write!(f, "cell"),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimestampConfig {
    /// chrono strftime pattern.
    #[serde(default = "default_timestamp_format")]
    pub format: String,
    /// Fixed UTC offset the stamp is rendered in, e.g. "-03:00".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".into()
}

fn default_utc_offset() -> String {
    "+00:00".into()
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            format: default_timestamp_format(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl TimestampConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Parse "+HH:MM", "-HH:MM", "+HHMM" or "Z".
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset, ConfigError> {
    let bad = || ConfigError::Validation(format!("invalid utc_offset '{input}'"));
    let s = input.trim();
    if s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(bad);
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(bad()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| bad())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| bad())?;
    if hours > 23 || minutes > 59 {
        return Err(bad());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.name.trim().is_empty() {
            return invalid("name must not be empty".into());
        }

        if self.identity.is_empty() {
            return invalid("at least one identity field is required".into());
        }

        let mut seen = HashSet::new();
        for field in &self.identity {
            if field.is_empty() {
                return invalid("identity field names must not be empty".into());
            }
            if !seen.insert(field.as_str()) {
                return invalid(format!("identity field '{field}' listed twice"));
            }
        }

        if self.key_separator.is_empty() {
            return invalid("key_separator must not be empty".into());
        }

        if self.status_field.is_empty() {
            return invalid("status_field must not be empty".into());
        }
        if self.terminal_status.is_empty() {
            return invalid("terminal_status must not be empty".into());
        }
        if seen.contains(self.status_field.as_str()) {
            return invalid(format!(
                "status field '{}' cannot be part of the identity",
                self.status_field
            ));
        }

        for stamp in [&self.timestamp_field, &self.terminal_stamp_field]
            .into_iter()
            .flatten()
        {
            if seen.contains(stamp.as_str()) {
                return invalid(format!("stamp column '{stamp}' cannot be part of the identity"));
            }
            if *stamp == self.status_field {
                return invalid(format!("stamp column '{stamp}' cannot be the status field"));
            }
        }

        if let Some(ref ts) = self.timestamp_field {
            if self.volatile.iter().any(|v| v == ts) {
                return invalid(format!(
                    "timestamp column '{ts}' cannot be volatile (it is rewritten on every change)"
                ));
            }
        }

        if self.header_row == 0 {
            return invalid("header_row is 1-based and must be at least 1".into());
        }
        if self.max_columns == 0 {
            return invalid("max_columns must be at least 1".into());
        }

        if StrftimeItems::new(&self.timestamp.format).any(|item| matches!(item, Item::Error)) {
            return invalid(format!("invalid timestamp format '{}'", self.timestamp.format));
        }
        self.timestamp.offset()?;

        Ok(())
    }

    /// First 1-based row holding data.
    pub fn first_data_row(&self) -> u32 {
        self.header_row + 1
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PROVEEDOR: &str = r#"
name = "pedidos-proveedor"
identity = ["Codigo", "Producto"]
volatile = ["Estado", "Fecha entrega", "Fecha pedido"]
status_field = "Estado"
terminal_status = "entregado"
timestamp_field = "Ultima actualizacion"
terminal_stamp_field = "Fecha recibido"

[timestamp]
format = "%d/%m/%Y, %H:%M:%S"
utc_offset = "-03:00"
"#;

    #[test]
    fn parse_full_config() {
        let config = ReconConfig::from_toml(PROVEEDOR).unwrap();
        assert_eq!(config.name, "pedidos-proveedor");
        assert_eq!(config.identity, vec!["Codigo", "Producto"]);
        assert_eq!(config.volatile.len(), 3);
        assert_eq!(config.terminal_status, "entregado");
        assert_eq!(config.terminal_stamp_field.as_deref(), Some("Fecha recibido"));
        assert_eq!(config.timestamp.offset().unwrap().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn defaults_applied() {
        let config = ReconConfig::from_toml(
            r#"
name = "ventas"
identity = ["codigo"]
status_field = "estado"
terminal_status = "delivered"
"#,
        )
        .unwrap();
        assert_eq!(config.key_separator, "|");
        assert_eq!(config.strategy, WriteStrategy::WholeRow);
        assert_eq!(config.header_row, 1);
        assert_eq!(config.first_data_row(), 2);
        assert_eq!(config.max_columns, 52);
        assert!(config.volatile.is_empty());
        assert!(config.timestamp_field.is_none());
        assert_eq!(config.timestamp.offset().unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn parse_cell_strategy() {
        let input = format!("strategy = \"cell\"\n{PROVEEDOR}");
        let config = ReconConfig::from_toml(&input).unwrap();
        assert_eq!(config.strategy, WriteStrategy::Cell);
    }

    #[test]
    fn reject_unknown_strategy() {
        let input = format!("strategy = \"patch\"\n{PROVEEDOR}");
        assert!(ReconConfig::from_toml(&input).is_err());
    }

    #[test]
    fn reject_unknown_field() {
        let input = format!("volatil = [\"Estado\"]\n{PROVEEDOR}");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reject_empty_identity() {
        let err = ReconConfig::from_toml(
            r#"
name = "x"
identity = []
status_field = "estado"
terminal_status = "delivered"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("identity"));
    }

    #[test]
    fn reject_duplicate_identity() {
        let err = ReconConfig::from_toml(
            r#"
name = "x"
identity = ["codigo", "codigo"]
status_field = "estado"
terminal_status = "delivered"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn reject_status_as_identity() {
        let err = ReconConfig::from_toml(
            r#"
name = "x"
identity = ["codigo", "estado"]
status_field = "estado"
terminal_status = "delivered"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be part of the identity"));
    }

    #[test]
    fn reject_volatile_timestamp() {
        let err = ReconConfig::from_toml(
            r#"
name = "x"
identity = ["codigo"]
volatile = ["estado", "actualizado"]
status_field = "estado"
terminal_status = "delivered"
timestamp_field = "actualizado"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be volatile"));
    }

    #[test]
    fn reject_zero_header_row() {
        let err = ReconConfig::from_toml(
            r#"
name = "x"
identity = ["codigo"]
status_field = "estado"
terminal_status = "delivered"
header_row = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("header_row"));
    }

    #[test]
    fn reject_bad_timestamp_format() {
        let input = PROVEEDOR.replace("%d/%m/%Y, %H:%M:%S", "%d/%m/%Y %");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("timestamp format"));
    }

    #[test]
    fn reject_bad_offset() {
        let input = PROVEEDOR.replace("-03:00", "Buenos Aires");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("utc_offset"));
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("-0300").unwrap().local_minus_utc(), -10800);
        assert!(parse_utc_offset("03:00").is_err());
        assert!(parse_utc_offset("+24:00").is_err());
        assert!(parse_utc_offset("+3").is_err());
    }
}
