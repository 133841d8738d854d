use thiserror::Error;

/// Errors raised while parsing or validating a [`crate::ReconConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Semantic validation error (empty identity, bad offset, etc.).
    #[error("config validation error: {0}")]
    Validation(String),
}

/// The store's header row cannot support a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("header row is empty")]
    EmptyHeader,
    /// A field needed to build keys or track status is not in the header.
    #[error("{role} column '{field}' not found in header")]
    MissingColumn { field: String, role: &'static str },
    #[error("column '{column}' appears more than once in header")]
    DuplicateColumn { column: String },
}

/// The source could not produce a snapshot.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Source unreachable (file missing, process failed, ...).
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The source answered but the expected table never appeared.
    #[error("table '{table}' not found after {waited_ms} ms")]
    TableNotFound { table: String, waited_ms: u64 },
    /// The table was found but could not be decoded into records.
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Which store operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    ReadHeader,
    ReadRows,
    WriteRow,
    WriteCell,
    AppendRows,
    Flush,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadHeader => write!(f, "read_header"),
            Self::ReadRows => write!(f, "read_rows"),
            Self::WriteRow => write!(f, "write_row"),
            Self::WriteCell => write!(f, "write_cell"),
            Self::AppendRows => write!(f, "append_rows"),
            Self::Flush => write!(f, "flush"),
        }
    }
}

/// A read or write against the persisted store failed.
///
/// Writes issued before the failure stay applied; nothing is rolled back.
#[derive(Debug, Error)]
#[error("store {op} failed: {message}")]
pub struct StoreIoError {
    pub op: StoreOp,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreIoError {
    pub fn new(op: StoreOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        op: StoreOp,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            op,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Anything that can abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Store(#[from] StoreIoError),
}
