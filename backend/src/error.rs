//! Error types for the dashboard data pipeline.
//!
//! Every render pass fails with one of three kinds:
//!
//! - [`FetchError`] - the source could not be retrieved or read (`DataUnavailable`)
//! - [`SchemaError`] - unexpected or unparseable columns, headers or selections
//! - [`TidyError`] - nothing survived the death threshold (`EmptyInput`)
//!
//! [`DashboardError`] wraps all three via `From`, so `?` works across
//! pipeline stages. None of them is retried: the pass aborts and the caller
//! surfaces the message.

use thiserror::Error;

// =============================================================================
// Fetch Errors (DataUnavailable)
// =============================================================================

/// Errors while retrieving or reading a source CSV.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request itself failed (DNS, connect, body read).
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Body could not be decoded to text.
    #[error("Failed to decode source body: {0}")]
    Decode(String),

    /// No header line at all.
    #[error("Source CSV is empty")]
    EmptyCsv,

    /// Header line could not be read as CSV.
    #[error("Invalid CSV header: {0}")]
    Header(String),

    /// A column the dataset layout relies on is absent.
    #[error("Expected column missing from source: {0}")]
    MissingColumn(String),

    /// Local file read failed.
    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors about the shape of a table or a user selection.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A date column header did not parse as a calendar date.
    #[error("Column header is not a date: '{0}'")]
    UnparseableDate(String),

    /// A selected entity does not exist in the dataset.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// The county map needs at least two dated columns for its slider.
    #[error("County map needs at least {needed} date columns, found {found}")]
    NotEnoughDates { needed: usize, found: usize },

    /// A column needed after fetching is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Tidy Errors
// =============================================================================

/// Errors from the tidy-metrics engine.
#[derive(Debug, Error)]
pub enum TidyError {
    /// Zero rows reached the threshold for every entity.
    #[error("No entity reaches {threshold} recorded deaths")]
    EmptyInput { threshold: i64 },
}

// =============================================================================
// Dashboard Errors (top-level)
// =============================================================================

/// Top-level error for one render pass.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Network or source failure.
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] FetchError),

    /// Unexpected columns, headers or selections.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No rows survived threshold filtering.
    #[error("Empty input: {0}")]
    EmptyInput(#[from] TidyError),
}

impl DashboardError {
    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::DataUnavailable(_) => "data_unavailable",
            DashboardError::Schema(_) => "schema",
            DashboardError::EmptyInput(_) => "empty_input",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for schema-checked operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for the tidy engine.
pub type TidyResult<T> = Result<T, TidyError>;

/// Result type for a full pass.
pub type DashboardResult<T> = Result<T, DashboardError>;
