//! # COVID-19 Dashboard - JHU death time series, tidied for charting
//!
//! Fetches the Johns Hopkins CSSE death counts (global and US), aggregates
//! them per country or state, derives daily metrics, and serves chart and map
//! specs for an external renderer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  JHU CSV    │────▶│   Fetcher   │────▶│ Aggregator  │────▶│  Reshaper   │────▶│    Tidy     │
//! │  (remote)   │     │ (URL cache) │     │ (per entity)│     │ (by date)   │     │ (+ metrics) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                                        ▼
//!                                                                               ChartSpec / DeckSpec
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use covid_dashboard::{DashboardConfig, DashboardService, Dataset};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = DashboardService::new(DashboardConfig::from_env());
//!     let tidy = service.tidy_dataset(Dataset::Us).await.unwrap();
//!     println!("{} tidy rows", tidy.records.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Source URLs, map token and port
//! - [`models`] - Tables, datasets, metrics and pages
//! - [`parser`] - CSV parsing with auto-detection
//! - [`fetch`] - HTTP retrieval and wide-table construction
//! - [`cache`] - URL-keyed source cache
//! - [`transform`] - Aggregation, reshaping, tidy metrics and the pipeline
//! - [`chart`] - Line chart and column map specs
//! - [`county`] - County map snapshots and colors
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod config;
pub mod models;

// Sources
pub mod parser;
pub mod fetch;
pub mod cache;

// Transformation
pub mod transform;

// Presentation
pub mod chart;
pub mod county;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    DashboardError,
    DashboardResult,
    FetchError,
    FetchResult,
    SchemaError,
    SchemaResult,
    TidyError,
    TidyResult,
};

// =============================================================================
// Re-exports - Config & Models
// =============================================================================

pub use config::DashboardConfig;

pub use models::{
    WideRow,
    WideSeriesTable,
    DateSeriesTable,
    LongRecord,
    LongSeriesTable,
    TidyRecord,
    TidyTable,
    Dataset,
    Metric,
    AxisType,
    Page,
    HomePage,
};

// =============================================================================
// Re-exports - CSV Parsing & Fetching
// =============================================================================

pub use parser::{
    parse_str,
    parse_bytes_auto,
    parse_csv_file_auto,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParseResult,
    SkippedLine,
};

pub use fetch::{wide_table_from_csv, Fetcher};

pub use cache::SourceCache;

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    aggregate_by_entity,
    to_date_series,
    parse_date_header,
    melt,
    pivot,
    tidy,
    tidy_long,
    DEATH_THRESHOLD,
    ROLLING_WINDOW,
};

pub use transform::pipeline::{
    DashboardService,
    EntityOptions,
    ChartView,
    CountyMapView,
};

// =============================================================================
// Re-exports - Presentation
// =============================================================================

pub use chart::{line_chart, ChartSpec, DeckSpec, ColumnLayer, ViewState};

pub use county::{county_table, CountyTable, CountySnapshot, DaySlider};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
