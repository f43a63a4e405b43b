//! Transformation module.
//!
//! - Aggregator: sum sub-regional rows per entity
//! - Reshaper: wide table to date-indexed table
//! - Tidy: melt, threshold and daily metrics
//! - Pipeline: the per-request pass over all of the above

pub mod aggregator;
pub mod pipeline;
pub mod reshaper;
pub mod tidy;

pub use aggregator::aggregate_by_entity;
pub use pipeline::*;
pub use reshaper::{parse_date_header, to_date_series};
pub use tidy::{melt, pivot, tidy, tidy_long, DEATH_THRESHOLD, ROLLING_WINDOW};
