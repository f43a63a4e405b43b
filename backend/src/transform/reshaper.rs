//! Transpose a wide table into a date-indexed table with typed dates.

use chrono::NaiveDate;

use crate::error::{SchemaError, SchemaResult};
use crate::models::{DateSeriesTable, WideSeriesTable};

/// Header formats seen in the JHU series (`1/22/20`) plus ISO dates.
const DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Parse a date column header.
pub fn parse_date_header(header: &str) -> SchemaResult<NaiveDate> {
    let header = header.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(header, fmt).ok())
        .ok_or_else(|| SchemaError::UnparseableDate(header.to_string()))
}

/// One row per date, one column per entity (in wide row order).
///
/// Fails on the first header that is not a date.
pub fn to_date_series(table: &WideSeriesTable) -> SchemaResult<DateSeriesTable> {
    let dates = table
        .columns
        .iter()
        .map(|c| parse_date_header(c))
        .collect::<SchemaResult<Vec<_>>>()?;

    let values = (0..dates.len())
        .map(|d| table.rows.iter().map(|row| row.values[d]).collect())
        .collect();

    Ok(DateSeriesTable {
        key_column: table.key_column.clone(),
        dates,
        entities: table.rows.iter().map(|r| r.entity.clone()).collect(),
        values,
    })
}
