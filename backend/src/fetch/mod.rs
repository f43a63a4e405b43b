//! Fetcher: HTTP retrieval of the remote time-series CSVs.
//!
//! ```rust,ignore
//! use covid_dashboard::{Fetcher, Dataset, wide_table_from_csv};
//! use covid_dashboard::api::logs::PassLog;
//!
//! let fetcher = Fetcher::new();
//! let parsed = fetcher.fetch_csv(covid_dashboard::config::GLOBAL_DEATHS_URL).await?;
//! let wide = wide_table_from_csv(&parsed, Dataset::Global, &PassLog::start())?;
//! ```

use crate::api::logs::{log_info, log_success, log_warning, PassLog};
use crate::error::{FetchError, FetchResult};
use crate::models::{Dataset, WideRow, WideSeriesTable};
use crate::parser::{parse_bytes_auto, ParseResult};

/// Plain-GET client for the CSV endpoints. No auth, no retries.
#[derive(Clone, Default)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// GET the raw body.
    pub async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        log_info(format!("📡 GET {}", url));

        let response = self.client.get(url).send().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        log_success(format!("Received {} bytes", body.len()));
        Ok(body.to_vec())
    }

    /// GET and parse a CSV body.
    pub async fn fetch_csv(&self, url: &str) -> FetchResult<ParseResult> {
        let bytes = self.fetch_bytes(url).await?;
        let parsed = parse_bytes_auto(&bytes)?;
        report_parse(&parsed);
        Ok(parsed)
    }
}

/// Log parse metadata and any dropped lines.
pub fn report_parse(parsed: &ParseResult) {
    log_success(format!(
        "Parsed {} rows x {} columns (encoding {}, delimiter '{}')",
        parsed.rows.len(),
        parsed.headers.len(),
        parsed.encoding,
        parsed.delimiter
    ));
    if !parsed.skipped.is_empty() {
        log_warning(format!("{} malformed lines skipped", parsed.skipped.len()));
        for skip in parsed.skipped.iter().take(3) {
            log_warning(format!("line {}: {}", skip.line, skip.reason));
        }
    }
}

/// Build the wide table for a dataset from a parsed CSV.
///
/// The key column and every metadata column of the dataset must be present.
/// Metadata columns are dropped and everything else is kept as a date column.
/// Rows with a non-integer date cell are skipped and reported on `log`.
pub fn wide_table_from_csv(parsed: &ParseResult, dataset: Dataset, log: &PassLog) -> FetchResult<WideSeriesTable> {
    let key_idx = parsed.require_column(dataset.key_column())?;
    let mut dropped = vec![key_idx];
    for column in dataset.metadata_columns() {
        dropped.push(parsed.require_column(column)?);
    }

    let kept: Vec<usize> = (0..parsed.headers.len())
        .filter(|i| !dropped.contains(i))
        .collect();
    let columns = kept.iter().map(|&i| parsed.headers[i].clone()).collect();

    let mut table = WideSeriesTable::new(dataset.key_column(), columns);
    let mut bad_rows = 0usize;

    for row in &parsed.rows {
        let values: Result<Vec<i64>, _> = kept.iter().map(|&i| parse_count(&row[i])).collect();
        match values {
            Ok(values) => table.rows.push(WideRow {
                entity: row[key_idx].clone(),
                values,
            }),
            Err(cell) => {
                bad_rows += 1;
                if bad_rows <= 3 {
                    log.warning(format!("Skipping '{}': non-numeric cell '{}'", row[key_idx], cell));
                }
            }
        }
    }

    if bad_rows > 0 {
        log.warning(format!("{} rows skipped for non-numeric counts", bad_rows));
    }
    Ok(table)
}

/// Parse a cumulative count. Integral floats ("12.0") are accepted.
pub(crate) fn parse_count(cell: &str) -> Result<i64, String> {
    let cell = cell.trim();
    if let Ok(n) = cell.parse::<i64>() {
        return Ok(n);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::logs::LogLevel;
    use tokio::sync::broadcast::error::TryRecvError;
    use crate::parser::parse_str;

    const GLOBAL_CSV: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Italy,41.87,12.56,0,2,5
Hubei,China,30.97,112.27,17,24,40
Beijing,China,40.18,116.41,0,0,1
,\"Korea, South\",35.9,127.7,0,0,x
";

    #[test]
    fn test_drops_metadata_columns() {
        let parsed = parse_str(GLOBAL_CSV, ',', "utf-8".into()).unwrap();
        let wide = wide_table_from_csv(&parsed, Dataset::Global, &PassLog::start()).unwrap();

        assert_eq!(wide.key_column, "Country/Region");
        assert_eq!(wide.columns, vec!["1/22/20", "1/23/20", "1/24/20"]);
        assert_eq!(wide.row("Italy").unwrap().values, vec![0, 2, 5]);
    }

    #[test]
    fn test_non_numeric_row_skipped() {
        let parsed = parse_str(GLOBAL_CSV, ',', "utf-8".into()).unwrap();
        let wide = wide_table_from_csv(&parsed, Dataset::Global, &PassLog::start()).unwrap();

        assert_eq!(wide.entities(), vec!["Italy", "China", "China"]);
        assert!(wide.row("Korea, South").is_none());
    }

    #[test]
    fn test_skip_warnings_carry_pass_id() {
        let mut rx = crate::api::logs::LOG_BROADCASTER.subscribe();
        let log = PassLog::start();
        let parsed = parse_str(GLOBAL_CSV, ',', "utf-8".into()).unwrap();
        wide_table_from_csv(&parsed, Dataset::Global, &log).unwrap();

        // other tests share the broadcaster
        let mut warnings = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(entry) if entry.pass_id.as_deref() == Some(log.id()) => warnings.push(entry),
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|e| e.level == LogLevel::Warning));
        assert!(warnings[0].message.contains("Korea, South"));
    }

    #[test]
    fn test_missing_metadata_column_fails() {
        let parsed = parse_str("Country/Region,Lat,1/22/20\nItaly,1,0\n", ',', "utf-8".into()).unwrap();
        let err = wide_table_from_csv(&parsed, Dataset::Global, &PassLog::start()).unwrap_err();
        assert!(matches!(err, FetchError::MissingColumn(c) if c == "Province/State"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42"), Ok(42));
        assert_eq!(parse_count("42.0"), Ok(42));
        assert!(parse_count("4.2").is_err());
        assert!(parse_count("").is_err());
    }
}
