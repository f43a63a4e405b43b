//! Domain models for the dashboard pipeline.
//!
//! Tables, leaves first:
//!
//! - [`WideSeriesTable`] - one row per entity, one column per date (source layout)
//! - [`DateSeriesTable`] - one row per date, one column per entity (reshaped)
//! - [`LongSeriesTable`] - one row per (entity, date) observation
//! - [`TidyTable`] - long rows plus the derived daily metrics
//!
//! Page-level choices:
//!
//! - [`Dataset`] - Global or US source, with its layout and wording
//! - [`Metric`] - which tidy column a chart plots
//! - [`Page`] - the dashboard's page selector

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Wide Table (source layout)
// =============================================================================

/// One entity's cumulative counts, aligned with [`WideSeriesTable::columns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideRow {
    pub entity: String,
    pub values: Vec<i64>,
}

/// Rows keyed by entity, columns are the source's date headers.
///
/// Every row holds exactly `columns.len()` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideSeriesTable {
    /// Name of the entity key column (e.g. `Country/Region`)
    pub key_column: String,
    /// Date headers, as they appear in the source
    pub columns: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideSeriesTable {
    pub fn new(key_column: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            key_column: key_column.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Entity keys in row order.
    pub fn entities(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.entity.as_str()).collect()
    }

    /// First row for an entity.
    pub fn row(&self, entity: &str) -> Option<&WideRow> {
        self.rows.iter().find(|r| r.entity == entity)
    }
}

// =============================================================================
// Date Table (reshaped)
// =============================================================================

/// Date-indexed view: `values[d][e]` is entity `e` on `dates[d]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSeriesTable {
    pub key_column: String,
    pub dates: Vec<NaiveDate>,
    pub entities: Vec<String>,
    pub values: Vec<Vec<i64>>,
}

impl DateSeriesTable {
    /// Position of an entity column.
    pub fn entity_index(&self, entity: &str) -> Option<usize> {
        self.entities.iter().position(|e| e == entity)
    }

    /// The full series of one entity, in date order.
    pub fn column(&self, entity: &str) -> Option<Vec<i64>> {
        let idx = self.entity_index(entity)?;
        Some(self.values.iter().map(|row| row[idx]).collect())
    }

    /// Entity names sorted alphabetically, as offered to the selector.
    pub fn sorted_entities(&self) -> Vec<String> {
        let mut names = self.entities.clone();
        names.sort();
        names
    }
}

// =============================================================================
// Long & Tidy Tables
// =============================================================================

/// One (entity, date) observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRecord {
    pub entity: String,
    pub date: NaiveDate,
    pub value: i64,
}

/// Melted table, entity-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongSeriesTable {
    pub key_column: String,
    pub records: Vec<LongRecord>,
}

/// A long row with its derived daily metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub entity: String,
    pub date: NaiveDate,
    /// Cumulative deaths on `date`
    pub value: i64,
    /// Days since the entity's first retained date
    pub days_since_threshold: i64,
    pub daily_change: i64,
    /// Percent change against the previous retained day
    pub daily_pct_change: f64,
    /// 7-sample trailing mean of `daily_change`, rounded
    pub daily_roll_avg: f64,
    /// 7-sample trailing mean of `daily_pct_change`, rounded
    pub daily_pctchange_roll_avg: f64,
}

impl TidyRecord {
    /// Chart row with the entity under the dataset's key column name.
    ///
    /// Field names follow what the chart spec references: `Days`, `value`,
    /// `daily_roll_avg`, `daily_pctchange_roll_avg`.
    pub fn to_row(&self, key_column: &str) -> Value {
        let mut obj = Map::new();
        obj.insert(key_column.to_string(), json!(self.entity));
        obj.insert("Date".to_string(), json!(self.date.to_string()));
        obj.insert("value".to_string(), json!(self.value));
        obj.insert("Days".to_string(), json!(self.days_since_threshold));
        obj.insert("daily_change".to_string(), json!(self.daily_change));
        obj.insert("daily_pct_change".to_string(), json!(self.daily_pct_change));
        obj.insert("daily_roll_avg".to_string(), json!(self.daily_roll_avg));
        obj.insert(
            "daily_pctchange_roll_avg".to_string(),
            json!(self.daily_pctchange_roll_avg),
        );
        Value::Object(obj)
    }
}

/// Output of the tidy-metrics engine, in melt order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyTable {
    pub key_column: String,
    pub records: Vec<TidyRecord>,
}

impl TidyTable {
    /// Rows of one entity, in table order.
    pub fn entity_records<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a TidyRecord> + 'a {
        self.records.iter().filter(move |r| r.entity == entity)
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.records.iter().any(|r| r.entity == entity)
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Source dataset behind the Global and US pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Global,
    Us,
}

impl Dataset {
    /// Column whose value identifies an entity after aggregation.
    pub fn key_column(&self) -> &'static str {
        match self {
            Dataset::Global => "Country/Region",
            Dataset::Us => "Province_State",
        }
    }

    /// Non-date columns dropped after fetching. All must be present.
    pub fn metadata_columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::Global => &["Province/State", "Lat", "Long"],
            Dataset::Us => &[
                "Country_Region",
                "UID",
                "iso2",
                "iso3",
                "code3",
                "Combined_Key",
                "FIPS",
                "Admin2",
                "Lat",
                "Long_",
                "Population",
            ],
        }
    }

    /// Entities pre-selected on the page.
    pub fn default_entities(&self) -> &'static [&'static str] {
        match self {
            Dataset::Global => &["US", "Italy", "United Kingdom"],
            Dataset::Us => &["California", "Massachusetts", "New York"],
        }
    }

    /// Legend title for line charts.
    pub fn legend_title(&self) -> &'static str {
        match self {
            Dataset::Global => "Countries",
            Dataset::Us => "States",
        }
    }

    pub fn page_title(&self) -> &'static str {
        match self {
            Dataset::Global => "Global COVID-19 Deaths",
            Dataset::Us => "US COVID-19 Deaths",
        }
    }

    pub fn page_header(&self) -> &'static str {
        match self {
            Dataset::Global => "Daily COVID-19 deaths by country from Jan 22, 2020 - Present.",
            Dataset::Us => "Daily COVID-19 deaths by state from Jan 22, 2020 - Present.",
        }
    }

    /// Chart title, which only differs between datasets for the total.
    pub fn chart_title(&self, metric: Metric) -> &'static str {
        match (self, metric) {
            (Dataset::Global, Metric::Total) => "Global COVID-19 Deaths - Total",
            (Dataset::Us, Metric::Total) => "US COVID-19 Deaths - Total by State",
            (_, Metric::DeathsPerDay) => "Daily Confirmed Deaths (7 day rolling average)",
            (_, Metric::PercentChange) => "Daily Confirmed Deaths Growth (%)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Global => "global",
            Dataset::Us => "us",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(Dataset::Global),
            "us" | "usa" => Ok(Dataset::Us),
            other => Err(format!("unknown dataset: {}, expected global or us", other)),
        }
    }
}

// =============================================================================
// Metric
// =============================================================================

/// Y-axis scale of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Log,
    Linear,
}

/// Variable plotted on the Global and US pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    #[serde(rename = "total")]
    Total,
    #[serde(rename = "daily")]
    DeathsPerDay,
    #[serde(rename = "pct")]
    PercentChange,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Total, Metric::DeathsPerDay, Metric::PercentChange];

    /// Label shown in the variable selector.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Total => "Total Confirmed Deaths",
            Metric::DeathsPerDay => "Deaths per Day",
            Metric::PercentChange => "Daily Percentage Change",
        }
    }

    /// Chart row field plotted on y.
    pub fn y_field(&self) -> &'static str {
        match self {
            Metric::Total => "value",
            Metric::DeathsPerDay => "daily_roll_avg",
            Metric::PercentChange => "daily_pctchange_roll_avg",
        }
    }

    pub fn y_axis_title(&self) -> &'static str {
        match self {
            Metric::Total => "Confirmed Deaths",
            Metric::DeathsPerDay => "Confirmed Daily Deaths",
            Metric::PercentChange => "Rate Change (%)",
        }
    }

    /// Growth rates are plotted linear, counts logarithmic.
    pub fn y_axis_type(&self) -> AxisType {
        match self {
            Metric::PercentChange => AxisType::Linear,
            _ => AxisType::Log,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Total => "total",
            Metric::DeathsPerDay => "daily",
            Metric::PercentChange => "pct",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s) || m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown metric: {}, expected total, daily or pct", s))
    }
}

// =============================================================================
// Page
// =============================================================================

/// Pages in the dashboard's page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Homepage,
    Global,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "County Map")]
    CountyMap,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Homepage, Page::Global, Page::Us, Page::CountyMap];

    pub fn label(&self) -> &'static str {
        match self {
            Page::Homepage => "Homepage",
            Page::Global => "Global",
            Page::Us => "US",
            Page::CountyMap => "County Map",
        }
    }
}

/// Static text of the Homepage.
#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub title: &'static str,
    pub header: &'static str,
    pub subheader: &'static str,
    pub pages: Vec<&'static str>,
}

impl Default for HomePage {
    fn default() -> Self {
        Self {
            title: "COVID-19 Dashboard",
            header: "Exploration of COVID-19 Deaths - Globally and USA.",
            subheader: "Use the selection panel on the left to view global or US data. All data from Johns Hopkins University",
            pages: Page::ALL.iter().map(|p| p.label()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_from_str() {
        assert_eq!("global".parse::<Dataset>().unwrap(), Dataset::Global);
        assert_eq!("US".parse::<Dataset>().unwrap(), Dataset::Us);
        assert!("mars".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_metric_parses_short_and_label() {
        assert_eq!("daily".parse::<Metric>().unwrap(), Metric::DeathsPerDay);
        assert_eq!(
            "Daily Percentage Change".parse::<Metric>().unwrap(),
            Metric::PercentChange
        );
        assert!("weekly".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_serde_names() {
        let m: Metric = serde_json::from_str("\"pct\"").unwrap();
        assert_eq!(m, Metric::PercentChange);
        assert_eq!(serde_json::to_string(&Metric::Total).unwrap(), "\"total\"");
    }

    #[test]
    fn test_only_pct_is_linear() {
        assert_eq!(Metric::Total.y_axis_type(), AxisType::Log);
        assert_eq!(Metric::DeathsPerDay.y_axis_type(), AxisType::Log);
        assert_eq!(Metric::PercentChange.y_axis_type(), AxisType::Linear);
    }

    #[test]
    fn test_tidy_row_uses_key_column() {
        let record = TidyRecord {
            entity: "Italy".into(),
            date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            value: 34,
            days_since_threshold: 2,
            daily_change: 5,
            daily_pct_change: 17.24,
            daily_roll_avg: 5.0,
            daily_pctchange_roll_avg: 17.24,
        };
        let row = record.to_row("Country/Region");
        assert_eq!(row["Country/Region"], "Italy");
        assert_eq!(row["Days"], 2);
        assert_eq!(row["Date"], "2020-03-01");
        assert!(row.get("entity").is_none());
    }

    #[test]
    fn test_date_table_column() {
        let table = DateSeriesTable {
            key_column: "Country/Region".into(),
            dates: vec![
                NaiveDate::from_ymd_opt(2020, 1, 22).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 23).unwrap(),
            ],
            entities: vec!["Spain".into(), "Chile".into()],
            values: vec![vec![1, 0], vec![3, 2]],
        };
        assert_eq!(table.column("Chile"), Some(vec![0, 2]));
        assert_eq!(table.column("Peru"), None);
        assert_eq!(table.sorted_entities(), vec!["Chile", "Spain"]);
    }
}
