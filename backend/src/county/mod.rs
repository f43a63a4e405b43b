//! County map: per-county death columns for one day of the US series.
//!
//! The slider counts days since March 1, 2020. Map dates start on Feb 29, so
//! day `n` selects map date `n` and the slider runs over `[1, max_days - 1]`.

pub mod colormap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DashboardResult, SchemaError};
use crate::fetch::parse_count;
use crate::parser::ParseResult;
use crate::transform::reshaper::parse_date_header;

pub use colormap::wistia;

/// Deaths at which the color ramp saturates.
pub const COLOR_SCALE_MAX: f64 = 2000.0;

const KEY_COLUMN: &str = "Combined_Key";
const LAT_COLUMN: &str = "Lat";
const LON_COLUMN: &str = "Long_";

/// First date column shown on the map (slider day 0).
pub fn map_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 2, 29).unwrap_or(NaiveDate::MIN)
}

/// Color of a county column.
pub fn county_color(value: i64) -> [u8; 4] {
    wistia(value as f64 / COLOR_SCALE_MAX)
}

/// One county with its full map-date series.
#[derive(Debug, Clone, PartialEq)]
pub struct County {
    pub combined_key: String,
    pub lat: f64,
    pub lon: f64,
    /// Aligned with [`CountyTable::labels`]
    pub values: Vec<i64>,
}

/// Geolocated counties over the map dates.
#[derive(Debug, Clone)]
pub struct CountyTable {
    /// Raw date headers of the map dates, e.g. `3/9/23`
    pub labels: Vec<String>,
    pub counties: Vec<County>,
}

/// Bounds and position of the day slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaySlider {
    pub min: usize,
    pub max: usize,
    pub value: usize,
}

/// A county column as the map layer reads it.
#[derive(Debug, Clone, Serialize)]
pub struct CountyColumn {
    #[serde(rename = "Combined_Key")]
    pub combined_key: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Long_")]
    pub lon: f64,
    pub value: i64,
    #[serde(rename = "Color")]
    pub color: [u8; 4],
}

/// The map for one slider position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountySnapshot {
    pub title: &'static str,
    pub slider_label: &'static str,
    pub slider: DaySlider,
    /// Selected date header
    pub date_label: String,
    pub header: String,
    pub counties: Vec<CountyColumn>,
}

impl CountySnapshot {
    /// Rows for the map layer.
    pub fn layer_data(&self) -> Vec<Value> {
        self.counties
            .iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect()
    }
}

/// Build the county table from the full US CSV.
///
/// Rows without coordinates (`Lat` of 0) or with any empty cell are dropped,
/// as are rows whose coordinates or counts do not parse.
pub fn county_table(parsed: &ParseResult) -> DashboardResult<CountyTable> {
    let column = |name: &str| {
        parsed
            .column_index(name)
            .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))
    };
    let key_idx = column(KEY_COLUMN)?;
    let lat_idx = column(LAT_COLUMN)?;
    let lon_idx = column(LON_COLUMN)?;

    let start = map_start();
    let date_cols: Vec<usize> = parsed
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| parse_date_header(h).is_ok_and(|d| d >= start))
        .map(|(i, _)| i)
        .collect();

    if date_cols.len() < 2 {
        return Err(SchemaError::NotEnoughDates {
            needed: 2,
            found: date_cols.len(),
        }
        .into());
    }

    let counties = parsed
        .rows
        .iter()
        .filter(|row| row.iter().all(|cell| !cell.is_empty()))
        .filter_map(|row| {
            let lat: f64 = row[lat_idx].parse().ok()?;
            let lon: f64 = row[lon_idx].parse().ok()?;
            if lat == 0.0 {
                return None;
            }
            let values = date_cols
                .iter()
                .map(|&i| parse_count(&row[i]).ok())
                .collect::<Option<Vec<_>>>()?;
            Some(County {
                combined_key: row[key_idx].clone(),
                lat,
                lon,
                values,
            })
        })
        .collect();

    Ok(CountyTable {
        labels: date_cols.iter().map(|&i| parsed.headers[i].clone()).collect(),
        counties,
    })
}

impl CountyTable {
    /// Number of map dates.
    pub fn max_days(&self) -> usize {
        self.labels.len()
    }

    /// Slider bounds, resting on the latest date.
    pub fn slider(&self) -> DaySlider {
        let max = self.max_days().saturating_sub(1).max(1);
        DaySlider { min: 1, max, value: max }
    }

    /// Snapshot at `day`, or at the latest date when `None`. Out-of-range
    /// days are clamped into the slider bounds.
    pub fn snapshot(&self, day: Option<usize>) -> CountySnapshot {
        let bounds = self.slider();
        let day = day.unwrap_or(bounds.value).clamp(bounds.min, bounds.max);
        let date_label = self.labels[day].clone();

        let counties = self
            .counties
            .iter()
            .map(|c| {
                let value = c.values[day];
                CountyColumn {
                    combined_key: c.combined_key.clone(),
                    lat: c.lat,
                    lon: c.lon,
                    value,
                    color: county_color(value),
                }
            })
            .collect();

        CountySnapshot {
            title: "County Map",
            slider_label: "Days since March 1, 2020",
            slider: DaySlider { value: day, ..bounds },
            header: format!("Deaths by US county as of {}", date_label),
            date_label,
            counties,
        }
    }
}
