//! Chart specs handed to the external renderer.
//!
//! Nothing is drawn here. A [`ChartSpec`] describes a plotly-style line chart
//! over tidy rows, and a [`DeckSpec`] describes a deck.gl-style 3D column map.
//! Both serialize to camelCase JSON.

use serde::Serialize;
use serde_json::Value;

use crate::models::{AxisType, Dataset, Metric, TidyRecord};

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 600;

/// X axis of every line chart.
pub const X_FIELD: &str = "Days";
pub const X_AXIS_TITLE: &str = "Number of days since 10th death";

const GRID_COLOR: &str = "LightBlue";
const TRANSPARENT: &str = "rgba(0,0,0,0)";

// =============================================================================
// Line Chart
// =============================================================================

/// Line chart description: one line per value of `color_field`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub kind: &'static str,
    pub title: String,
    pub x_field: &'static str,
    pub y_field: &'static str,
    pub color_field: String,
    pub x_axis_title: &'static str,
    pub y_axis_title: &'static str,
    pub legend_title: &'static str,
    pub y_axis_type: AxisType,
    pub y_tick_format: &'static str,
    pub grid_color: &'static str,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub width: u32,
    pub height: u32,
    pub data: Vec<Value>,
}

/// Build the line chart for a page selection.
pub fn line_chart(dataset: Dataset, metric: Metric, key_column: &str, rows: &[TidyRecord]) -> ChartSpec {
    ChartSpec {
        kind: "line",
        title: dataset.chart_title(metric).to_string(),
        x_field: X_FIELD,
        y_field: metric.y_field(),
        color_field: key_column.to_string(),
        x_axis_title: X_AXIS_TITLE,
        y_axis_title: metric.y_axis_title(),
        legend_title: dataset.legend_title(),
        y_axis_type: metric.y_axis_type(),
        y_tick_format: "f",
        grid_color: GRID_COLOR,
        paper_bgcolor: TRANSPARENT,
        plot_bgcolor: TRANSPARENT,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        data: rows.iter().map(|r| r.to_row(key_column)).collect(),
    }
}

// =============================================================================
// Column Map
// =============================================================================

pub const MAP_STYLE: &str = "mapbox://styles/mapbox/dark-v10";
pub const TOOLTIP_HTML: &str = "<b> {Combined_Key} </b> <br> <b>Deaths:</b> {value} ";

/// Initial camera of the county map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            latitude: 36.6,
            longitude: -79.0,
            zoom: 4.0,
            pitch: 70.0,
            bearing: -37.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tooltip {
    pub html: &'static str,
    pub style: Value,
}

/// A `ColumnLayer` over per-county rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayer {
    #[serde(rename = "@@type")]
    pub layer_type: &'static str,
    pub get_position: [&'static str; 2],
    pub get_elevation: &'static str,
    pub elevation_scale: u32,
    pub radius: u32,
    pub get_fill_color: &'static str,
    pub auto_highlight: bool,
    pub pickable: bool,
    pub material: bool,
    pub data: Vec<Value>,
}

impl ColumnLayer {
    pub fn counties(data: Vec<Value>) -> Self {
        Self {
            layer_type: "ColumnLayer",
            get_position: ["Long_", "Lat"],
            get_elevation: "value / 2",
            elevation_scale: 500,
            radius: 7000,
            get_fill_color: "Color",
            auto_highlight: true,
            pickable: true,
            material: true,
            data,
        }
    }
}

/// Full deck description for the county map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSpec {
    pub map_style: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapbox_key: Option<String>,
    pub tooltip: Tooltip,
    pub initial_view_state: ViewState,
    pub layers: Vec<ColumnLayer>,
}

impl DeckSpec {
    pub fn county_columns(data: Vec<Value>, mapbox_key: Option<String>) -> Self {
        Self {
            map_style: MAP_STYLE,
            mapbox_key,
            tooltip: Tooltip {
                html: TOOLTIP_HTML,
                style: serde_json::json!({ "color": "white" }),
            },
            initial_view_state: ViewState::default(),
            layers: vec![ColumnLayer::counties(data)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record(entity: &str, days: i64, value: i64) -> TidyRecord {
        TidyRecord {
            entity: entity.into(),
            date: NaiveDate::from_ymd_opt(2020, 3, 10).unwrap(),
            value,
            days_since_threshold: days,
            daily_change: 0,
            daily_pct_change: 0.0,
            daily_roll_avg: 0.0,
            daily_pctchange_roll_avg: 0.0,
        }
    }

    #[test]
    fn test_total_chart_is_log() {
        let rows = vec![record("Italy", 0, 10), record("Italy", 1, 12)];
        let spec = line_chart(Dataset::Global, Metric::Total, "Country/Region", &rows);

        assert_eq!(spec.title, "Global COVID-19 Deaths - Total");
        assert_eq!(spec.y_field, "value");
        assert_eq!(spec.y_axis_type, AxisType::Log);
        assert_eq!(spec.legend_title, "Countries");
        assert_eq!(spec.data.len(), 2);
        assert_eq!(spec.data[1]["Country/Region"], "Italy");
        assert_eq!(spec.data[1][X_FIELD], 1);
    }

    #[test]
    fn test_pct_chart_is_linear() {
        let spec = line_chart(Dataset::Us, Metric::PercentChange, "Province_State", &[]);

        assert_eq!(spec.y_field, "daily_pctchange_roll_avg");
        assert_eq!(spec.y_axis_title, "Rate Change (%)");
        assert_eq!(spec.legend_title, "States");

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["yAxisType"], "linear");
        assert_eq!(json["colorField"], "Province_State");
    }

    #[test]
    fn test_deck_camera_and_layer() {
        let deck = DeckSpec::county_columns(vec![json!({ "value": 3 })], None);
        let json = serde_json::to_value(&deck).unwrap();

        assert_eq!(json["initialViewState"]["latitude"], 36.6);
        assert_eq!(json["initialViewState"]["longitude"], -79.0);
        assert_eq!(json["initialViewState"]["pitch"], 70.0);
        assert_eq!(json["initialViewState"]["bearing"], -37.0);
        assert_eq!(json["layers"][0]["@@type"], "ColumnLayer");
        assert_eq!(json["layers"][0]["getPosition"], json!(["Long_", "Lat"]));
        assert_eq!(json["layers"][0]["radius"], 7000);
        assert!(json.get("mapboxKey").is_none());
    }
}
