//! REST API types for the dashboard frontend.
//!
//! Every response carries a `requestId`. Chart and map responses also carry
//! the `passId` of the pipeline pass, matching the ids on the SSE log stream.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{DateSeriesTable, Dataset, HomePage, Metric, TidyTable};
use crate::transform::pipeline::{ChartView, CountyMapView, EntityOptions};

/// Landing page text plus the sidebar pages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub page: HomePage,
}

impl From<HomePage> for HomeResponse {
    fn from(page: HomePage) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            page,
        }
    }
}

/// The aggregated, date-indexed table ("Raw Data" view).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataResponse {
    pub request_id: String,
    pub dataset: Dataset,
    pub page_title: &'static str,
    pub header: &'static str,
    pub table: DateSeriesTable,
}

impl RawDataResponse {
    pub fn new(dataset: Dataset, table: DateSeriesTable) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            dataset,
            page_title: dataset.page_title(),
            header: dataset.page_header(),
            table,
        }
    }
}

/// Entity selector contents plus the metric choices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub options: EntityOptions,
    pub metrics: Vec<MetricOption>,
}

/// One radio button of the metric picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOption {
    pub id: String,
    pub label: String,
}

impl From<EntityOptions> for EntitiesResponse {
    fn from(options: EntityOptions) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            options,
            metrics: Metric::ALL
                .iter()
                .map(|m| MetricOption {
                    id: m.as_str().to_string(),
                    label: m.label().to_string(),
                })
                .collect(),
        }
    }
}

/// Tidy rows keyed the way the chart reads them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyResponse {
    pub request_id: String,
    pub dataset: Dataset,
    pub key_column: String,
    pub row_count: usize,
    pub rows: Vec<Value>,
}

impl TidyResponse {
    pub fn new(dataset: Dataset, tidy: &TidyTable) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            dataset,
            key_column: tidy.key_column.clone(),
            row_count: tidy.records.len(),
            rows: tidy.records.iter().map(|r| r.to_row(&tidy.key_column)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub view: ChartView,
}

impl From<ChartView> for ChartResponse {
    fn from(view: ChartView) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            view,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyMapResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub view: CountyMapView,
}

impl From<CountyMapView> for CountyMapResponse {
    fn from(view: CountyMapView) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            view,
        }
    }
}

/// Create an error response body
pub fn error_response(error: &str, kind: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "kind": kind,
    })
}

/// HTTP status for a failed pass.
pub fn error_status(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::DataUnavailable(_) => StatusCode::BAD_GATEWAY,
        DashboardError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::EmptyInput(_) => StatusCode::NOT_FOUND,
    }
}
