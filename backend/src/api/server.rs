//! HTTP Server for the dashboard API.
//!
//! Each request runs one pipeline pass. Passes share only the source cache
//! inside [`DashboardService`].
//!
//! # API Endpoints
//!
//! | Method | Path                                  | Description                   |
//! |--------|---------------------------------------|-------------------------------|
//! | GET    | `/health`                             | Health check                  |
//! | GET    | `/api/home`                           | Homepage text                 |
//! | GET    | `/api/datasets/{dataset}/raw`         | Aggregated date-indexed table |
//! | GET    | `/api/datasets/{dataset}/entities`    | Entity selector contents      |
//! | GET    | `/api/datasets/{dataset}/tidy`        | Tidy rows with metrics        |
//! | GET    | `/api/datasets/{dataset}/chart`       | Line chart spec               |
//! | GET    | `/api/county-map`                     | County column map             |
//! | GET    | `/api/logs`                           | SSE stream for real-time logs |

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{
    error_response, error_status, ChartResponse, CountyMapResponse, EntitiesResponse, HomeResponse,
    RawDataResponse, TidyResponse,
};
use crate::error::DashboardError;
use crate::models::{Dataset, HomePage, Metric};
use crate::transform::pipeline::DashboardService;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DashboardService>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    /// Comma-separated entity names
    pub entities: Option<String>,
    pub metric: Option<Metric>,
}

impl ChartQuery {
    pub fn entity_list(&self) -> Vec<String> {
        self.entities
            .as_deref()
            .map(|s| s.split(',').map(|e| e.trim().to_string()).filter(|e| !e.is_empty()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CountyQuery {
    pub day: Option<usize>,
}

/// Build the router over a service
pub fn router(service: Arc<DashboardService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/home", get(home))
        .route("/api/datasets/{dataset}/raw", get(raw_data))
        .route("/api/datasets/{dataset}/entities", get(entities))
        .route("/api/datasets/{dataset}/tidy", get(tidy_rows))
        .route("/api/datasets/{dataset}/chart", get(chart))
        .route("/api/county-map", get(county_map))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState { service })
}

/// Start the HTTP server
pub async fn start_server(service: DashboardService) -> Result<(), Box<dyn std::error::Error>> {
    let port = service.config().port;
    let app = router(Arc::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 COVID-19 dashboard API running on http://localhost:{}", port);
    println!("   GET  /api/home                          - Homepage");
    println!("   GET  /api/datasets/{{global|us}}/chart    - Line chart");
    println!("   GET  /api/county-map?day=N              - County map");
    println!("   GET  /api/logs                          - SSE log stream");
    println!("   GET  /health                            - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "covid-dashboard",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "home": "GET /api/home",
            "datasets": "GET /api/datasets/{global|us}/{raw|entities|tidy|chart}",
            "countyMap": "GET /api/county-map",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn home() -> Json<HomeResponse> {
    Json(HomeResponse::from(HomePage::default()))
}

async fn raw_data(State(state): State<AppState>, Path(dataset): Path<String>) -> ApiResult<RawDataResponse> {
    let dataset = parse_dataset(&dataset)?;
    let table = state.service.load_dataset(dataset).await.map_err(reject)?;
    Ok(Json(RawDataResponse::new(dataset, table)))
}

async fn entities(State(state): State<AppState>, Path(dataset): Path<String>) -> ApiResult<EntitiesResponse> {
    let dataset = parse_dataset(&dataset)?;
    let options = state.service.entity_options(dataset).await.map_err(reject)?;
    Ok(Json(EntitiesResponse::from(options)))
}

async fn tidy_rows(State(state): State<AppState>, Path(dataset): Path<String>) -> ApiResult<TidyResponse> {
    let dataset = parse_dataset(&dataset)?;
    let tidy = state.service.tidy_dataset(dataset).await.map_err(reject)?;
    Ok(Json(TidyResponse::new(dataset, &tidy)))
}

async fn chart(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<ChartResponse> {
    let dataset = parse_dataset(&dataset)?;
    let view = state
        .service
        .chart(dataset, &query.entity_list(), query.metric.unwrap_or_default())
        .await
        .map_err(reject)?;
    Ok(Json(ChartResponse::from(view)))
}

async fn county_map(State(state): State<AppState>, Query(query): Query<CountyQuery>) -> ApiResult<CountyMapResponse> {
    let view = state.service.county_map(query.day).await.map_err(reject)?;
    Ok(Json(CountyMapResponse::from(view)))
}

fn parse_dataset(raw: &str) -> Result<Dataset, (StatusCode, Json<Value>)> {
    raw.parse::<Dataset>()
        .map_err(|e| (StatusCode::NOT_FOUND, Json(error_response(&e, "unknown_dataset"))))
}

fn reject(err: DashboardError) -> (StatusCode, Json<Value>) {
    log_error(format!("Pass failed: {}", err));
    (error_status(&err), Json(error_response(&err.to_string(), err.kind())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_query_entity_list() {
        let query = ChartQuery {
            entities: Some("Italy, US,,Korea%2C South".into()),
            metric: None,
        };
        assert_eq!(query.entity_list(), vec!["Italy", "US", "Korea%2C South"]);
        assert!(ChartQuery::default().entity_list().is_empty());
    }

    #[test]
    fn test_unknown_dataset_is_404() {
        let (status, body) = parse_dataset("mars").unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0["kind"], "unknown_dataset");
        assert_eq!(parse_dataset("us").unwrap(), Dataset::Us);
    }

    #[test]
    fn test_reject_maps_kind() {
        let err: DashboardError = crate::error::TidyError::EmptyInput { threshold: 10 }.into();
        let (status, body) = reject(err);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0["kind"], "empty_input");
    }
}
