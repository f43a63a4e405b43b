//! High-level pipeline API: one full fetch-and-recompute pass per call.
//!
//! ```text
//! URL ─▶ SourceCache ─(miss)─▶ Fetcher ─▶ ParseResult
//!                                            │
//!      wide_table_from_csv ◀─────────────────┘
//!            │
//!            ▼
//!    aggregate_by_entity ─▶ to_date_series ─▶ tidy ─▶ ChartSpec
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use covid_dashboard::{DashboardConfig, DashboardService, Dataset, Metric};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = DashboardService::new(DashboardConfig::from_env());
//!     let chart = service.chart(Dataset::Global, &[], Metric::DeathsPerDay).await?;
//!     println!("{} points", chart.spec.data.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::aggregator::aggregate_by_entity;
use super::reshaper::to_date_series;
use super::tidy::tidy;
use crate::api::logs::PassLog;
use crate::cache::SourceCache;
use crate::chart::{line_chart, ChartSpec, DeckSpec};
use crate::config::DashboardConfig;
use crate::county::{county_table, CountySnapshot};
use crate::error::{DashboardError, DashboardResult, FetchResult, SchemaError};
use crate::fetch::{report_parse, wide_table_from_csv, Fetcher};
use crate::models::{DateSeriesTable, Dataset, Metric, TidyRecord, TidyTable};
use crate::parser::{parse_csv_file_auto, ParseResult};

/// Entity selector contents for a dataset page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOptions {
    pub dataset: Dataset,
    pub key_column: String,
    /// Every entity, sorted
    pub entities: Vec<String>,
    pub defaults: Vec<String>,
}

/// A line chart with the pass that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub pass_id: String,
    pub dataset: Dataset,
    pub metric: Metric,
    pub entities: Vec<String>,
    pub spec: ChartSpec,
}

/// County map snapshot plus its deck.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyMapView {
    pub pass_id: String,
    pub snapshot: CountySnapshot,
    pub deck: DeckSpec,
}

/// Orchestrates fetch, cache and transformation for every page.
pub struct DashboardService {
    config: DashboardConfig,
    fetcher: Fetcher,
    cache: Arc<SourceCache>,
}

impl DashboardService {
    pub fn new(config: DashboardConfig) -> Self {
        Self::with_cache(config, Arc::new(SourceCache::new()))
    }

    /// Share an existing cache.
    pub fn with_cache(config: DashboardConfig, cache: Arc<SourceCache>) -> Self {
        Self {
            config,
            fetcher: Fetcher::new(),
            cache,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Serve `url` from a local file for the rest of the process.
    pub async fn preload_file(&self, url: &str, path: &Path) -> FetchResult<()> {
        self.cache
            .get_or_load(url, || async {
                let parsed = parse_csv_file_auto(path)?;
                report_parse(&parsed);
                Ok::<_, crate::error::FetchError>(parsed)
            })
            .await?;
        Ok(())
    }

    /// Parsed source, fetched on first use.
    async fn source(&self, url: &str) -> FetchResult<Arc<ParseResult>> {
        self.cache
            .get_or_load(url, || self.fetcher.fetch_csv(url))
            .await
    }

    /// Fetch, aggregate and reshape: the page's raw data view.
    pub async fn load_dataset(&self, dataset: Dataset) -> DashboardResult<DateSeriesTable> {
        let log = PassLog::start();
        self.load_with(dataset, &log).await
    }

    async fn load_with(&self, dataset: Dataset, log: &PassLog) -> DashboardResult<DateSeriesTable> {
        log.info(format!("📖 Loading {} deaths", dataset));
        let parsed = on_pass(log, self.source(self.config.source_url(dataset)).await)?;
        let table = on_pass(log, process_source(&parsed, dataset, log))?;
        log.success(format!(
            "{} entities x {} days",
            table.entities.len(),
            table.dates.len()
        ));
        Ok(table)
    }

    /// Full pass down to the tidy table.
    pub async fn tidy_dataset(&self, dataset: Dataset) -> DashboardResult<TidyTable> {
        let log = PassLog::start();
        let table = self.load_with(dataset, &log).await?;
        let tidy = on_pass(&log, tidy(&table))?;
        log.success(format!("{} tidy rows", tidy.records.len()));
        Ok(tidy)
    }

    /// Selector contents: all entities plus the page defaults.
    pub async fn entity_options(&self, dataset: Dataset) -> DashboardResult<EntityOptions> {
        let table = self.load_dataset(dataset).await?;
        Ok(EntityOptions {
            dataset,
            key_column: table.key_column.clone(),
            entities: table.sorted_entities(),
            defaults: dataset.default_entities().iter().map(|e| e.to_string()).collect(),
        })
    }

    /// Line chart for the selected entities; an empty selection means the
    /// page defaults.
    pub async fn chart(
        &self,
        dataset: Dataset,
        entities: &[String],
        metric: Metric,
    ) -> DashboardResult<ChartView> {
        let log = PassLog::start();
        let table = self.load_with(dataset, &log).await?;
        let tidy = on_pass(&log, tidy(&table))?;

        let selection = resolve_selection(dataset, entities);
        let rows = on_pass(&log, select_entities(&tidy, &table, &selection))?;
        log.info(format!(
            "📈 {} for {} ({} points)",
            metric.label(),
            selection.join(", "),
            rows.len()
        ));

        Ok(ChartView {
            pass_id: log.id().to_string(),
            dataset,
            metric,
            spec: line_chart(dataset, metric, &tidy.key_column, &rows),
            entities: selection,
        })
    }

    /// County map at a slider position (latest date when `None`).
    pub async fn county_map(&self, day: Option<usize>) -> DashboardResult<CountyMapView> {
        let log = PassLog::start();
        log.info("🗺️  Loading county map");
        let parsed = on_pass(&log, self.source(self.config.source_url(Dataset::Us)).await)?;
        let counties = on_pass(&log, county_table(&parsed))?;
        let snapshot = counties.snapshot(day);
        log.success(format!(
            "{} counties as of {}",
            snapshot.counties.len(),
            snapshot.date_label
        ));

        let deck = DeckSpec::county_columns(snapshot.layer_data(), self.config.mapbox_key.clone());
        Ok(CountyMapView {
            pass_id: log.id().to_string(),
            snapshot,
            deck,
        })
    }
}

/// Report a failed step on the pass log and hand the error back.
fn on_pass<T, E: Into<DashboardError>>(log: &PassLog, result: Result<T, E>) -> DashboardResult<T> {
    result.map_err(|e| {
        let err: DashboardError = e.into();
        log.error(format!("{} ({})", err, err.kind()));
        err
    })
}

/// Wide table → aggregate → date series, for an already parsed source.
pub fn process_source(parsed: &ParseResult, dataset: Dataset, log: &PassLog) -> DashboardResult<DateSeriesTable> {
    let wide = wide_table_from_csv(parsed, dataset, log)?;
    log.info(format!("📦 Aggregating {} rows by {}", wide.rows.len(), dataset.key_column()));
    let aggregated = aggregate_by_entity(&wide);
    Ok(to_date_series(&aggregated)?)
}

/// Requested entities, or the dataset defaults when none are given.
pub fn resolve_selection(dataset: Dataset, entities: &[String]) -> Vec<String> {
    let requested: Vec<String> = entities
        .iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    if requested.is_empty() {
        dataset.default_entities().iter().map(|e| e.to_string()).collect()
    } else {
        requested
    }
}

/// Tidy rows of the selected entities, grouped in selection order.
///
/// An entity missing from the dataset is an error; one that exists but never
/// reaches the threshold simply contributes no rows.
pub fn select_entities(
    tidy: &TidyTable,
    table: &DateSeriesTable,
    selection: &[String],
) -> DashboardResult<Vec<TidyRecord>> {
    let mut rows = Vec::new();
    for entity in selection {
        if table.entity_index(entity).is_none() {
            return Err(SchemaError::UnknownEntity(entity.clone()).into());
        }
        rows.extend(tidy.entity_records(entity).cloned());
    }
    Ok(rows)
}
