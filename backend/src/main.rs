//! COVID-19 dashboard CLI
//!
//! # Main Commands
//!
//! ```bash
//! covid-dashboard serve                          # Start HTTP server (port 3000)
//! covid-dashboard chart global -e Italy,US -m daily
//! covid-dashboard county-map --day 100
//! ```
//!
//! # Offline Commands
//!
//! Every data command accepts `--input <csv>` to run the pass over a local
//! copy of the source instead of fetching it.
//!
//! ```bash
//! covid-dashboard raw us --input deaths_us.csv      # Aggregated date table
//! covid-dashboard tidy global --input deaths.csv    # Tidy rows with metrics
//! covid-dashboard entities us                       # Selector contents
//! ```

use clap::{Parser, Subcommand};
use covid_dashboard::{
    api::server::start_server, DashboardConfig, DashboardService, Dataset, HomePage, Metric,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "covid-dashboard")]
#[command(about = "Fetch, tidy and chart JHU COVID-19 death time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: DASHBOARD_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the Homepage text
    Home,

    /// Aggregated, date-indexed table of a dataset
    Raw {
        /// global or us
        dataset: Dataset,

        /// Local CSV used instead of the remote source
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Tidy rows with daily metrics
    Tidy {
        /// global or us
        dataset: Dataset,

        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Entity selector contents and defaults
    Entities {
        /// global or us
        dataset: Dataset,

        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Line chart spec for a selection
    Chart {
        /// global or us
        dataset: Dataset,

        /// Entities to plot (default: the page defaults)
        #[arg(short, long, value_delimiter = ',')]
        entities: Vec<String>,

        /// total, daily or pct
        #[arg(short, long, default_value = "total")]
        metric: Metric,

        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// County column map for one slider day
    CountyMap {
        /// Days since March 1, 2020 (default: latest)
        #[arg(short, long)]
        day: Option<usize>,

        /// Local copy of the US deaths CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    let config = DashboardConfig::from_env();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(config, port).await,

        Commands::Home => write_json(&HomePage::default(), None),

        Commands::Raw { dataset, input, output } => {
            cmd_raw(config, dataset, input.as_deref(), output.as_deref()).await
        }

        Commands::Tidy { dataset, input, output } => {
            cmd_tidy(config, dataset, input.as_deref(), output.as_deref()).await
        }

        Commands::Entities { dataset, input } => cmd_entities(config, dataset, input.as_deref()).await,

        Commands::Chart {
            dataset,
            entities,
            metric,
            input,
            output,
        } => cmd_chart(config, dataset, &entities, metric, input.as_deref(), output.as_deref()).await,

        Commands::CountyMap { day, input, output } => {
            cmd_county_map(config, day, input.as_deref(), output.as_deref()).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(mut config: DashboardConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        config.port = port;
    }
    start_server(DashboardService::new(config)).await
}

async fn cmd_raw(
    config: DashboardConfig,
    dataset: Dataset,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_for(config, dataset, input).await?;
    let table = service.load_dataset(dataset).await?;

    eprintln!(
        "📊 {}: {} entities x {} dates",
        dataset.page_title(),
        table.entities.len(),
        table.dates.len()
    );
    write_json(&table, output)
}

async fn cmd_tidy(
    config: DashboardConfig,
    dataset: Dataset,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_for(config, dataset, input).await?;
    let tidy = service.tidy_dataset(dataset).await?;

    eprintln!("📊 {} tidy rows", tidy.records.len());
    let rows: Vec<_> = tidy.records.iter().map(|r| r.to_row(&tidy.key_column)).collect();
    write_json(&rows, output)
}

async fn cmd_entities(
    config: DashboardConfig,
    dataset: Dataset,
    input: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_for(config, dataset, input).await?;
    let options = service.entity_options(dataset).await?;
    write_json(&options, None)
}

async fn cmd_chart(
    config: DashboardConfig,
    dataset: Dataset,
    entities: &[String],
    metric: Metric,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_for(config, dataset, input).await?;
    let view = service.chart(dataset, entities, metric).await?;

    eprintln!(
        "📈 {} for {} ({} points)",
        view.spec.title,
        view.entities.join(", "),
        view.spec.data.len()
    );
    write_json(&view, output)
}

async fn cmd_county_map(
    config: DashboardConfig,
    day: Option<usize>,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_for(config, Dataset::Us, input).await?;
    let view = service.county_map(day).await?;

    eprintln!(
        "🗺️  {} (day {} of {}..={})",
        view.snapshot.header,
        view.snapshot.slider.value,
        view.snapshot.slider.min,
        view.snapshot.slider.max
    );
    write_json(&view, output)
}

/// Service whose dataset source is preloaded from `input` when given.
async fn service_for(
    config: DashboardConfig,
    dataset: Dataset,
    input: Option<&Path>,
) -> Result<DashboardService, Box<dyn std::error::Error>> {
    let url = config.source_url(dataset).to_string();
    let service = DashboardService::new(config);
    if let Some(path) = input {
        eprintln!("📄 Using local source: {}", path.display());
        service.preload_file(&url, path).await?;
    }
    Ok(service)
}

fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, &json)?;
            eprintln!("💾 Saved to: {}", p.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
