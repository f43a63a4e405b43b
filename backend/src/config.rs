//! Dashboard configuration.
//!
//! Source URLs default to the Johns Hopkins CSSE time series. Every value can
//! be overridden from the environment (a `.env` file is loaded first).

use std::env;

use crate::models::Dataset;

/// JHU CSSE global deaths, one row per country or sub-region.
pub const GLOBAL_DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv";

/// JHU CSSE US deaths, one row per county.
pub const US_DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_US.csv";

/// Default HTTP port for `serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Global deaths CSV (`COVID_GLOBAL_DEATHS_URL`)
    pub global_url: String,
    /// US deaths CSV (`COVID_US_DEATHS_URL`)
    pub us_url: String,
    /// Token handed to the map renderer (`MAPBOX_KEY`)
    pub mapbox_key: Option<String>,
    /// Listen port (`DASHBOARD_PORT`)
    pub port: u16,
}

impl DashboardConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            global_url: env::var("COVID_GLOBAL_DEATHS_URL").unwrap_or(defaults.global_url),
            us_url: env::var("COVID_US_DEATHS_URL").unwrap_or(defaults.us_url),
            mapbox_key: env::var("MAPBOX_KEY").ok().filter(|k| !k.is_empty()),
            port: env::var("DASHBOARD_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    /// Source URL for a dataset page.
    pub fn source_url(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Global => &self.global_url,
            Dataset::Us => &self.us_url,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            global_url: GLOBAL_DEATHS_URL.to_string(),
            us_url: US_DEATHS_URL.to_string(),
            mapbox_key: None,
            port: DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let config = DashboardConfig::default();
        assert!(config.source_url(Dataset::Global).ends_with("deaths_global.csv"));
        assert!(config.source_url(Dataset::Us).ends_with("deaths_US.csv"));
        assert_eq!(config.port, 3000);
        assert!(config.mapbox_key.is_none());
    }
}
