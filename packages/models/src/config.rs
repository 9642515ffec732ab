//! Run-wide pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at startup (from TOML, or from the
//! defaults) and passed by reference into every component. Keys missing
//! from the TOML fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::month::{MonthRange, MonthToken};

/// Default postcode to resolve.
pub const DEFAULT_POSTCODE: &str = "E14 4PU";

/// Default postcode lookup endpoint. The postcode is appended as a path
/// segment.
pub const DEFAULT_GEOCODE_URL: &str = "https://api.postcodes.io/postcodes";

/// Default street-level crime endpoint.
pub const DEFAULT_CRIMES_URL: &str = "https://data.police.uk/api/crimes-street/all-crime";

/// Default category-listing endpoint.
pub const DEFAULT_CATEGORIES_URL: &str = "https://data.police.uk/api/crime-categories";

/// Default first month to fetch.
pub const DEFAULT_START_MONTH: MonthToken = match MonthToken::new(2022, 1) {
    Some(month) => month,
    None => panic!("invalid default start month"),
};

/// Default last month to fetch.
pub const DEFAULT_END_MONTH: MonthToken = match MonthToken::new(2022, 6) {
    Some(month) => month,
    None => panic!("invalid default end month"),
};

/// Default destination table.
pub const DEFAULT_TABLE_NAME: &str = "police_data";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Remote service endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Postcode lookup base URL.
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,
    /// Street-level crime URL, queried with `lat`, `lng`, and `date`.
    #[serde(default = "default_crimes_url")]
    pub crimes_url: String,
    /// Category-listing URL.
    #[serde(default = "default_categories_url")]
    pub categories_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocode_url: default_geocode_url(),
            crimes_url: default_crimes_url(),
            categories_url: default_categories_url(),
        }
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Postcode whose coordinates anchor every crime query.
    #[serde(default = "default_postcode")]
    pub postcode: String,
    /// First month to fetch (inclusive).
    #[serde(default = "default_start_month")]
    pub start_month: MonthToken,
    /// Last month to fetch (inclusive).
    #[serde(default = "default_end_month")]
    pub end_month: MonthToken,
    /// Directory holding the raw/tidy snapshots and the category file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Destination table for the bulk load.
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// `User-Agent` header for outgoing requests. Defaults to the binary's
    /// name and version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Remote service endpoints.
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            postcode: default_postcode(),
            start_month: default_start_month(),
            end_month: default_end_month(),
            data_dir: default_data_dir(),
            table_name: default_table_name(),
            user_agent: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not a valid config.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(s)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The months to fetch.
    #[must_use]
    pub const fn months(&self) -> MonthRange {
        MonthRange::new(self.start_month, self.end_month)
    }
}

fn default_postcode() -> String {
    DEFAULT_POSTCODE.to_string()
}

const fn default_start_month() -> MonthToken {
    DEFAULT_START_MONTH
}

const fn default_end_month() -> MonthToken {
    DEFAULT_END_MONTH
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_geocode_url() -> String {
    DEFAULT_GEOCODE_URL.to_string()
}

fn default_crimes_url() -> String {
    DEFAULT_CRIMES_URL.to_string()
}

fn default_categories_url() -> String {
    DEFAULT_CATEGORIES_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.postcode, "E14 4PU");
        assert_eq!(config.months().len(), 6);
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let config = PipelineConfig::from_toml_str(
            r#"
            postcode = "SW1A 1AA"
            start_month = "2022-12"
            end_month = "2023-02"

            [endpoints]
            crimes_url = "http://localhost:9000/crimes"
            "#,
        )
        .unwrap();

        assert_eq!(config.postcode, "SW1A 1AA");
        assert_eq!(config.months().len(), 3);
        assert_eq!(config.endpoints.crimes_url, "http://localhost:9000/crimes");
        assert_eq!(config.endpoints.geocode_url, DEFAULT_GEOCODE_URL);
        assert_eq!(config.table_name, DEFAULT_TABLE_NAME);
        assert_eq!(config.user_agent, None);
    }

    #[test]
    fn reads_custom_user_agent() {
        let config = PipelineConfig::from_toml_str("user_agent = \"etl-bot/2\"").unwrap();
        assert_eq!(config.user_agent.as_deref(), Some("etl-bot/2"));
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(PipelineConfig::from_toml_str("start_month = \"2022-13\"").is_err());
    }

    #[test]
    fn bundled_sample_config_parses() {
        let sample = include_str!("../../../police_data.toml");
        let config = PipelineConfig::from_toml_str(sample).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
