use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_TOP_N, UNKNOWN_PRODUCT};
use crate::domain::Column;
use crate::error::{CleanerError, Result};
use crate::pipeline::processing::{LoadOptions, RepairOptions};
use crate::pipeline::PipelineOptions;

/// File-level settings; every key is optional and CLI flags win over them.
///
/// ```toml
/// [input]
/// delimiter = ";"
/// skip_malformed = true
///
/// [cleaning]
/// dedupe_key = "OrderID"
/// unknown_product = "Unknown"
/// recompute_total_cost = false
///
/// [report]
/// top_n = 10
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub cleaning: CleaningConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub delimiter: String,
    pub skip_malformed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub dedupe_key: String,
    pub unknown_product: String,
    pub recompute_total_cost: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_n: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            skip_malformed: false,
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            dedupe_key: Column::OrderId.header().to_string(),
            unknown_product: UNKNOWN_PRODUCT.to_string(),
            recompute_total_cost: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl Config {
    /// Read `path` if given, else `order_cleaner.toml` in the working
    /// directory if it exists, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            CleanerError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve into options for one run, checking the delimiter and key column
    pub fn pipeline_options(&self, input: PathBuf, output: PathBuf) -> Result<PipelineOptions> {
        Ok(PipelineOptions {
            input,
            output,
            load: self.load_options()?,
            repair: RepairOptions {
                unknown_product: self.cleaning.unknown_product.clone(),
                recompute_total_cost: self.cleaning.recompute_total_cost,
            },
            dedupe_key: self
                .cleaning
                .dedupe_key
                .parse::<Column>()
                .map_err(CleanerError::Config)?,
            top_n: self.report.top_n,
            report: None,
        })
    }

    pub fn load_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            delimiter: parse_delimiter(&self.input.delimiter)?,
            skip_malformed: self.input.skip_malformed,
        })
    }
}

/// A single ASCII character, or `\t` / `tab` for tab-separated files
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        other => Err(CleanerError::Config(format!(
            "delimiter must be a single ASCII character, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        let options = config
            .pipeline_options("in.csv".into(), "out.csv".into())
            .unwrap();
        assert_eq!(options.load.delimiter, b',');
        assert!(!options.load.skip_malformed);
        assert_eq!(options.dedupe_key, Column::OrderId);
        assert_eq!(options.top_n, 5);
        assert_eq!(options.repair.unknown_product, "Unknown");
    }

    #[test]
    fn reads_all_sections() {
        let config = Config::from_toml_str(
            r#"
            [input]
            delimiter = "tab"
            skip_malformed = true

            [cleaning]
            dedupe_key = "product_name"
            unknown_product = "N/A"
            recompute_total_cost = true

            [report]
            top_n = 3
            "#,
        )
        .unwrap();
        let options = config
            .pipeline_options("in.tsv".into(), "out.tsv".into())
            .unwrap();
        assert_eq!(options.load.delimiter, b'\t');
        assert!(options.load.skip_malformed);
        assert_eq!(options.dedupe_key, Column::ProductName);
        assert_eq!(options.repair.unknown_product, "N/A");
        assert!(options.repair.recompute_total_cost);
        assert_eq!(options.top_n, 3);
    }

    #[test]
    fn rejects_bad_delimiter_and_key() {
        assert!(parse_delimiter("::").is_err());
        let mut config = Config::default();
        config.cleaning.dedupe_key = "colour".to_string();
        let err = config
            .pipeline_options("a".into(), "b".into())
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn missing_explicit_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }
}
