//! Run configuration, loaded from YAML
//!
//! Every key has a default, so a partial file (or no file) is valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Names of the date fields folded into one range field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFieldNames {
    pub earliest: String,
    pub latest: String,
    pub range: String,
}

impl Default for DateFieldNames {
    fn default() -> Self {
        Self {
            earliest: "earliestdate".to_string(),
            latest: "latestdate".to_string(),
            range: "datecreatedofartwork".to_string(),
        }
    }
}

/// Fetch-expansion limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Safety valve on discovery rounds
    pub max_rounds: usize,
    /// Fetches in flight at once
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    /// Extra attempts after a transient failure
    pub fetch_retries: u32,
    /// Backoff per attempt, multiplied by the attempt number
    pub retry_backoff_ms: u64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 32,
            fetch_concurrency: 8,
            fetch_timeout_secs: 30,
            fetch_retries: 2,
            retry_backoff_ms: 250,
        }
    }
}

impl ExpansionConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Update submission limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Resources updated at once; fields of one resource always go in sequence
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout_secs: 30,
        }
    }
}

impl UpdateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Prepended to a cleaned object number to form a record id
    pub record_id_prefix: String,
    /// Target field holding the object number
    pub identifier_field: String,
    /// Field compared as a keyword set
    pub keywords_field: String,
    /// Derived field listing related resources
    pub related_records_field: String,
    pub related_separator: String,
    pub dates: DateFieldNames,
    /// Field-definition table; empty accepts every field
    pub fields: Vec<String>,
    /// Abort the run on malformed source data instead of skipping the record
    pub abort_on_malformed: bool,
    pub expansion: ExpansionConfig,
    pub updates: UpdateConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            record_id_prefix: String::new(),
            identifier_field: "sourceinvnr".to_string(),
            keywords_field: "keywords".to_string(),
            related_records_field: "relatedrecords".to_string(),
            related_separator: "\n".to_string(),
            dates: DateFieldNames::default(),
            fields: Vec::new(),
            abort_on_malformed: false,
            expansion: ExpansionConfig::default(),
            updates: UpdateConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Load `path`, or the default location, falling back to defaults when
    /// no file exists there
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// `<config dir>/catalog-reconcile/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("catalog-reconcile").join("config.yaml"))
    }

    /// The field-definition table, if one is configured
    pub fn field_table(&self) -> Option<BTreeSet<String>> {
        if self.fields.is_empty() {
            return None;
        }
        let mut table: BTreeSet<String> = self.fields.iter().cloned().collect();
        // Derived fields are produced from configured ones
        table.insert(self.dates.earliest.clone());
        table.insert(self.dates.latest.clone());
        Some(table)
    }
}
