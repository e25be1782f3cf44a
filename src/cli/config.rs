//! Configuration file
//!
//! Optional JSON object; every field has a default:
//!
//! ```json
//! { "file_prefix": "DUMP.", "max_findings": 10, "progress_interval": 10000 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::DEFAULT_MAX_FINDINGS;
use crate::dump::{ProcessorOptions, DEFAULT_FILE_PREFIX, DEFAULT_PROGRESS_INTERVAL};

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Name prefix of dump files inside an input directory
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Findings recorded before the check stops early
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,

    /// Commands between progress log events
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}
fn default_max_findings() -> usize {
    DEFAULT_MAX_FINDINGS
}
fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_prefix: default_file_prefix(),
            max_findings: default_max_findings(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.file_prefix.is_empty() {
            return Err(CliError::config_error("file_prefix must not be empty"));
        }
        if self.max_findings == 0 {
            return Err(CliError::config_error("max_findings must be > 0"));
        }
        if self.progress_interval == 0 {
            return Err(CliError::config_error("progress_interval must be > 0"));
        }
        Ok(())
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            file_prefix: self.file_prefix.clone(),
            progress_interval: self.progress_interval,
        }
    }
}
