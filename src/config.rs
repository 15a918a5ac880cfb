// ⚙️ Configuration - JSON file plus CRM_* environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_LATENCY_SCALE: &str = "CRM_LATENCY_SCALE";
pub const ENV_FIXTURES_DIR: &str = "CRM_FIXTURES_DIR";
pub const ENV_LOG: &str = "CRM_LOG";
pub const ENV_BIND: &str = "CRM_BIND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrmConfig {
    /// Multiplier on the simulated store delays; 0 disables them
    #[serde(default = "default_latency_scale")]
    pub latency_scale: f64,

    /// Directory with contacts.json, deals.json, sales_reps.json
    #[serde(default)]
    pub fixtures_dir: Option<PathBuf>,

    /// tracing filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Listen address of crm-server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_latency_scale() -> f64 {
    1.0
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            latency_scale: default_latency_scale(),
            fixtures_dir: None,
            log_filter: default_log_filter(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl CrmConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// File (or defaults) with the process environment on top
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply CRM_* values looked up through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(scale) = lookup(ENV_LATENCY_SCALE) {
            self.latency_scale = scale
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number, got '{}'", ENV_LATENCY_SCALE, scale))?;
        }
        if let Some(dir) = lookup(ENV_FIXTURES_DIR).filter(|d| !d.is_empty()) {
            self.fixtures_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|f| !f.is_empty()) {
            self.log_filter = filter;
        }
        if let Some(addr) = lookup(ENV_BIND).filter(|a| !a.is_empty()) {
            self.bind_addr = addr;
        }
        Ok(self)
    }
}
