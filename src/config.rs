use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::repository::scanner::{ScanOptions, DEFAULT_BATCH_SIZE};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SPACETREND_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scanner: ScannerConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("spacetrend").join("spacetrend.db"))
            .unwrap_or_else(|| PathBuf::from("./data/spacetrend.db"));
        Self { path }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub mount_points: Vec<String>,
    /// Added to the built-in virtual filesystem skip list
    pub skip_paths: Vec<String>,
    /// 0 = unlimited
    pub max_depth: u32,
    pub batch_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            mount_points: vec!["/".to_string()],
            skip_paths: Vec::new(),
            max_depth: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Snapshots older than this are deleted; 0 keeps everything
    pub days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { days: 365 }
    }
}

impl Config {
    /// Load from `path`, else `$SPACETREND_CONFIG`, else `config.yaml`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };

        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults"
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.scanner.batch_size >= 1, "scanner.batch_size must be at least 1");
        ensure!(
            self.scanner.mount_points.iter().all(|m| !m.trim().is_empty()),
            "scanner.mount_points must not contain empty paths"
        );
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_paths: self.scanner.skip_paths.clone(),
            max_depth: self.scanner.max_depth,
            batch_size: self.scanner.batch_size,
        }
    }
}
