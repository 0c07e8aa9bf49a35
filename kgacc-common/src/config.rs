//! Configuration loading and data root resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default, and a missing configuration file is not an error: the tools warn
//! and continue with defaults.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--data-root`)
//! 2. Environment variables (`KGACC_CONFIG`, `KGACC_DATA_ROOT`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "KGACC_CONFIG";

/// Environment variable naming the data root folder
pub const DATA_ROOT_ENV_VAR: &str = "KGACC_DATA_ROOT";

/// Configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "kgacc.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding annotations, dataset and sample files (optional)
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Number of population strata
    #[serde(default = "default_strata")]
    pub strata: usize,

    /// Batch topic tag marking honeypot (control) batches
    #[serde(default = "default_honeypot_topic")]
    pub honeypot_topic: String,

    #[serde(default)]
    pub estimation: EstimationConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Estimator settings
#[derive(Debug, Clone, Deserialize)]
pub struct EstimationConfig {
    /// Significance level; the margin of error covers a (1 - alpha) interval
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

/// Annotator reliability settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReliabilityConfig {
    /// Steepness of the logistic map from kappa to weight
    #[serde(default = "default_rho")]
    pub rho: f64,
}

/// Cluster construction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    /// Fail when a batch is revisited after another batch interrupted it
    #[serde(default = "default_strict_batch_contiguity")]
    pub strict_batch_contiguity: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_strata() -> usize {
    7
}

fn default_honeypot_topic() -> String {
    "expert".to_string()
}

fn default_alpha() -> f64 {
    0.05
}

fn default_rho() -> f64 {
    5.0
}

fn default_strict_batch_contiguity() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_root: None,
            strata: default_strata(),
            honeypot_topic: default_honeypot_topic(),
            estimation: EstimationConfig::default(),
            reliability: ReliabilityConfig::default(),
            clustering: ClusteringConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self { rho: default_rho() }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strict_batch_contiguity: default_strict_batch_contiguity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file is available
    ///
    /// A missing file only logs a warning. A file that exists but is invalid
    /// is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!("Config file {:?} not found, using built-in defaults", path);
                Ok(Self::default())
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.strata == 0 {
            return Err(Error::Config("strata must be at least 1".to_string()));
        }
        if !(self.estimation.alpha > 0.0 && self.estimation.alpha < 1.0) {
            return Err(Error::Config(format!(
                "estimation.alpha must lie in (0, 1), got {}",
                self.estimation.alpha
            )));
        }
        if !(self.reliability.rho > 0.0 && self.reliability.rho.is_finite()) {
            return Err(Error::Config(format!(
                "reliability.rho must be positive, got {}",
                self.reliability.rho
            )));
        }
        if self.honeypot_topic.is_empty() {
            return Err(Error::Config("honeypot_topic must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Resolve the configuration file path
///
/// Priority: CLI argument, then `KGACC_CONFIG`, then `./kgacc.toml` if it
/// exists, then the platform config directory (`<config_dir>/kgacc/config.toml`)
/// if it exists. Returns `None` when nothing applies.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("kgacc").join("config.toml"))
        .filter(|p| p.exists())
}

/// Resolve the data root folder
///
/// Priority: CLI argument, then `KGACC_DATA_ROOT`, then the TOML `data_root`,
/// then the compiled default `./data`.
pub fn resolve_data_root(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_ROOT_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.data_root {
        return path.clone();
    }

    default_data_root()
}

/// Compiled default data root
pub fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

/// File layout below the data root
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of expert `n` (1-based: expert1 .. expert3)
    pub fn expert_dir(&self, n: usize) -> PathBuf {
        self.root
            .join("annotations")
            .join("experts")
            .join(format!("expert{}", n))
    }

    /// Directory holding one sub-directory per crowd annotator
    pub fn laymen_dir(&self) -> PathBuf {
        self.root.join("annotations").join("laymen")
    }

    /// Directory holding one JSON file per LLM
    pub fn llm_annotations_dir(&self) -> PathBuf {
        self.root.join("annotations").join("llms")
    }

    /// Human-labeled dataset written by dataset preparation
    pub fn human_dataset(&self) -> PathBuf {
        self.root.join("dataset").join("human").join("kg.json")
    }

    /// Fact id → triple mapping used by the LLM annotations
    pub fn llm_dataset(&self) -> PathBuf {
        self.root.join("dataset").join("llm").join("kg.json")
    }

    pub fn strata_weights(&self) -> PathBuf {
        self.root.join("sample").join("weights.csv")
    }
}

/// File names inside an annotator directory
pub const ANNOTATIONS_FILE: &str = "annotations.csv";
pub const METADATA_FILE: &str = "metadata.json";
pub const ERROR_ANNOTATIONS_FILE: &str = "errorAnnotations.csv";
