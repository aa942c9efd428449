//! Configuration for the rule engine
//!
//! Reads configuration from:
//! - `.taglintrc.yaml` / `.taglintrc.yml` / `.taglintrc.json` (working directory)
//! - the same names in the user's home directory

use crate::class::{ClassId, LEVELS};
use crate::region::CountryScope;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate features in parallel
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Region settings for `inside(..)` / `outside(..)` conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Country code of the analysed extract, e.g. "FR" or "FR-67"
    pub country: Option<String>,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    pub color: ColorMode,

    /// Show class details with each issue
    pub verbose: bool,

    /// Show per-class statistics
    pub statistics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: true,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Rule selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Load the built-in rule set
    pub builtin: bool,

    /// Extra rule files (YAML or JSON)
    pub files: Vec<PathBuf>,

    /// Disabled classes
    pub disabled: Vec<ClassId>,

    /// Only these classes (empty = all)
    pub only: Vec<ClassId>,

    /// Level overrides (class id -> level)
    pub level: HashMap<ClassId, u8>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            files: Vec::new(),
            disabled: Vec::new(),
            only: Vec::new(),
            level: HashMap::new(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,

    pub scope: ScopeConfig,

    pub rules: RulesConfig,

    pub output: OutputConfig,
}

/// Command line overrides, applied on top of a loaded config
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub format: Option<OutputFormat>,
    pub verbose: Option<bool>,
    pub jobs: Option<usize>,
    pub country: Option<String>,
    pub rule_files: Vec<PathBuf>,
    pub no_builtin: bool,
    pub disabled: Vec<ClassId>,
    pub only: Vec<ClassId>,
}

const CONFIG_NAMES: [&str; 3] = [".taglintrc.yaml", ".taglintrc.yml", ".taglintrc.json"];

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        // Rule files are relative to the config file
        let base_dir = path.parent().unwrap_or(Path::new("."));
        for file in &mut config.rules.files {
            if file.is_relative() {
                *file = base_dir.join(&*file);
            }
        }

        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        for name in &CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            for name in &CONFIG_NAMES {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (class, level) in &self.rules.level {
            if !LEVELS.contains(level) {
                return Err(ConfigError::Invalid(format!(
                    "level for class {} must be 1, 2 or 3, got {}",
                    class, level
                )));
            }
        }
        Ok(())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if let Some(f) = cli.format {
            self.output.format = f;
        }
        if let Some(v) = cli.verbose {
            self.output.verbose = v;
        }
        if let Some(j) = cli.jobs {
            self.engine.jobs = j;
        }
        if cli.country.is_some() {
            self.scope.country = cli.country;
        }
        if cli.no_builtin {
            self.rules.builtin = false;
        }
        self.rules.files.extend(cli.rule_files);
        self.rules.disabled.extend(cli.disabled);
        if !cli.only.is_empty() {
            self.rules.only = cli.only;
        }
    }

    /// Region scope for the configured country
    pub fn region_scope(&self) -> CountryScope {
        CountryScope::new(self.scope.country.as_deref())
    }
}
