//! Configuration management for testlens.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `testlens.toml` file
//! 3. User config `~/.config/testlens/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

use crate::discovery::TestFramework;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project layout and source indexing.
    pub workspace: WorkspaceConfig,

    /// Which test frameworks are searched.
    pub discovery: DiscoveryConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./testlens.toml` (project local)
    /// 2. `~/.config/testlens/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Like [`Config::load`], looking for the project-local file in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let local = dir.join(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply `TESTLENS_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(roots) = lookup("TESTLENS_SOURCE_ROOTS") {
            self.workspace.source_roots = split_list(&roots);
        }
        if let Some(roots) = lookup("TESTLENS_TEST_SOURCE_ROOTS") {
            self.workspace.test_source_roots = split_list(&roots);
        }
        if let Some(size) = lookup("TESTLENS_MAX_FILE_SIZE") {
            self.workspace.max_file_size = size
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("TESTLENS_MAX_FILE_SIZE: not a size: {}", size)))?;
        }
        if let Some(frameworks) = lookup("TESTLENS_FRAMEWORKS") {
            self.discovery.frameworks = split_list(&frameworks)
                .iter()
                .map(|name| name.parse().map_err(ConfigError::Invalid))
                .collect::<Result<_, _>>()?;
        }
        Ok(())
    }

    /// Reject configurations that cannot discover anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.frameworks.is_empty() {
            return Err(ConfigError::Invalid("no test frameworks enabled".to_string()));
        }
        if self.workspace.max_file_size == 0 {
            return Err(ConfigError::Invalid("max_file_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Project layout and source indexing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Files marking a directory as a project.
    pub project_markers: Vec<String>,

    /// Main source roots relative to each project.
    pub source_roots: Vec<String>,

    /// Test source roots relative to each project.
    pub test_source_roots: Vec<String>,

    /// Directory holding `.jar` libraries, relative to each project.
    pub library_dir: String,

    /// Directories to exclude from scanning.
    pub exclude_dirs: Vec<String>,

    /// Maximum size of a single source file to index (in bytes).
    pub max_file_size: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_markers: DEFAULT_PROJECT_MARKERS.iter().map(|s| s.to_string()).collect(),
            source_roots: DEFAULT_SOURCE_ROOTS.iter().map(|s| s.to_string()).collect(),
            test_source_roots: DEFAULT_TEST_SOURCE_ROOTS.iter().map(|s| s.to_string()).collect(),
            library_dir: DEFAULT_LIBRARY_DIR.to_string(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Frameworks searched by the test service, in order.
    pub frameworks: Vec<TestFramework>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            frameworks: TestFramework::ALL.to_vec(),
        }
    }
}
