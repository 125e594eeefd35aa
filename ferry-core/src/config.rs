//! Configuration for GitFerry
//!
//! The configuration arrives fully resolved: environment-variable
//! substitution is a pre-processing pass in the CLI, and no core component
//! reads the environment directly. Durations are written in human form
//! (`"30m"`, `"1s"`) via humantime-serde.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::PipelineScope;
use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Source platform (Azure DevOps) connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Azure DevOps organization name
    pub organization: String,

    /// Personal access token for the source platform
    pub personal_access_token: String,

    /// Override for the API base URL (tests, on-prem installs)
    pub base_url: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            personal_access_token: String::new(),
            base_url: None,
        }
    }
}

/// Target platform (GitHub) connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// API token for the target platform
    pub token: String,

    /// Organization to create repositories under; user account when absent
    pub organization: Option<String>,

    /// Create migrated repositories as private
    pub create_private_repos: bool,

    /// Override for the API base URL
    pub base_url: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            organization: None,
            create_private_repos: true,
            base_url: None,
        }
    }
}

/// Git transfer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Timeout for a single clone or push of the mirror
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Size above which a pre-flight warning is logged (never a failure)
    pub large_repo_warn_bytes: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30 * 60),
            large_repo_warn_bytes: 5 * 1024 * 1024 * 1024,
        }
    }
}

/// Pipeline conversion settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which pipelines to export: all in the project, or only those bound
    /// to the migrated repository
    pub scope: PipelineScope,

    /// Drop pipelines whose queue status is disabled or paused
    pub exclude_disabled: bool,

    /// Maximum length of a derived workflow file stem
    pub max_stem_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scope: PipelineScope::Project,
            exclude_disabled: false,
            max_stem_length: crate::naming::DEFAULT_STEM_MAX,
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory migration reports are written to
    pub directory: PathBuf,

    /// Embed the raw repository snapshot in the JSON report
    pub save_raw_data: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./migration_reports"),
            save_raw_data: false,
        }
    }
}

/// Retry behavior for idempotent platform calls
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,

    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,

    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Build the policy object injected into platform clients
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            backoff_factor: self.backoff_factor,
        }
    }
}

/// Client-side throttle toward each platform API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Ceiling on outgoing API calls per second
    pub calls_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_second: 10.0,
        }
    }
}

/// Logging settings, applied once at process start by the caller
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default tracing filter (overridden by RUST_LOG)
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub git: GitConfig,
    pub pipelines: PipelineConfig,
    pub output: OutputConfig,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggerConfig,
}

impl Config {
    /// Load configuration from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/gitferry/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gitferry").join("config.toml"))
    }

    /// Check required fields and reject unresolved `${VAR}` placeholders
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("source.organization", &self.source.organization),
            (
                "source.personal_access_token",
                &self.source.personal_access_token,
            ),
            ("target.token", &self.target.token),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("missing required setting: {}", name)));
            }
            if value.contains("${") {
                return Err(Error::Config(format!(
                    "unresolved placeholder in setting: {}",
                    name
                )));
            }
        }

        if self.rate_limit.calls_per_second <= 0.0 {
            return Err(Error::Config(
                "rate_limit.calls_per_second must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
