//! Configuration for the Campus backend.
//!
//! Everything lives in a single `campus.yaml`. Each section has defaults, so an
//! empty file is a valid configuration that talks to a local Postgres and the
//! hosted identity API.
//!
//! ```yaml
//! project: springfield-elementary
//! upstream:
//!   database_url_env: DATABASE_URL
//! identity:
//!   secret_key_env: CLERK_SECRET_KEY
//! dashboard:
//!   port: 8080
//! policy:
//!   mode: lesson_owner
//!   scoped_resources: [exam]
//! observability:
//!   log_level: info
//! ```

pub mod dashboard;
pub mod identity;
pub mod policy;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use dashboard::DashboardConfig;
pub use identity::IdentityConfig;
pub use policy::{PolicyConfig, PolicyMode};
pub use upstream::{PoolConfig, SslMode, UpstreamConfig};

/// Complete configuration loaded from `campus.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CampusConfig {
    /// Project name, used only in logs.
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CampusConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content. Blank content yields defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dashboard.port == 0 {
            return Err(ConfigError::Config("dashboard.port must be non-zero".into()));
        }
        if self.upstream.pool.max_connections == 0 {
            return Err(ConfigError::Config(
                "upstream.pool.max_connections must be at least 1".into(),
            ));
        }
        if !self.identity.base_url.starts_with("http://")
            && !self.identity.base_url.starts_with("https://")
        {
            return Err(ConfigError::Config(format!(
                "identity.base_url '{}' is not an http(s) URL",
                self.identity.base_url
            )));
        }
        Ok(())
    }
}
